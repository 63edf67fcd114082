use std::mem;

use crate::ast::{
    Annotation, BaseType, ConstValue, ConstValueKind, Constant, Definition, Enum, EnumItem, Field,
    Function, Header, Program, Requiredness, Service, Struct, StructKind, TypeRef, Typedef,
};
use crate::error::CompileError;
use crate::lexer::{Token, TokenKind};
use crate::utils::quote;

/// Parse a token stream into a [`Program`]. Recovery is not attempted: the
/// first syntax error aborts with its position.
pub fn parse_program(tokens: &[Token]) -> Result<Program, CompileError> {
    Parser { tokens, index: 0 }.parse_program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &Token {
        // The lexer always terminates the stream with an EOF token.
        self.tokens.get(self.index).expect("token stream ends with EOF")
    }

    fn at(&self, kind: &TokenKind) -> bool {
        mem::discriminant(&self.current().kind) == mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), CompileError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.expected(expected))
        }
    }

    fn expected(&self, expected: &str) -> CompileError {
        let token = self.current();
        CompileError::Parse {
            msg:    format!(
                "Expected {} but found {}",
                expected,
                quote(&token.kind.to_string())
            ),
            line:   token.line,
            column: token.column,
        }
    }

    fn unexpected(&self) -> CompileError {
        let token = self.current();
        CompileError::Parse {
            msg:    format!("Unexpected token {}", quote(&token.kind.to_string())),
            line:   token.line,
            column: token.column,
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, usize, usize), CompileError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.index += 1;
                Ok((name, token.line, token.column))
            }
            _ => Err(self.expected(expected)),
        }
    }

    fn expect_string(&mut self, expected: &str) -> Result<String, CompileError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::StringLiteral(value) => {
                self.index += 1;
                Ok(value)
            }
            _ => Err(self.expected(expected)),
        }
    }

    fn expect_int(&mut self, expected: &str) -> Result<i64, CompileError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::IntLiteral(value) => {
                self.index += 1;
                Ok(value)
            }
            _ => Err(self.expected(expected)),
        }
    }

    fn eat_separator(&mut self) -> bool {
        self.eat(&TokenKind::Comma) || self.eat(&TokenKind::Semi)
    }

    fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut headers = Vec::new();
        loop {
            let token = self.current().clone();
            match token.kind {
                TokenKind::KwInclude => {
                    self.index += 1;
                    let path = self.expect_string("a file path")?;
                    self.eat_separator();
                    headers.push(Header::Include { path, line: token.line, column: token.column });
                }
                TokenKind::KwCppInclude => {
                    self.index += 1;
                    let path = self.expect_string("a file path")?;
                    self.eat_separator();
                    headers.push(Header::CppInclude {
                        path,
                        line: token.line,
                        column: token.column,
                    });
                }
                TokenKind::KwNamespace => {
                    self.index += 1;
                    let scope = if self.eat(&TokenKind::Star) {
                        "*".to_owned()
                    } else {
                        self.expect_ident("a namespace scope")?.0
                    };
                    let (name, ..) = self.expect_ident("an identifier")?;
                    self.eat_separator();
                    headers.push(Header::Namespace {
                        scope,
                        name,
                        line: token.line,
                        column: token.column,
                    });
                }
                _ => break,
            }
        }

        let mut definitions = Vec::new();
        while !self.at(&TokenKind::Eof) {
            definitions.push(self.parse_definition()?);
        }

        Ok(Program { headers, definitions })
    }

    fn parse_definition(&mut self) -> Result<Definition, CompileError> {
        match self.current().kind {
            TokenKind::KwConst => self.parse_const().map(Definition::Constant),
            TokenKind::KwTypedef => self.parse_typedef().map(Definition::Typedef),
            TokenKind::KwEnum => self.parse_enum().map(Definition::Enum),
            TokenKind::KwStruct => self.parse_struct(StructKind::Struct).map(Definition::Struct),
            TokenKind::KwUnion => self.parse_struct(StructKind::Union).map(Definition::Struct),
            TokenKind::KwException => {
                self.parse_struct(StructKind::Exception).map(Definition::Struct)
            }
            TokenKind::KwService => self.parse_service().map(Definition::Service),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_const(&mut self) -> Result<Constant, CompileError> {
        self.index += 1;
        let ty = self.parse_type()?;
        let (name, line, column) = self.expect_ident("an identifier")?;
        self.expect(&TokenKind::Equals, "\"=\"")?;
        let value = self.parse_const_value()?;
        let annotations = self.parse_annotations()?;
        self.eat_separator();
        Ok(Constant { name, ty, value, line, column, annotations })
    }

    fn parse_typedef(&mut self) -> Result<Typedef, CompileError> {
        self.index += 1;
        let ty = self.parse_type()?;
        let (name, line, column) = self.expect_ident("an identifier")?;
        let annotations = self.parse_annotations()?;
        self.eat_separator();
        Ok(Typedef { name, ty, line, column, annotations })
    }

    fn parse_enum(&mut self) -> Result<Enum, CompileError> {
        self.index += 1;
        let (name, line, column) = self.expect_ident("an identifier")?;
        self.expect(&TokenKind::LBrace, "\"{\"")?;

        let mut items = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let (item_name, item_line, item_column) = self.expect_ident("an identifier")?;
            let value = if self.eat(&TokenKind::Equals) {
                Some(self.expect_int("an integer")?)
            } else {
                None
            };
            let annotations = self.parse_annotations()?;
            self.eat_separator();
            items.push(EnumItem {
                name: item_name,
                value,
                line: item_line,
                column: item_column,
                annotations,
            });
        }

        let annotations = self.parse_annotations()?;
        self.eat_separator();
        Ok(Enum { name, items, line, column, annotations })
    }

    fn parse_struct(&mut self, kind: StructKind) -> Result<Struct, CompileError> {
        self.index += 1;
        let (name, line, column) = self.expect_ident("an identifier")?;
        self.expect(&TokenKind::LBrace, "\"{\"")?;

        let mut fields = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            fields.push(self.parse_field()?);
        }

        let annotations = self.parse_annotations()?;
        self.eat_separator();
        Ok(Struct { name, kind, fields, line, column, annotations })
    }

    fn parse_field(&mut self) -> Result<Field, CompileError> {
        let id = if self.at(&TokenKind::IntLiteral(0)) {
            let value = self.expect_int("an integer")?;
            self.expect(&TokenKind::Colon, "\":\"")?;
            Some(value)
        } else {
            None
        };

        let requiredness = if self.eat(&TokenKind::KwRequired) {
            Requiredness::Required
        } else if self.eat(&TokenKind::KwOptional) {
            Requiredness::Optional
        } else {
            Requiredness::Unspecified
        };

        let ty = self.parse_type()?;
        let (name, line, column) = self.expect_ident("an identifier")?;

        let default = if self.eat(&TokenKind::Equals) {
            Some(self.parse_const_value()?)
        } else {
            None
        };

        let annotations = self.parse_annotations()?;
        self.eat_separator();

        Ok(Field { id, requiredness, ty, name, default, line, column, annotations })
    }

    fn parse_service(&mut self) -> Result<Service, CompileError> {
        self.index += 1;
        let (name, line, column) = self.expect_ident("an identifier")?;

        let extends = if self.eat(&TokenKind::KwExtends) {
            Some(self.expect_ident("a service name")?.0)
        } else {
            None
        };

        self.expect(&TokenKind::LBrace, "\"{\"")?;
        let mut functions = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            functions.push(self.parse_function()?);
        }

        let annotations = self.parse_annotations()?;
        self.eat_separator();
        Ok(Service { name, extends, functions, line, column, annotations })
    }

    fn parse_function(&mut self) -> Result<Function, CompileError> {
        let oneway = self.eat(&TokenKind::KwOneway);

        let return_type = if self.eat(&TokenKind::KwVoid) {
            None
        } else {
            Some(self.parse_type()?)
        };

        let (name, line, column) = self.expect_ident("an identifier")?;

        self.expect(&TokenKind::LParen, "\"(\"")?;
        let mut params = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            params.push(self.parse_field()?);
        }

        let mut throws = Vec::new();
        if self.eat(&TokenKind::KwThrows) {
            self.expect(&TokenKind::LParen, "\"(\"")?;
            while !self.eat(&TokenKind::RParen) {
                throws.push(self.parse_field()?);
            }
        }

        let annotations = self.parse_annotations()?;
        self.eat_separator();

        Ok(Function { name, oneway, return_type, params, throws, line, column, annotations })
    }

    fn parse_type(&mut self) -> Result<TypeRef, CompileError> {
        let token = self.current().clone();
        let base = |base| TypeRef::Base { base, line: token.line, column: token.column };

        let ty = match token.kind {
            TokenKind::KwBool => base(BaseType::Bool),
            TokenKind::KwByte | TokenKind::KwI8 => base(BaseType::I8),
            TokenKind::KwI16 => base(BaseType::I16),
            TokenKind::KwI32 => base(BaseType::I32),
            TokenKind::KwI64 => base(BaseType::I64),
            TokenKind::KwDouble => base(BaseType::Double),
            TokenKind::KwString => base(BaseType::String),
            TokenKind::KwBinary => base(BaseType::Binary),

            TokenKind::KwList => {
                self.index += 1;
                self.expect(&TokenKind::LAngle, "\"<\"")?;
                let elem = Box::new(self.parse_type()?);
                self.expect(&TokenKind::RAngle, "\">\"")?;
                return Ok(TypeRef::List { elem, line: token.line, column: token.column });
            }
            TokenKind::KwSet => {
                self.index += 1;
                self.expect(&TokenKind::LAngle, "\"<\"")?;
                let elem = Box::new(self.parse_type()?);
                self.expect(&TokenKind::RAngle, "\">\"")?;
                return Ok(TypeRef::Set { elem, line: token.line, column: token.column });
            }
            TokenKind::KwMap => {
                self.index += 1;
                self.expect(&TokenKind::LAngle, "\"<\"")?;
                let key = Box::new(self.parse_type()?);
                self.expect(&TokenKind::Comma, "\",\"")?;
                let value = Box::new(self.parse_type()?);
                self.expect(&TokenKind::RAngle, "\">\"")?;
                return Ok(TypeRef::Map { key, value, line: token.line, column: token.column });
            }

            TokenKind::Ident(ref name) => {
                let named =
                    TypeRef::Named { name: name.clone(), line: token.line, column: token.column };
                self.index += 1;
                return Ok(named);
            }

            _ => return Err(self.expected("a type")),
        };

        self.index += 1;
        Ok(ty)
    }

    fn parse_const_value(&mut self) -> Result<ConstValue, CompileError> {
        let token = self.current().clone();
        let value = |kind| ConstValue { kind, line: token.line, column: token.column };

        match token.kind {
            TokenKind::IntLiteral(v) => {
                self.index += 1;
                Ok(value(ConstValueKind::Int(v)))
            }
            TokenKind::DoubleLiteral(v) => {
                self.index += 1;
                Ok(value(ConstValueKind::Double(v)))
            }
            TokenKind::StringLiteral(ref v) => {
                let v = v.clone();
                self.index += 1;
                Ok(value(ConstValueKind::String(v)))
            }
            TokenKind::KwTrue => {
                self.index += 1;
                Ok(value(ConstValueKind::Bool(true)))
            }
            TokenKind::KwFalse => {
                self.index += 1;
                Ok(value(ConstValueKind::Bool(false)))
            }
            TokenKind::Ident(ref name) => {
                let name = name.clone();
                self.index += 1;
                Ok(value(ConstValueKind::Identifier(name)))
            }
            TokenKind::LBracket => {
                self.index += 1;
                let mut items = Vec::new();
                while !self.eat(&TokenKind::RBracket) {
                    items.push(self.parse_const_value()?);
                    self.eat_separator();
                }
                Ok(value(ConstValueKind::List(items)))
            }
            TokenKind::LBrace => {
                self.index += 1;
                let mut entries = Vec::new();
                while !self.eat(&TokenKind::RBrace) {
                    let key = self.parse_const_value()?;
                    self.expect(&TokenKind::Colon, "\":\"")?;
                    let val = self.parse_const_value()?;
                    self.eat_separator();
                    entries.push((key, val));
                }
                Ok(value(ConstValueKind::Map(entries)))
            }
            _ => Err(self.expected("a constant value")),
        }
    }

    fn parse_annotations(&mut self) -> Result<Vec<Annotation>, CompileError> {
        let mut annotations = Vec::new();
        if !self.eat(&TokenKind::LParen) {
            return Ok(annotations);
        }
        while !self.eat(&TokenKind::RParen) {
            let (name, line, column) = self.expect_ident("an annotation name")?;
            let value = if self.eat(&TokenKind::Equals) {
                Some(self.expect_string("a string value")?)
            } else {
                None
            };
            self.eat_separator();
            annotations.push(Annotation { name, value, line, column });
        }
        Ok(annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(text: &str) -> Program {
        let tokens = tokenize(text).expect("tokenize failed");
        parse_program(&tokens).expect("parse failed")
    }

    fn parse_err(text: &str) -> CompileError {
        let tokens = tokenize(text).expect("tokenize failed");
        parse_program(&tokens).expect_err("parse unexpectedly succeeded")
    }

    #[test]
    fn parse_headers() {
        let program = parse(
            r#"
            include "shared/base.thrift"
            cpp_include "<unordered_map>"
            namespace * com.example
            namespace py example.gen
            "#,
        );
        assert_eq!(program.headers.len(), 4);
        match &program.headers[0] {
            Header::Include { path, .. } => assert_eq!(path, "shared/base.thrift"),
            other => panic!("expected an include, got {:?}", other),
        }
        match &program.headers[2] {
            Header::Namespace { scope, name, .. } => {
                assert_eq!(scope, "*");
                assert_eq!(name, "com.example");
            }
            other => panic!("expected a namespace, got {:?}", other),
        }
    }

    #[test]
    fn parse_struct_fields() {
        let program = parse(
            r#"
            struct User {
              1: required i64 id
              2: optional string name = "anonymous";
              3: map<string, list<i32>> scores,
              binary blob
            }
            "#,
        );
        assert_eq!(program.definitions.len(), 1);
        let def = match &program.definitions[0] {
            Definition::Struct(def) => def,
            other => panic!("expected a struct, got {:?}", other),
        };
        assert_eq!(def.kind, StructKind::Struct);
        assert_eq!(def.name, "User");
        assert_eq!(def.fields.len(), 4);

        assert_eq!(def.fields[0].id, Some(1));
        assert_eq!(def.fields[0].requiredness, Requiredness::Required);
        assert_eq!(def.fields[0].name, "id");

        assert_eq!(def.fields[1].requiredness, Requiredness::Optional);
        assert!(def.fields[1].default.is_some());

        match &def.fields[2].ty {
            TypeRef::Map { key, value, .. } => {
                assert!(matches!(**key, TypeRef::Base { base: BaseType::String, .. }));
                assert!(matches!(**value, TypeRef::List { .. }));
            }
            other => panic!("expected a map type, got {:?}", other),
        }

        assert_eq!(def.fields[3].id, None);
        assert_eq!(def.fields[3].requiredness, Requiredness::Unspecified);
    }

    #[test]
    fn parse_enum_items() {
        let program = parse("enum Role { Disabled, User = 5, Admin }");
        let def = match &program.definitions[0] {
            Definition::Enum(def) => def,
            other => panic!("expected an enum, got {:?}", other),
        };
        assert_eq!(def.items.len(), 3);
        assert_eq!(def.items[0].value, None);
        assert_eq!(def.items[1].value, Some(5));
        assert_eq!(def.items[2].value, None);
    }

    #[test]
    fn parse_service_functions() {
        let program = parse(
            r#"
            service UserService extends base.Service {
              User get(1: i64 id) throws (1: NotFound err);
              oneway void poke();
            }
            "#,
        );
        let def = match &program.definitions[0] {
            Definition::Service(def) => def,
            other => panic!("expected a service, got {:?}", other),
        };
        assert_eq!(def.extends.as_deref(), Some("base.Service"));
        assert_eq!(def.functions.len(), 2);

        let get = &def.functions[0];
        assert!(!get.oneway);
        assert!(get.return_type.is_some());
        assert_eq!(get.params.len(), 1);
        assert_eq!(get.throws.len(), 1);

        let poke = &def.functions[1];
        assert!(poke.oneway);
        assert!(poke.return_type.is_none());
        assert!(poke.params.is_empty());
    }

    #[test]
    fn parse_const_values() {
        let program = parse(
            r#"
            const i32 ANSWER = 42
            const list<double> WEIGHTS = [1.0, 2.5]
            const map<string, i32> NAMED = {"a": 1, "b": 2}
            const string GREETING = 'hello'
            const bool ENABLED = true
            "#,
        );
        assert_eq!(program.definitions.len(), 5);
        let named = match &program.definitions[2] {
            Definition::Constant(def) => def,
            other => panic!("expected a constant, got {:?}", other),
        };
        match &named.value.kind {
            ConstValueKind::Map(entries) => assert_eq!(entries.len(), 2),
            other => panic!("expected a map constant, got {:?}", other),
        }
    }

    #[test]
    fn parse_annotations_on_declarations() {
        let program = parse(
            r#"
            typedef i64 Timestamp (unit = "ms")
            struct Point {
              1: double x (axis = "horizontal");
              2: double y;
            } (packed)
            "#,
        );
        let typedef = match &program.definitions[0] {
            Definition::Typedef(def) => def,
            other => panic!("expected a typedef, got {:?}", other),
        };
        assert_eq!(typedef.annotations.len(), 1);
        assert_eq!(typedef.annotations[0].name, "unit");
        assert_eq!(typedef.annotations[0].value.as_deref(), Some("ms"));

        let point = match &program.definitions[1] {
            Definition::Struct(def) => def,
            other => panic!("expected a struct, got {:?}", other),
        };
        assert_eq!(point.fields[0].annotations.len(), 1);
        assert_eq!(point.annotations.len(), 1);
        assert_eq!(point.annotations[0].name, "packed");
        assert_eq!(point.annotations[0].value, None);
    }

    #[test]
    fn parse_error_positions() {
        let err = parse_err("struct {");
        match err {
            CompileError::Parse { msg, line, column } => {
                assert!(msg.contains("Expected an identifier"));
                assert_eq!(line, 1);
                assert_eq!(column, 8);
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn parse_error_on_stray_token() {
        let err = parse_err("= 3");
        assert!(err.to_string().contains("Unexpected token"));
    }
}
