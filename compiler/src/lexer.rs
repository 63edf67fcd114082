use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CompileError;
use crate::utils::quote;

lazy_static! {
    static ref HEX_LITERAL: Regex = Regex::new(r"^[+-]?0[xX][0-9a-fA-F]+$").unwrap();
    static ref INT_LITERAL: Regex = Regex::new(r"^[+-]?[0-9]+$").unwrap();
    static ref DOUBLE_LITERAL: Regex =
        Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    IntLiteral(i64),
    DoubleLiteral(f64),
    StringLiteral(String),

    // Keywords
    KwInclude,
    KwCppInclude,
    KwNamespace,
    KwConst,
    KwTypedef,
    KwEnum,
    KwStruct,
    KwUnion,
    KwException,
    KwService,
    KwExtends,
    KwRequired,
    KwOptional,
    KwVoid,
    KwTrue,
    KwFalse,
    KwOneway,
    KwThrows,

    // Base-type keywords
    KwBool,
    KwByte,
    KwI8,
    KwI16,
    KwI32,
    KwI64,
    KwDouble,
    KwString,
    KwBinary,
    KwList,
    KwSet,
    KwMap,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LAngle,
    RAngle,
    Comma,
    Semi,
    Equals,
    Colon,
    Star,
    LBracket,
    RBracket,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::IntLiteral(value) => write!(f, "{}", value),
            TokenKind::DoubleLiteral(value) => write!(f, "{}", value),
            TokenKind::StringLiteral(value) => write!(f, "{}", value),
            TokenKind::KwInclude => write!(f, "include"),
            TokenKind::KwCppInclude => write!(f, "cpp_include"),
            TokenKind::KwNamespace => write!(f, "namespace"),
            TokenKind::KwConst => write!(f, "const"),
            TokenKind::KwTypedef => write!(f, "typedef"),
            TokenKind::KwEnum => write!(f, "enum"),
            TokenKind::KwStruct => write!(f, "struct"),
            TokenKind::KwUnion => write!(f, "union"),
            TokenKind::KwException => write!(f, "exception"),
            TokenKind::KwService => write!(f, "service"),
            TokenKind::KwExtends => write!(f, "extends"),
            TokenKind::KwRequired => write!(f, "required"),
            TokenKind::KwOptional => write!(f, "optional"),
            TokenKind::KwVoid => write!(f, "void"),
            TokenKind::KwTrue => write!(f, "true"),
            TokenKind::KwFalse => write!(f, "false"),
            TokenKind::KwOneway => write!(f, "oneway"),
            TokenKind::KwThrows => write!(f, "throws"),
            TokenKind::KwBool => write!(f, "bool"),
            TokenKind::KwByte => write!(f, "byte"),
            TokenKind::KwI8 => write!(f, "i8"),
            TokenKind::KwI16 => write!(f, "i16"),
            TokenKind::KwI32 => write!(f, "i32"),
            TokenKind::KwI64 => write!(f, "i64"),
            TokenKind::KwDouble => write!(f, "double"),
            TokenKind::KwString => write!(f, "string"),
            TokenKind::KwBinary => write!(f, "binary"),
            TokenKind::KwList => write!(f, "list"),
            TokenKind::KwSet => write!(f, "set"),
            TokenKind::KwMap => write!(f, "map"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LAngle => write!(f, "<"),
            TokenKind::RAngle => write!(f, ">"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semi => write!(f, ";"),
            TokenKind::Equals => write!(f, "="),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub line:   usize,
    pub column: usize,
}

fn keyword(text: &str) -> Option<TokenKind> {
    Some(match text {
        "include" => TokenKind::KwInclude,
        "cpp_include" => TokenKind::KwCppInclude,
        "namespace" => TokenKind::KwNamespace,
        "const" => TokenKind::KwConst,
        "typedef" => TokenKind::KwTypedef,
        "enum" => TokenKind::KwEnum,
        "struct" => TokenKind::KwStruct,
        "union" => TokenKind::KwUnion,
        "exception" => TokenKind::KwException,
        "service" => TokenKind::KwService,
        "extends" => TokenKind::KwExtends,
        "required" => TokenKind::KwRequired,
        "optional" => TokenKind::KwOptional,
        "void" => TokenKind::KwVoid,
        "true" => TokenKind::KwTrue,
        "false" => TokenKind::KwFalse,
        "oneway" => TokenKind::KwOneway,
        "throws" => TokenKind::KwThrows,
        "bool" => TokenKind::KwBool,
        "byte" => TokenKind::KwByte,
        "i8" => TokenKind::KwI8,
        "i16" => TokenKind::KwI16,
        "i32" => TokenKind::KwI32,
        "i64" => TokenKind::KwI64,
        "double" => TokenKind::KwDouble,
        "string" => TokenKind::KwString,
        "binary" => TokenKind::KwBinary,
        "list" => TokenKind::KwList,
        "set" => TokenKind::KwSet,
        "map" => TokenKind::KwMap,
        _ => return None,
    })
}

/// Tokenize a Thrift source file. The returned stream always ends with an
/// EOF token so the parser never runs off the end.
pub fn tokenize(text: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer {
        chars:  text.chars().peekable(),
        line:   1,
        column: 1,
    };

    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token { kind: TokenKind::Eof, line: lexer.line, column: lexer.column });
    Ok(tokens)
}

struct Lexer<'a> {
    chars:  Peekable<Chars<'a>>,
    line:   usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, msg: String, line: usize, column: usize) -> CompileError {
        CompileError::Lex { msg, line, column }
    }

    fn next_token(&mut self) -> Result<Option<Token>, CompileError> {
        loop {
            match self.peek() {
                None => return Ok(None),
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line_comment(),
                Some('/') => self.skip_slash_comment()?,
                _ => break,
            }
        }

        let line = self.line;
        let column = self.column;
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(None),
        };

        let kind = match ch {
            'a'..='z' | 'A'..='Z' | '_' => self.scan_word(),
            '0'..='9' | '+' | '-' | '.' => self.scan_number(line, column)?,
            '"' | '\'' => self.scan_string(line, column)?,
            '{' => self.punct(TokenKind::LBrace),
            '}' => self.punct(TokenKind::RBrace),
            '(' => self.punct(TokenKind::LParen),
            ')' => self.punct(TokenKind::RParen),
            '<' => self.punct(TokenKind::LAngle),
            '>' => self.punct(TokenKind::RAngle),
            ',' => self.punct(TokenKind::Comma),
            ';' => self.punct(TokenKind::Semi),
            '=' => self.punct(TokenKind::Equals),
            ':' => self.punct(TokenKind::Colon),
            '*' => self.punct(TokenKind::Star),
            '[' => self.punct(TokenKind::LBracket),
            ']' => self.punct(TokenKind::RBracket),
            other => {
                return Err(self.error(
                    format!("unexpected character {}", quote(&other.to_string())),
                    line,
                    column,
                ))
            }
        };

        Ok(Some(Token { kind, line, column }))
    }

    fn punct(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.bump() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_slash_comment(&mut self) -> Result<(), CompileError> {
        let line = self.line;
        let column = self.column;
        self.bump();
        match self.peek() {
            Some('/') => {
                self.skip_line_comment();
                Ok(())
            }
            Some('*') => {
                self.bump();
                let mut prev = '\0';
                while let Some(ch) = self.bump() {
                    if prev == '*' && ch == '/' {
                        return Ok(());
                    }
                    prev = ch;
                }
                Err(self.error("unterminated block comment".to_owned(), line, column))
            }
            _ => Err(self.error("unexpected character \"/\"".to_owned(), line, column)),
        }
    }

    fn scan_word(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                text.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        match keyword(&text) {
            Some(kind) => kind,
            None => TokenKind::Ident(text),
        }
    }

    fn scan_number(&mut self, line: usize, column: usize) -> Result<TokenKind, CompileError> {
        let mut text = String::new();
        let mut prev = '\0';
        while let Some(ch) = self.peek() {
            let take = ch.is_ascii_alphanumeric()
                || ch == '.'
                || ((ch == '+' || ch == '-') && (text.is_empty() || prev == 'e' || prev == 'E'));
            if !take {
                break;
            }
            text.push(ch);
            prev = ch;
            self.bump();
        }

        if HEX_LITERAL.is_match(&text) {
            let (sign, digits) = match text.as_bytes()[0] {
                b'-' => (-1, &text[3..]),
                b'+' => (1, &text[3..]),
                _ => (1, &text[2..]),
            };
            return i64::from_str_radix(digits, 16)
                .map(|value| TokenKind::IntLiteral(sign * value))
                .map_err(|_| {
                    self.error(format!("invalid integer {}", quote(&text)), line, column)
                });
        }

        if INT_LITERAL.is_match(&text) {
            return text
                .parse::<i64>()
                .map(TokenKind::IntLiteral)
                .map_err(|_| {
                    self.error(format!("invalid integer {}", quote(&text)), line, column)
                });
        }

        if DOUBLE_LITERAL.is_match(&text) {
            return text
                .parse::<f64>()
                .map(TokenKind::DoubleLiteral)
                .map_err(|_| {
                    self.error(format!("invalid number {}", quote(&text)), line, column)
                });
        }

        Err(self.error(format!("invalid number {}", quote(&text)), line, column))
    }

    fn scan_string(&mut self, line: usize, column: usize) -> Result<TokenKind, CompileError> {
        let delimiter = match self.bump() {
            Some(ch) => ch,
            None => return Err(self.error("unterminated string literal".to_owned(), line, column)),
        };

        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(self.error(
                        "unterminated string literal".to_owned(),
                        line,
                        column,
                    ))
                }
                Some(ch) if ch == delimiter => return Ok(TokenKind::StringLiteral(text)),
                Some('\\') => match self.bump() {
                    None => {
                        return Err(self.error(
                            "unterminated string literal".to_owned(),
                            line,
                            column,
                        ))
                    }
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('0') => text.push('\0'),
                    Some(escaped) => text.push(escaped),
                },
                Some(ch) => text.push(ch),
            }
        }
    }
}
