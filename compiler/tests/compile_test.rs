use spindrift_compiler::spec::{
    ConstSpec, DefSpec, FieldSpec, Requiredness, StructKind, TypeSpec,
};
use spindrift_compiler::{compile_source, Compilation, Compiler, MemoryFilesystem};
use spindrift_wire::TypeCode;

fn compile(text: &str) -> Compilation {
    compile_source("test", text).expect("compile failed")
}

fn compile_err(text: &str) -> String {
    compile_source("test", text)
        .expect_err("compile unexpectedly succeeded")
        .to_string()
}

fn lookup<'a>(compilation: &'a Compilation, name: &str) -> &'a DefSpec {
    let id = compilation
        .find(compilation.root, name)
        .unwrap_or_else(|| panic!("definition {:?} not found", name));
    compilation.def(id)
}

fn enum_items(compilation: &Compilation, name: &str) -> Vec<(String, i32)> {
    match lookup(compilation, name) {
        DefSpec::Enum(spec) => spec
            .items
            .iter()
            .map(|item| (item.name.clone(), item.value))
            .collect(),
        other => panic!("expected an enum, got {:?}", other),
    }
}

fn struct_fields<'a>(compilation: &'a Compilation, name: &str) -> &'a [FieldSpec] {
    match lookup(compilation, name) {
        DefSpec::Struct(spec) => &spec.fields.fields,
        other => panic!("expected a struct, got {:?}", other),
    }
}

#[test]
fn enum_default_values() {
    let compilation = compile("enum Role { Disabled, User, Moderator, Admin }");
    assert_eq!(
        enum_items(&compilation, "Role"),
        vec![
            ("Disabled".to_owned(), 0),
            ("User".to_owned(), 1),
            ("Moderator".to_owned(), 2),
            ("Admin".to_owned(), 3),
        ]
    );

    let id = compilation.find(compilation.root, "Role").unwrap();
    assert_eq!(compilation.type_code(&TypeSpec::Defined(id)), TypeCode::I32);
}

#[test]
fn enum_explicit_values() {
    let compilation = compile("enum CommentStatus { Visible = 12345, Hidden = 54321 }");
    assert_eq!(
        enum_items(&compilation, "CommentStatus"),
        vec![("Visible".to_owned(), 12345), ("Hidden".to_owned(), 54321)]
    );
}

#[test]
fn enum_mixed_values() {
    let compilation = compile("enum foo { A, B, C = 10, D, E }");
    assert_eq!(
        enum_items(&compilation, "foo"),
        vec![
            ("A".to_owned(), 0),
            ("B".to_owned(), 1),
            ("C".to_owned(), 10),
            ("D".to_owned(), 11),
            ("E".to_owned(), 12),
        ]
    );
}

#[test]
fn enum_repeated_values() {
    let compilation = compile("enum bar { A, B = 0, C, D = 0, E }");
    assert_eq!(
        enum_items(&compilation, "bar"),
        vec![
            ("A".to_owned(), 0),
            ("B".to_owned(), 0),
            ("C".to_owned(), 1),
            ("D".to_owned(), 0),
            ("E".to_owned(), 1),
        ]
    );
}

#[test]
fn enum_duplicate_item_fails() {
    let message = compile_err("enum Foo { A, B, C, A, D }");
    assert!(message.contains("cannot compile \"Foo.A\""), "got: {}", message);
    assert!(
        message.contains("the name \"A\" has already been used"),
        "got: {}",
        message
    );
}

#[test]
fn enum_value_out_of_range_fails() {
    let message = compile_err("enum Huge { A = 3000000000 }");
    assert!(message.contains("out of range"), "got: {}", message);
}

#[test]
fn struct_fields_link() {
    let compilation = compile(
        r#"
        struct User {
          1: required i64 id
          2: optional string name
          3: map<string, list<i32>> scores
        }
        "#,
    );
    let fields = struct_fields(&compilation, "User");
    assert_eq!(fields.len(), 3);

    assert_eq!(fields[0].id, 1);
    assert_eq!(fields[0].required, Requiredness::Required);
    assert_eq!(fields[0].ty, TypeSpec::I64);

    assert_eq!(fields[1].required, Requiredness::Optional);
    assert_eq!(fields[1].ty, TypeSpec::String);

    assert_eq!(
        fields[2].ty,
        TypeSpec::Map(
            Box::new(TypeSpec::String),
            Box::new(TypeSpec::List(Box::new(TypeSpec::I32))),
        )
    );
    assert_eq!(
        compilation.type_code(&fields[2].ty),
        TypeCode::Map
    );
}

#[test]
fn auto_field_ids_decrease_from_minus_one() {
    let compilation = compile(
        r#"
        struct Mixed {
          i32 a
          1: i32 b
          i32 c
        }
        "#,
    );
    let fields = struct_fields(&compilation, "Mixed");
    assert_eq!(fields[0].id, -1);
    assert_eq!(fields[1].id, 1);
    assert_eq!(fields[2].id, -2);
}

#[test]
fn auto_field_ids_skip_used_ids() {
    let compilation = compile(
        r#"
        struct Skipping {
          i32 a
          -2: i32 b
          i32 c
        }
        "#,
    );
    let fields = struct_fields(&compilation, "Skipping");
    assert_eq!(fields[0].id, -1);
    assert_eq!(fields[1].id, -2);
    assert_eq!(fields[2].id, -3);
}

#[test]
fn duplicate_field_id_fails() {
    let message = compile_err("struct S { 1: i32 a; 1: i32 b }");
    assert!(message.contains("cannot compile \"S.b\""), "got: {}", message);
    assert!(message.contains("field id 1 has already been used"), "got: {}", message);
}

#[test]
fn duplicate_field_name_fails() {
    let message = compile_err("struct S { 1: i32 a; 2: i64 a }");
    assert!(
        message.contains("the field name \"a\" has already been used"),
        "got: {}",
        message
    );
}

#[test]
fn field_id_out_of_range_fails() {
    let message = compile_err("struct S { 40000: i32 a }");
    assert!(message.contains("out of range"), "got: {}", message);
}

#[test]
fn union_fields_become_optional() {
    let compilation = compile(
        r#"
        union Either {
          1: i32 left
          2: string right
        }
        "#,
    );
    match lookup(&compilation, "Either") {
        DefSpec::Struct(spec) => {
            assert_eq!(spec.kind, StructKind::Union);
            for field in &spec.fields.fields {
                assert_eq!(field.required, Requiredness::Optional);
            }
        }
        other => panic!("expected a union, got {:?}", other),
    }
}

#[test]
fn union_with_one_field_fails() {
    let message = compile_err("union Solo { 1: i32 only }");
    assert!(message.contains("at least two fields"), "got: {}", message);
}

#[test]
fn union_with_required_field_fails() {
    let message = compile_err(
        r#"
        union Broken {
          1: required i32 left
          2: string right
        }
        "#,
    );
    assert!(message.contains("cannot be required"), "got: {}", message);
}

#[test]
fn exceptions_share_struct_shape() {
    let compilation = compile(
        r#"
        exception NotFound {
          1: string message
        }
        "#,
    );
    match lookup(&compilation, "NotFound") {
        DefSpec::Struct(spec) => {
            assert_eq!(spec.kind, StructKind::Exception);
            let id = compilation.find(compilation.root, "NotFound").unwrap();
            assert_eq!(compilation.type_code(&TypeSpec::Defined(id)), TypeCode::Struct);
        }
        other => panic!("expected an exception, got {:?}", other),
    }
}

#[test]
fn typedefs_are_transparent_for_type_codes() {
    let compilation = compile(
        r#"
        typedef i64 Timestamp
        typedef Timestamp CreatedAt
        struct Post { 1: CreatedAt created }
        "#,
    );
    let fields = struct_fields(&compilation, "Post");
    assert_eq!(compilation.type_code(&fields[0].ty), TypeCode::I64);

    // The typedef stays distinct for naming.
    let id = compilation.find(compilation.root, "CreatedAt").unwrap();
    match compilation.def(id) {
        DefSpec::Typedef(spec) => assert_eq!(spec.name, "CreatedAt"),
        other => panic!("expected a typedef, got {:?}", other),
    }
}

#[test]
fn typedef_cycle_fails() {
    let message = compile_err(
        r#"
        typedef B A
        typedef A B
        "#,
    );
    assert!(message.contains("circular"), "got: {}", message);
}

#[test]
fn typedef_container_cycle_fails() {
    let message = compile_err("typedef list<A> A");
    assert!(message.contains("circular"), "got: {}", message);
}

#[test]
fn typedef_cycle_through_struct_is_legal() {
    let compilation = compile(
        r#"
        typedef Node NodeRef
        struct Node { 1: optional NodeRef next }
        "#,
    );
    let fields = struct_fields(&compilation, "Node");
    assert_eq!(compilation.type_code(&fields[0].ty), TypeCode::Struct);
}

#[test]
fn constants_resolve() {
    let compilation = compile(
        r#"
        const i32 ANSWER = 42
        const list<double> WEIGHTS = [1, 2.5]
        const map<string, i64> COUNTS = {"a": 1}
        "#,
    );
    match lookup(&compilation, "ANSWER") {
        DefSpec::Constant(spec) => assert_eq!(spec.value, ConstSpec::I64(42)),
        other => panic!("expected a constant, got {:?}", other),
    }
    match lookup(&compilation, "WEIGHTS") {
        DefSpec::Constant(spec) => assert_eq!(
            spec.value,
            ConstSpec::List(vec![ConstSpec::Double(1.0), ConstSpec::Double(2.5)])
        ),
        other => panic!("expected a constant, got {:?}", other),
    }
}

#[test]
fn constant_references_resolve_in_order() {
    let compilation = compile(
        r#"
        const i32 BASE = 7
        const i32 DERIVED = BASE
        struct S { 1: i32 x = BASE }
        "#,
    );
    let base = compilation.find(compilation.root, "BASE").unwrap();
    match lookup(&compilation, "DERIVED") {
        DefSpec::Constant(spec) => assert_eq!(spec.value, ConstSpec::ConstRef(base)),
        other => panic!("expected a constant, got {:?}", other),
    }
    let fields = struct_fields(&compilation, "S");
    assert_eq!(fields[0].default, Some(ConstSpec::ConstRef(base)));
}

#[test]
fn forward_constant_reference_fails() {
    let message = compile_err(
        r#"
        const i32 EARLY = LATE
        const i32 LATE = 3
        "#,
    );
    assert!(message.contains("before its definition"), "got: {}", message);
}

#[test]
fn enum_defaults_accept_values_and_names() {
    let compilation = compile(
        r#"
        enum Role { Disabled, User, Admin }
        struct Account {
          1: Role by_value = 2
          2: Role by_name = Admin
          3: Role qualified = Role.User
        }
        "#,
    );
    let role = compilation.find(compilation.root, "Role").unwrap();
    let fields = struct_fields(&compilation, "Account");
    assert_eq!(fields[0].default, Some(ConstSpec::EnumItem { def: role, item: 2 }));
    assert_eq!(fields[1].default, Some(ConstSpec::EnumItem { def: role, item: 2 }));
    assert_eq!(fields[2].default, Some(ConstSpec::EnumItem { def: role, item: 1 }));
}

#[test]
fn enum_default_out_of_range_fails() {
    let message = compile_err(
        r#"
        enum Role { Disabled, User }
        struct Account { 1: Role role = 9 }
        "#,
    );
    assert!(message.contains("cannot compile \"Account.role\""), "got: {}", message);
    assert!(message.contains("not a value of enum"), "got: {}", message);
}

#[test]
fn scalar_default_type_mismatch_fails() {
    let message = compile_err("struct S { 1: i32 x = \"nope\" }");
    assert!(message.contains("not assignable"), "got: {}", message);

    let message = compile_err("struct S { 1: i8 x = 1000 }");
    assert!(message.contains("does not fit"), "got: {}", message);

    let message = compile_err("struct S { 1: bool x = 1 }");
    assert!(message.contains("not assignable"), "got: {}", message);
}

#[test]
fn struct_defaults_check_fields() {
    let compilation = compile(
        r#"
        struct Point { 1: required double x; 2: required double y }
        struct Shape { 1: Point origin = {"x": 0, "y": 0} }
        "#,
    );
    let fields = struct_fields(&compilation, "Shape");
    assert_eq!(
        fields[0].default,
        Some(ConstSpec::Struct(vec![
            ("x".to_owned(), ConstSpec::Double(0.0)),
            ("y".to_owned(), ConstSpec::Double(0.0)),
        ]))
    );

    let message = compile_err(
        r#"
        struct Point { 1: required double x; 2: required double y }
        struct Shape { 1: Point origin = {"x": 0} }
        "#,
    );
    assert!(message.contains("required field"), "got: {}", message);

    let message = compile_err(
        r#"
        struct Point { 1: double x }
        struct Shape { 1: Point origin = {"z": 0} }
        "#,
    );
    assert!(message.contains("is not a field of"), "got: {}", message);
}

#[test]
fn union_constants_set_exactly_one_field() {
    let compilation = compile(
        r#"
        union Either { 1: i32 left; 2: string right }
        const Either LEFT = {"left": 3}
        "#,
    );
    match lookup(&compilation, "LEFT") {
        DefSpec::Constant(spec) => assert_eq!(
            spec.value,
            ConstSpec::Struct(vec![("left".to_owned(), ConstSpec::I64(3))])
        ),
        other => panic!("expected a constant, got {:?}", other),
    }

    let message = compile_err(
        r#"
        union Either { 1: i32 left; 2: string right }
        const Either BOTH = {"left": 3, "right": "x"}
        "#,
    );
    assert!(message.contains("exactly one field"), "got: {}", message);
}

#[test]
fn services_link_functions() {
    let compilation = compile(
        r#"
        exception NotFound { 1: string message }
        struct User { 1: i64 id }
        service UserService {
          User get(1: i64 id) throws (1: NotFound missing)
          oneway void poke()
        }
        "#,
    );
    match lookup(&compilation, "UserService") {
        DefSpec::Service(spec) => {
            assert_eq!(spec.functions.len(), 2);

            let get = &spec.functions[0];
            assert_eq!(get.params.fields.len(), 1);
            assert_eq!(get.exceptions.fields.len(), 1);
            let result = get.result_fields();
            assert_eq!(result.fields.len(), 2);
            assert_eq!(result.fields[0].id, 0);
            assert_eq!(result.fields[0].name, "success");

            let poke = &spec.functions[1];
            assert!(poke.oneway);
            assert!(poke.return_type.is_none());
            assert_eq!(poke.result_fields().fields.len(), 0);
        }
        other => panic!("expected a service, got {:?}", other),
    }
}

#[test]
fn service_extends_resolve() {
    let compilation = compile(
        r#"
        service Base { void ping() }
        service Derived extends Base { void pong() }
        "#,
    );
    let base = compilation.find(compilation.root, "Base").unwrap();
    match lookup(&compilation, "Derived") {
        DefSpec::Service(spec) => assert_eq!(spec.extends, Some(base)),
        other => panic!("expected a service, got {:?}", other),
    }
}

#[test]
fn service_extends_cycle_fails() {
    let message = compile_err(
        r#"
        service A extends B { void a() }
        service B extends A { void b() }
        "#,
    );
    assert!(message.contains("inheritance cycle"), "got: {}", message);
}

#[test]
fn service_extends_non_service_fails() {
    let message = compile_err(
        r#"
        struct NotAService { 1: i32 x }
        service S extends NotAService { void f() }
        "#,
    );
    assert!(message.contains("is not a service"), "got: {}", message);
}

#[test]
fn oneway_with_return_value_fails() {
    let message = compile_err("service S { oneway i32 f() }");
    assert!(message.contains("cannot return a value"), "got: {}", message);
}

#[test]
fn throws_must_name_exceptions() {
    let message = compile_err(
        r#"
        struct Plain { 1: i32 x }
        service S { void f() throws (1: Plain oops) }
        "#,
    );
    assert!(message.contains("must be an exception"), "got: {}", message);
}

#[test]
fn redefinition_fails() {
    let message = compile_err("struct Foo {} enum Foo { A }");
    assert!(message.contains("cannot compile \"Foo\""), "got: {}", message);
    assert!(message.contains("already been used"), "got: {}", message);
}

#[test]
fn unknown_type_fails() {
    let message = compile_err("struct S { 1: Missing field }");
    assert!(
        message.contains("could not resolve reference \"Missing\""),
        "got: {}",
        message
    );
}

#[test]
fn service_in_type_position_fails() {
    let message = compile_err(
        r#"
        service Svc { void f() }
        struct S { 1: Svc broken }
        "#,
    );
    assert!(message.contains("is not a type"), "got: {}", message);
}

#[test]
fn includes_resolve_qualified_names() {
    let mut fs = MemoryFilesystem::new();
    fs.insert("shared/levels.thrift", "enum Level { Low, High }");
    fs.insert(
        "main.thrift",
        r#"
        include "shared/levels.thrift"
        struct Event {
          1: levels.Level level = levels.Level.High
        }
        "#,
    );

    let compilation = Compiler::with_filesystem(fs)
        .compile("main.thrift")
        .expect("compile failed");

    assert_eq!(compilation.modules.len(), 2);
    let root = compilation.root_module();
    assert_eq!(root.name, "main");
    assert!(root.includes.contains_key("levels"));

    let level = compilation.find(compilation.root, "levels.Level").unwrap();
    let fields = struct_fields(&compilation, "Event");
    assert_eq!(fields[0].ty, TypeSpec::Defined(level));
    assert_eq!(fields[0].default, Some(ConstSpec::EnumItem { def: level, item: 1 }));
}

#[test]
fn include_cycle_fails() {
    let mut fs = MemoryFilesystem::new();
    fs.insert("a.thrift", "include \"b.thrift\"\n");
    fs.insert("b.thrift", "include \"a.thrift\"\n");

    let message = Compiler::with_filesystem(fs)
        .compile("a.thrift")
        .expect_err("compile unexpectedly succeeded")
        .to_string();

    assert!(message.contains("import cycle"), "got: {}", message);
    assert!(message.contains("a.thrift"), "got: {}", message);
    assert!(message.contains("b.thrift"), "got: {}", message);
}

#[test]
fn missing_include_fails() {
    let mut fs = MemoryFilesystem::new();
    fs.insert("main.thrift", "include \"gone.thrift\"\n");

    let message = Compiler::with_filesystem(fs)
        .compile("main.thrift")
        .expect_err("compile unexpectedly succeeded")
        .to_string();

    assert!(message.contains("cannot include"), "got: {}", message);
}

#[test]
fn namespaces_are_recorded() {
    let compilation = compile(
        r#"
        namespace * com.example
        namespace py example.gen
        enum E { A }
        "#,
    );
    let root = compilation.root_module();
    assert_eq!(
        root.namespaces,
        vec![
            ("*".to_owned(), "com.example".to_owned()),
            ("py".to_owned(), "example.gen".to_owned()),
        ]
    );
}

#[test]
fn compile_errors_carry_the_file() {
    let message = compile_err("struct S {");
    assert!(message.contains("test.thrift"), "got: {}", message);
}
