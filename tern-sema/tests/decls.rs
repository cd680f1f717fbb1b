mod common;

use common::*;
use proptest::prelude::*;
use tern_ast::{AstBuilder, BinaryOp, Decl, Stmt};
use tern_sema::{CheckerConfig, ConstValue, ErrorKind};

#[test]
fn file_scope_redeclaration_is_reported() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.constant(&["x"], None, vec![b.int(1)]),
        b.constant(&["x"], None, vec![b.int(2)]),
    ]);
    let checker = check(&[file]);
    let err = expect_error(&checker, "Redeclaration of `x` in this scope");
    assert_eq!(err.kind, ErrorKind::Redeclaration);
    assert!(err.message.contains("\n\tat main.tern("), "unexpected error: {}", err.message);
}

#[test]
fn globals_resolve_regardless_of_order() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.var(&["x"], None, vec![b.name("y")]),
        b.var(&["y"], Some(b.name("i64")), vec![b.int(3)]),
    ]);
    let checker = check(&[file]);
    assert_clean(&checker);

    let scope = checker.file_scope("main.tern").expect("file scope");
    let x = checker.lookup(scope, "x").expect("x declared");
    let ty = checker.entity(x).ty.expect("x typed");
    assert_eq!(checker.type_to_string(ty), "i64");
}

#[test]
fn cyclic_global_initialization_is_reported() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.var(&["a"], None, vec![b.name("b")]),
        b.var(&["b"], None, vec![b.name("a")]),
    ]);
    let checker = check(&[file]);
    let err = expect_error(&checker, "Cyclic initialization of");
    assert_eq!(err.kind, ErrorKind::CyclicDeclaration);
}

#[test]
fn constants_take_their_default_type() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.constant(&["F"], None, vec![b.float(1.5)]),
        b.constant(
            &["N"],
            None,
            vec![b.binary(BinaryOp::Mul, b.int(6), b.int(7))],
        ),
    ]);
    let checker = check(&[file]);
    assert_clean(&checker);

    let scope = checker.file_scope("main.tern").expect("file scope");
    let f = checker.lookup(scope, "F").expect("F declared");
    assert_eq!(checker.type_to_string(checker.entity(f).ty.expect("typed")), "f64");
    let n = checker.lookup(scope, "N").expect("N declared");
    assert_eq!(checker.type_to_string(checker.entity(n).ty.expect("typed")), "int");
    assert!(matches!(checker.constant_value(n), Some(ConstValue::Int(42))));
}

#[test]
fn constant_requires_a_constant_initializer() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.var(&["v"], None, vec![b.int(1)]),
        b.constant(&["C"], None, vec![b.name("v")]),
    ]);
    let checker = check(&[file]);
    let err = expect_error(&checker, "`v` is not a constant");
    assert_eq!(err.kind, ErrorKind::InvalidDeclaration);
}

#[test]
fn constant_lists_must_pair_up() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.constant(&["a", "b"], None, vec![b.int(1)]),
        b.constant(&["c"], None, vec![b.int(1), b.int(2)]),
    ]);
    let checker = check(&[file]);
    expect_error(&checker, "Missing constant value for `b`");
    expect_error(&checker, "Extra initial expression");
}

#[test]
fn variable_needs_a_type_or_a_value() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.var(&["x"], None, Vec::new())]);
    let checker = check(&[file]);
    expect_error(&checker, "Missing type or initial expression");
}

#[test]
fn statements_are_rejected_at_file_scope() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.ret(Vec::new())]);
    let checker = check(&[file]);
    expect_error(&checker, "Only declarations are allowed at file scope");
}

#[test]
fn local_constants_are_hoisted() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["a"], None, vec![b.name("C")]),
            b.constant(&["C"], None, vec![b.int(4)]),
        ],
    );
    assert_clean(&checker);
}

#[test]
fn local_variables_are_visible_only_after_their_declaration() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["a"], None, vec![b.name("c")]),
            b.var(&["c"], None, vec![b.int(1)]),
        ],
    );
    let err = expect_error(&checker, "Undeclared name: c");
    assert_eq!(err.kind, ErrorKind::Undeclared);
}

#[test]
fn initializer_does_not_see_the_variable_it_declares() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(&b, vec![b.var(&["x"], None, vec![b.name("x")])]);
    expect_error(&checker, "Undeclared name: x");
}

#[test]
fn inner_blocks_may_shadow() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["x"], None, vec![b.int(1)]),
            b.block_stmt(vec![b.var(&["x"], None, vec![b.string("s")])]),
        ],
    );
    assert_clean(&checker);
}

#[test]
fn local_redeclaration_in_one_block_is_reported() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["x"], None, vec![b.int(1)]),
            b.var(&["x"], None, vec![b.int(2)]),
        ],
    );
    expect_error(&checker, "Redeclaration of `x` in this scope");
}

#[test]
fn direct_type_cycle_is_reported() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.type_decl(
        "A",
        b.struct_type(vec![b.field("a", b.name("A"))]),
    )]);
    let checker = check(&[file]);
    let err = expect_error(&checker, "Illegal declaration cycle of `A`");
    assert_eq!(err.kind, ErrorKind::CyclicDeclaration);
}

#[test]
fn mutual_type_cycle_is_reported() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.type_decl("A", b.struct_type(vec![b.field("b", b.name("B"))])),
        b.type_decl("B", b.struct_type(vec![b.field("a", b.name("A"))])),
    ]);
    let checker = check(&[file]);
    expect_error(&checker, "Illegal declaration cycle of `A`");
}

#[test]
fn pointer_breaks_a_type_cycle() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.type_decl(
        "Node",
        b.struct_type(vec![
            b.field("value", b.name("int")),
            b.field("next", b.pointer(b.name("Node"))),
        ]),
    )]);
    let checker = check(&[file]);
    assert_clean(&checker);
}

#[test]
fn duplicate_struct_field_is_reported() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.type_decl(
        "P",
        b.struct_type(vec![b.field("x", b.name("int")), b.field("x", b.name("f32"))]),
    )]);
    let checker = check(&[file]);
    expect_error(&checker, "Field `x` is already declared in this struct");
}

#[test]
fn duplicate_enum_member_is_reported() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.type_decl(
            "Color",
            b.enum_type(None, vec![("Red", None), ("Green", Some(b.int(5))), ("Blue", None)]),
        ),
        b.type_decl("Dup", b.enum_type(None, vec![("A", None), ("A", None)])),
    ]);
    let checker = check(&[file]);
    expect_error(&checker, "Enum member `A` is already declared");
    assert_eq!(checker.errors().len(), 1, "unexpected errors: {:?}", checker.errors());
}

#[test]
fn enum_member_must_fit_its_base() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.type_decl(
        "Small",
        b.enum_type(Some(b.name("u8")), vec![("Big", Some(b.int(300)))]),
    )]);
    let checker = check(&[file]);
    expect_error(&checker, "does not fit in `u8`");
}

#[test]
fn nested_procedures_do_not_capture() {
    let b = AstBuilder::new("main.tern");
    let inner = b.proc(
        "inner",
        b.proc_type(Vec::new(), Vec::new()),
        vec![b.var(&["y"], None, vec![b.name("x")])],
    );
    let checker = check_main(&b, vec![b.var(&["x"], None, vec![b.int(1)]), inner]);
    let err = expect_error(&checker, "Nested procedures do not capture its parent's variables: `x`");
    assert_eq!(err.kind, ErrorKind::InvalidOperation);
}

#[test]
fn nested_procedures_see_enclosing_constants_and_globals() {
    let b = AstBuilder::new("main.tern");
    let inner = b.proc(
        "inner",
        b.proc_type(vec![b.field("p", b.name("int"))], Vec::new()),
        vec![b.var(
            &["y"],
            None,
            vec![b.binary(
                BinaryOp::Add,
                b.binary(BinaryOp::Add, b.name("C"), b.name("g")),
                b.name("p"),
            )],
        )],
    );
    let main = main_proc(&b, vec![b.constant(&["C"], None, vec![b.int(1)]), inner]);
    let file = b.file(vec![b.var(&["g"], Some(b.name("int")), Vec::new()), main]);
    let checker = check(&[file]);
    assert_clean(&checker);
}

#[test]
fn missing_return_is_reported_at_the_closing_brace() {
    let b = AstBuilder::new("main.tern");
    let f = b.proc("f", b.proc_type(Vec::new(), vec![b.name("int")]), Vec::new());
    let checker = check(&[b.file(vec![f])]);
    let err = expect_error(&checker, "Missing return statement at the end of the procedure");
    assert_eq!(err.kind, ErrorKind::MissingReturn);
}

#[test]
fn return_count_must_match_the_signature() {
    let b = AstBuilder::new("main.tern");
    let f = b.proc(
        "f",
        b.proc_type(Vec::new(), vec![b.name("int")]),
        vec![b.ret(Vec::new())],
    );
    let g = b.proc(
        "g",
        b.proc_type(Vec::new(), Vec::new()),
        vec![b.ret(vec![b.int(1)])],
    );
    let checker = check(&[b.file(vec![f, g])]);
    expect_error(&checker, "Expected 1 return value, got 0");
    expect_error(&checker, "Expected 0 return values, got 1");
    assert_eq!(count_kind(&checker, ErrorKind::MissingReturn), 0);
}

#[test]
fn entry_point_is_required_when_configured() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![b.constant(&["X"], None, vec![b.int(1)])]);
    let config = CheckerConfig {
        require_entry_point: true,
        ..CheckerConfig::default()
    };
    let checker = check_with(config, &[file]);
    expect_error(&checker, "Undefined entry point procedure `main`");
}

#[test]
fn entry_point_must_take_nothing() {
    let b = AstBuilder::new("main.tern");
    let main = b.proc(
        "main",
        b.proc_type(vec![b.field("argc", b.name("int"))], Vec::new()),
        Vec::new(),
    );
    let checker = check(&[b.file(vec![main])]);
    expect_error(&checker, "Procedure type of `main` was expected to be `proc()`");
}

#[test]
fn call_arity_is_checked() {
    let b = AstBuilder::new("main.tern");
    let f = b.proc(
        "f",
        b.proc_type(vec![b.field("a", b.name("int"))], Vec::new()),
        Vec::new(),
    );
    let main = main_proc(
        &b,
        vec![
            b.expr_stmt(b.call(b.name("f"), Vec::new())),
            b.expr_stmt(b.call(b.name("f"), vec![b.int(1), b.int(2)])),
            b.expr_stmt(b.call(b.name("f"), vec![b.string("s")])),
        ],
    );
    let checker = check(&[b.file(vec![f, main])]);
    expect_error(&checker, "Too few arguments for `f`, expected 1, got 0");
    expect_error(&checker, "Too many arguments for `f`, expected 1, got 2");
    expect_error(&checker, "to `int` in argument");
}

#[test]
fn procedure_without_body_is_rejected() {
    let b = AstBuilder::new("main.tern");
    let decl = b.proc_decl("f", b.proc_type(Vec::new(), Vec::new()), None);
    let checker = check(&[b.file(vec![Stmt::Decl(Decl::Proc(decl))])]);
    expect_error(&checker, "Procedure `f` has no body");
}

#[test]
fn conflicting_inline_tags_are_rejected() {
    let b = AstBuilder::new("main.tern");
    let body = b.block(Vec::new());
    let mut decl = b.proc_decl("f", b.proc_type(Vec::new(), Vec::new()), Some(body));
    decl.tags.inline = true;
    decl.tags.no_inline = true;
    let checker = check(&[b.file(vec![Stmt::Decl(Decl::Proc(decl))])]);
    expect_error(&checker, "You cannot apply both `inline` and `no_inline`");
}

fn distinct_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{3,8}_v", 1..12).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn distinct_constants_never_collide(names in distinct_names()) {
        let b = AstBuilder::new("main.tern");
        let decls = names
            .iter()
            .enumerate()
            .map(|(i, n)| b.constant(&[n.as_str()], None, vec![b.int(i as i128)]))
            .collect();
        let checker = check(&[b.file(decls)]);
        prop_assert!(checker.errors().is_empty());

        let scope = checker.file_scope("main.tern").expect("file scope");
        for (i, name) in names.iter().enumerate() {
            let e = checker.lookup(scope, name).expect("declared");
            let value = checker.constant_value(e);
            prop_assert!(matches!(value, Some(ConstValue::Int(v)) if *v == i as i128));
        }
    }

    #[test]
    fn repeating_a_name_reports_one_redeclaration(names in distinct_names(), pick in any::<prop::sample::Index>()) {
        let b = AstBuilder::new("main.tern");
        let repeated = pick.get(&names).clone();
        let mut decls: Vec<Stmt> = names
            .iter()
            .map(|n| b.constant(&[n.as_str()], None, vec![b.int(1)]))
            .collect();
        decls.push(b.constant(&[repeated.as_str()], None, vec![b.int(2)]));

        let checker = check(&[b.file(decls)]);
        prop_assert_eq!(count_kind(&checker, ErrorKind::Redeclaration), 1);
        let expected = format!("Redeclaration of `{repeated}`");
        prop_assert!(checker.errors()[0].message.contains(&expected));
    }
}
