mod common;

use common::*;
use tern_ast::{AstBuilder, BinaryOp};
use tern_sema::ErrorKind;

#[test]
fn break_outside_a_loop_is_rejected() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(&b, vec![b.brk(None)]);
    let err = expect_error(&checker, "`break` only allowed in `for` or `switch` statements");
    assert_eq!(err.kind, ErrorKind::IllegalControlFlow);
}

#[test]
fn break_is_allowed_in_a_switch() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![b.switch(None, vec![b.default_case(vec![b.brk(None)])])],
    );
    assert_clean(&checker);
}

#[test]
fn continue_in_a_switch_needs_an_enclosing_loop() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![b.switch(None, vec![b.default_case(vec![b.cont(None)])])],
    );
    expect_error(&checker, "`continue` only allowed in `for` statements");

    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![b.loop_forever(vec![b.switch(
            None,
            vec![b.default_case(vec![b.cont(None)])],
        )])],
    );
    assert_clean(&checker);
}

#[test]
fn labels_resolve_outward() {
    let b = AstBuilder::new("main.tern");
    let inner = b.loop_forever(vec![b.brk(Some("outer")), b.cont(Some("outer"))]);
    let checker = check_main(
        &b,
        vec![b.for_stmt(Some("outer"), None, None, None, vec![inner])],
    );
    assert_clean(&checker);
}

#[test]
fn unknown_label_is_rejected() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(&b, vec![b.loop_forever(vec![b.brk(Some("nope"))])]);
    expect_error(&checker, "Unknown label `nope`");
}

#[test]
fn continue_cannot_target_a_switch_label() {
    let b = AstBuilder::new("main.tern");
    let sw = b.labeled_switch(
        Some("sw"),
        None,
        vec![b.default_case(vec![b.cont(Some("sw"))])],
    );
    let checker = check_main(&b, vec![b.loop_forever(vec![sw])]);
    expect_error(&checker, "`continue` label `sw` does not refer to a `for` statement");
}

#[test]
fn fallthrough_only_ends_a_non_final_clause() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["x"], None, vec![b.int(1)]),
            b.switch(
                Some(b.name("x")),
                vec![
                    b.case(vec![b.int(1)], vec![b.fallthrough()]),
                    b.case(vec![b.int(2)], Vec::new()),
                ],
            ),
        ],
    );
    assert_clean(&checker);

    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["x"], None, vec![b.int(1)]),
            b.switch(
                Some(b.name("x")),
                vec![b.case(vec![b.int(1)], vec![b.fallthrough()])],
            ),
        ],
    );
    expect_error(&checker, "`fallthrough` statement in illegal position");
}

#[test]
fn fallthrough_must_be_the_last_statement() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.var(&["x"], None, vec![b.int(1)]),
            b.switch(
                Some(b.name("x")),
                vec![
                    b.case(
                        vec![b.int(1)],
                        vec![b.fallthrough(), b.assign(vec![b.name("x")], vec![b.int(2)])],
                    ),
                    b.default_case(Vec::new()),
                ],
            ),
        ],
    );
    expect_error(&checker, "`fallthrough` statement in illegal position");
}

#[test]
fn return_inside_defer_is_rejected() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(&b, vec![b.defer(b.ret(Vec::new()))]);
    expect_error(&checker, "You cannot `return` within a defer statement");
}

#[test]
fn declarations_cannot_be_deferred() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(&b, vec![b.defer(b.var(&["x"], None, vec![b.int(1)]))]);
    let err = expect_error(&checker, "You cannot defer a declaration");
    assert_eq!(err.kind, ErrorKind::InvalidDeclaration);
}

#[test]
fn else_must_be_an_if_or_a_block() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![b.if_stmt(b.name("true"), Vec::new(), Some(b.ret(Vec::new())))],
    );
    expect_error(&checker, "Invalid `else` statement in `if` statement");
}

#[test]
fn conditions_must_be_boolean() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.if_stmt(b.int(1), Vec::new(), None),
            b.for_stmt(None, None, Some(b.string("yes")), None, Vec::new()),
        ],
    );
    expect_error(&checker, "Non-boolean condition in `if` statement");
    expect_error(&checker, "Non-boolean condition in `for` statement");
}

#[test]
fn for_post_statement_cannot_declare() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![b.for_stmt(
            None,
            Some(b.var(&["i"], None, vec![b.int(0)])),
            Some(b.binary(BinaryOp::Lt, b.name("i"), b.int(10))),
            Some(b.var(&["j"], None, vec![b.int(1)])),
            Vec::new(),
        )],
    );
    expect_error(&checker, "`for` statement post statement cannot be a declaration");
}

#[test]
fn if_initializer_scopes_its_declaration() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![
            b.if_init(
                Some(b.var(&["n"], None, vec![b.int(3)])),
                b.binary(BinaryOp::Gt, b.name("n"), b.int(1)),
                vec![b.inc(b.name("n"))],
                None,
            ),
            b.inc(b.name("n")),
        ],
    );
    expect_error(&checker, "Undeclared name: n");
    assert_eq!(checker.errors().len(), 1, "unexpected errors: {:?}", checker.errors());
}

fn int_proc(b: &AstBuilder, name: &str, body: Vec<tern_ast::Stmt>) -> tern_ast::Stmt {
    b.proc(name, b.proc_type(Vec::new(), vec![b.name("int")]), body)
}

#[test]
fn if_else_chain_that_returns_everywhere_terminates() {
    let b = AstBuilder::new("main.tern");
    let f = int_proc(
        &b,
        "f",
        vec![b.if_stmt(
            b.name("true"),
            vec![b.ret(vec![b.int(1)])],
            Some(b.block_stmt(vec![b.ret(vec![b.int(2)])])),
        )],
    );
    let g = int_proc(
        &b,
        "g",
        vec![b.if_stmt(b.name("true"), vec![b.ret(vec![b.int(1)])], None)],
    );
    let checker = check(&[b.file(vec![f, g])]);
    assert_eq!(count_kind(&checker, ErrorKind::MissingReturn), 1);
}

#[test]
fn infinite_loop_terminates_unless_it_breaks() {
    let b = AstBuilder::new("main.tern");
    let spins = int_proc(&b, "spins", vec![b.loop_forever(Vec::new())]);
    let checker = check(&[b.file(vec![spins])]);
    assert_clean(&checker);

    let b = AstBuilder::new("main.tern");
    let escapes = int_proc(&b, "escapes", vec![b.loop_forever(vec![b.brk(None)])]);
    let checker = check(&[b.file(vec![escapes])]);
    expect_error(&checker, "Missing return statement");
}

#[test]
fn switch_with_default_that_returns_everywhere_terminates() {
    let b = AstBuilder::new("main.tern");
    let f = b.proc(
        "f",
        b.proc_type(vec![b.field("x", b.name("int"))], vec![b.name("int")]),
        vec![b.switch(
            Some(b.name("x")),
            vec![
                b.case(vec![b.int(1)], vec![b.ret(vec![b.int(10)])]),
                b.default_case(vec![b.ret(vec![b.int(0)])]),
            ],
        )],
    );
    let checker = check(&[b.file(vec![f])]);
    assert_clean(&checker);
}

#[test]
fn panic_terminates_a_procedure() {
    let b = AstBuilder::new("main.tern");
    let f = int_proc(
        &b,
        "f",
        vec![b.expr_stmt(b.call(b.name("panic"), vec![b.string("unreachable")]))],
    );
    let checker = check(&[b.file(vec![f])]);
    assert_clean(&checker);
}

#[test]
fn a_user_procedure_named_panic_does_not_terminate() {
    let b = AstBuilder::new("main.tern");
    let panic = b.proc(
        "panic",
        b.proc_type(vec![b.field("s", b.name("string"))], Vec::new()),
        Vec::new(),
    );
    let f = int_proc(
        &b,
        "f",
        vec![b.expr_stmt(b.call(b.name("panic"), vec![b.string("x")]))],
    );
    let checker = check(&[b.file(vec![panic, f])]);
    let err = expect_error(&checker, "Missing return statement at the end of the procedure");
    assert_eq!(err.kind, ErrorKind::MissingReturn);
    assert_eq!(checker.errors().len(), 1, "unexpected errors: {:?}", checker.errors());
}
