mod common;

use common::*;
use tern_ast::{AstBuilder, Decl, Stmt};
use tern_sema::{CheckerConfig, ErrorKind};

fn puts_type(b: &AstBuilder, param: &str) -> tern_ast::ProcTypeExpr {
    b.proc_type(vec![b.field("s", b.name(param))], vec![b.name("i32")])
}

fn linked(b: &AstBuilder, name: &str, symbol: &str) -> Stmt {
    let body = b.block(Vec::new());
    let mut decl = b.proc_decl(name, b.proc_type(Vec::new(), Vec::new()), Some(body));
    decl.link_name = Some(b.token(symbol));
    Stmt::Decl(Decl::Proc(decl))
}

#[test]
fn foreign_procedures_have_no_body_and_can_be_called() {
    let b = AstBuilder::new("main.tern");
    let puts = b.foreign_proc("puts", None, puts_type(&b, "rawptr"));
    let main = main_proc(
        &b,
        vec![b.var(&["r"], None, vec![b.call(b.name("puts"), vec![b.name("nil")])])],
    );
    let checker = check(&[b.file(vec![puts, main])]);
    assert_clean(&checker);
}

#[test]
fn same_external_name_with_same_signature_is_allowed() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.foreign_proc("puts", None, puts_type(&b, "rawptr")),
        b.foreign_proc("c_puts", Some("puts"), puts_type(&b, "rawptr")),
    ]);
    let checker = check(&[file]);
    assert_clean(&checker);
}

#[test]
fn same_external_name_with_other_signature_is_rejected() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.foreign_proc("puts", None, puts_type(&b, "rawptr")),
        b.foreign_proc("puts_str", Some("puts"), puts_type(&b, "string")),
    ]);
    let checker = check(&[file]);
    let err = expect_error(
        &checker,
        "Redeclaration of foreign procedure `puts` with different type signatures",
    );
    assert_eq!(err.kind, ErrorKind::Redeclaration);
}

#[test]
fn foreign_names_are_shared_across_files() {
    let a = AstBuilder::new("a.tern");
    let a_file = a.file(vec![a.foreign_proc("puts", None, puts_type(&a, "rawptr"))]);
    let b = AstBuilder::new("b.tern");
    let b_file = b.file(vec![b.foreign_proc("puts", None, puts_type(&b, "string"))]);
    let checker = check(&[a_file, b_file]);
    expect_error(&checker, "Redeclaration of foreign procedure `puts`");
}

#[test]
fn foreign_procedure_cannot_have_a_body() {
    let b = AstBuilder::new("main.tern");
    let body = b.block(Vec::new());
    let mut decl = b.proc_decl("puts", puts_type(&b, "rawptr"), Some(body));
    decl.tags.foreign = true;
    let checker = check(&[b.file(vec![Stmt::Decl(Decl::Proc(decl))])]);
    expect_error(&checker, "A procedure tagged as `#foreign` cannot have a body");
}

#[test]
fn foreign_procedure_must_be_at_file_scope() {
    let b = AstBuilder::new("main.tern");
    let checker = check_main(
        &b,
        vec![b.foreign_proc("puts", None, puts_type(&b, "rawptr"))],
    );
    expect_error(&checker, "Foreign procedures must be declared at file scope");
}

#[test]
fn foreign_and_link_name_do_not_mix() {
    let b = AstBuilder::new("main.tern");
    let mut decl = b.proc_decl("puts", puts_type(&b, "rawptr"), None);
    decl.tags.foreign = true;
    decl.link_name = Some(b.token("my_puts"));
    let checker = check(&[b.file(vec![Stmt::Decl(Decl::Proc(decl))])]);
    expect_error(&checker, "You cannot apply both `foreign` and `link_name` to a procedure");
}

#[test]
fn link_names_must_be_unique() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        linked(&b, "first", "entry_sym"),
        linked(&b, "second", "entry_sym"),
        linked(&b, "third", "other_sym"),
    ]);
    let checker = check(&[file]);
    let err = expect_error(&checker, "Non unique #link_name for procedure `entry_sym`");
    assert!(err.message.contains("\tother at main.tern("), "unexpected error: {}", err.message);
    assert_eq!(checker.errors().len(), 1, "unexpected errors: {:?}", checker.errors());
}

#[test]
fn nested_link_name_collides_with_a_file_level_one() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        linked(&b, "first", "entry_sym"),
        main_proc(&b, vec![linked(&b, "inner", "entry_sym")]),
    ]);
    let checker = check(&[file]);
    let err = expect_error(&checker, "Non unique #link_name for procedure `entry_sym`");
    assert_eq!(err.kind, ErrorKind::Redeclaration);
    assert_eq!(checker.errors().len(), 1, "unexpected errors: {:?}", checker.errors());
}

#[test]
fn link_names_collide_across_procedure_bodies() {
    for parallel in [false, true] {
        let b = AstBuilder::new("main.tern");
        let outer = |name: &str, inner: &str| {
            b.proc(
                name,
                b.proc_type(Vec::new(), Vec::new()),
                vec![linked(&b, inner, "sym")],
            )
        };
        let file = b.file(vec![outer("f", "a"), outer("g", "b")]);
        let config = CheckerConfig {
            parallel,
            ..CheckerConfig::default()
        };
        let checker = check_with(config, &[file]);
        expect_error(&checker, "Non unique #link_name for procedure `sym`");
        assert_eq!(
            checker.errors().len(),
            1,
            "parallel = {parallel}, unexpected errors: {:?}",
            checker.errors()
        );
    }
}
