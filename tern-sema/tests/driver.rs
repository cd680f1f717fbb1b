mod common;

use common::*;
use tern_ast::{AstBuilder, BinaryOp, File};
use tern_sema::{Checker, CheckerConfig, EntityKind};

/// `count` procedures, each with one undeclared name in its body.
fn broken_program(count: usize) -> Vec<File> {
    let b = AstBuilder::new("main.tern");
    let mut decls = Vec::new();
    for i in 0..count {
        decls.push(b.proc(
            &format!("p{i}"),
            b.proc_type(Vec::new(), Vec::new()),
            vec![
                b.var(&["ok"], None, vec![b.int(i as i128)]),
                b.var(&["bad"], None, vec![b.name(&format!("missing{i}"))]),
            ],
        ));
    }
    vec![b.file(decls)]
}

fn sorted_messages(checker: &Checker) -> Vec<String> {
    let mut messages: Vec<String> = checker.errors().into_iter().map(|e| e.message).collect();
    messages.sort();
    messages
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let files = broken_program(16);
    let sequential = check_with(
        CheckerConfig {
            error_cap: 100,
            ..CheckerConfig::default()
        },
        &files,
    );
    let parallel = check_with(
        CheckerConfig {
            error_cap: 100,
            parallel: true,
            ..CheckerConfig::default()
        },
        &files,
    );
    assert_eq!(sequential.errors().len(), 16);
    assert_eq!(sorted_messages(&sequential), sorted_messages(&parallel));
}

#[test]
fn sequential_errors_follow_source_order() {
    let files = broken_program(3);
    let checker = check(&files);
    let messages: Vec<String> = checker.errors().into_iter().map(|e| e.message).collect();
    assert_eq!(
        messages,
        vec![
            "Undeclared name: missing0",
            "Undeclared name: missing1",
            "Undeclared name: missing2",
        ]
    );
}

#[test]
fn checking_stops_past_the_error_cap() {
    let files = broken_program(8);
    let mut checker = Checker::with_config(CheckerConfig {
        error_cap: 3,
        ..CheckerConfig::default()
    });
    let err = checker.check_files(&files).expect_err("expected the error cap to trip");
    assert_eq!(err.count, 4);
    assert_eq!(checker.error_count(), 4);
    assert!(checker.errors().len() < 8);
}

#[test]
fn a_checker_can_be_reused() {
    let mut checker = Checker::new();
    let _ = checker.check_files(&broken_program(2));
    assert_eq!(checker.errors().len(), 2);

    let b = AstBuilder::new("main.tern");
    let clean = vec![b.file(vec![main_proc(&b, Vec::new())])];
    checker.check_files(&clean).expect("clean program");
    assert!(checker.diagnostics().is_empty());
}

#[test]
fn queries_reach_into_procedure_bodies() {
    let b = AstBuilder::new("main.tern");
    let body_stmts = vec![
        b.var(&["total"], Some(b.name("u32")), vec![b.int(0)]),
        b.op_assign(BinaryOp::Add, vec![b.name("total")], vec![b.int(2)]),
    ];
    let use_of_total = match &body_stmts[1] {
        tern_ast::Stmt::Assign(s) => s.lhs[0].id,
        _ => unreachable!(),
    };
    let body = b.block(body_stmts);
    let body_id = body.id;
    let decl = b.proc_decl("main", b.proc_type(Vec::new(), Vec::new()), Some(body));
    let file = b.file(vec![tern_ast::Stmt::Decl(tern_ast::Decl::Proc(decl))]);

    let mut checker = Checker::with_config(CheckerConfig {
        parallel: true,
        ..CheckerConfig::default()
    });
    checker.check_files(&[file]).expect("clean program");
    assert_clean(&checker);

    let scope = checker.scope_of(body_id).expect("body scope recorded");
    let total = checker.lookup(scope, "total").expect("local declared");
    assert!(matches!(checker.entity(total).kind, EntityKind::Variable(_)));
    assert_eq!(checker.entity_of_identifier(use_of_total), Some(total));
    let ty = checker.type_of_expression(use_of_total).expect("typed");
    assert_eq!(checker.type_to_string(ty), "u32");

    let file_scope = checker.file_scope("main.tern").expect("file scope");
    assert!(checker.lookup(file_scope, "total").is_none());
    assert!(checker.lookup(file_scope, "main").is_some());
    assert!(checker.lookup(checker.global_scope(), "len").is_some());
}

#[test]
fn config_loads_from_toml() {
    let config = CheckerConfig::from_toml_str(
        "error_cap = 1\nparallel = true\nrequire_entry_point = true\nentry_point = \"start\"\n",
    )
    .expect("valid config");
    let b = AstBuilder::new("main.tern");
    let checker = check_with(config, &[b.file(vec![main_proc(&b, Vec::new())])]);
    expect_error(&checker, "Undefined entry point procedure `start`");
}

#[test]
fn assignment_alone_does_not_mark_a_global_used() {
    let program = |with_reader: bool| {
        let b = AstBuilder::new("main.tern");
        let mut decls = vec![b.var(&["counter"], Some(b.name("int")), Vec::new())];
        for i in 0..8 {
            decls.push(b.proc(
                &format!("w{i}"),
                b.proc_type(Vec::new(), Vec::new()),
                vec![b.assign(vec![b.name("counter")], vec![b.int(i)])],
            ));
        }
        if with_reader {
            decls.push(b.proc(
                "read",
                b.proc_type(Vec::new(), Vec::new()),
                vec![b.var(&["seen"], None, vec![b.name("counter")])],
            ));
        }
        vec![b.file(decls)]
    };

    for parallel in [false, true] {
        for with_reader in [false, true] {
            let config = CheckerConfig {
                parallel,
                ..CheckerConfig::default()
            };
            let checker = check_with(config, &program(with_reader));
            assert_clean(&checker);
            let scope = checker.file_scope("main.tern").expect("file scope");
            let counter = checker.lookup(scope, "counter").expect("global declared");
            assert_eq!(
                checker.entity(counter).is_used(),
                with_reader,
                "parallel = {parallel}, with_reader = {with_reader}"
            );
        }
    }
}
