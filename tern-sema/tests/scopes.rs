mod common;

use common::*;
use proptest::prelude::*;
use tern_ast::{AstBuilder, Decl, Stmt};
use tern_sema::{ConstValue, ErrorKind};

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{2,6}_s", 1..8).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn inner_declarations_shadow_outer_ones(names in names()) {
        let b = AstBuilder::new("main.tern");
        let inner_block = b.block(
            names
                .iter()
                .map(|n| b.var(&[n.as_str()], None, vec![b.string("inner")]))
                .collect(),
        );
        let inner_id = inner_block.id;
        let mut stmts: Vec<Stmt> = names
            .iter()
            .map(|n| b.var(&[n.as_str()], None, vec![b.int(1)]))
            .collect();
        stmts.push(Stmt::Block(inner_block));
        let body = b.block(stmts);
        let body_id = body.id;
        let main = b.proc_decl("main", b.proc_type(Vec::new(), Vec::new()), Some(body));
        let checker = check(&[b.file(vec![Stmt::Decl(Decl::Proc(main))])]);
        prop_assert!(checker.errors().is_empty());

        let outer = checker.scope_of(body_id).expect("body scope");
        let inner = checker.scope_of(inner_id).expect("block scope");
        for name in &names {
            let from_inner = checker.lookup(inner, name).expect("visible inside");
            let from_outer = checker.lookup(outer, name).expect("visible outside");
            prop_assert_ne!(from_inner, from_outer);
            let inner_ty = checker.entity(from_inner).ty.expect("typed");
            let outer_ty = checker.entity(from_outer).ty.expect("typed");
            prop_assert_eq!(checker.type_to_string(inner_ty), "string");
            prop_assert_eq!(checker.type_to_string(outer_ty), "int");
        }
    }

    #[test]
    fn discard_is_never_declared(repeats in 1usize..6) {
        let b = AstBuilder::new("main.tern");
        let mut stmts = Vec::new();
        for i in 0..repeats {
            stmts.push(b.var(&["_"], None, vec![b.int(i as i128)]));
            stmts.push(b.assign(vec![b.name("_")], vec![b.string("dropped")]));
        }
        let body = b.block(stmts);
        let body_id = body.id;
        let main = b.proc_decl("main", b.proc_type(Vec::new(), Vec::new()), Some(body));
        let file = b.file(vec![
            b.constant(&["_"], None, vec![b.int(1)]),
            b.constant(&["_"], None, vec![b.int(2)]),
            Stmt::Decl(Decl::Proc(main)),
        ]);
        let checker = check(&[file]);
        prop_assert!(checker.errors().is_empty());

        let body_scope = checker.scope_of(body_id).expect("body scope");
        prop_assert!(checker.scope(body_scope).names().all(|n| n != "_"));
        let file_scope = checker.file_scope("main.tern").expect("file scope");
        prop_assert!(checker.scope(file_scope).names().all(|n| n != "_"));
    }
}

#[test]
fn first_declaration_wins() {
    let b = AstBuilder::new("main.tern");
    let file = b.file(vec![
        b.constant(&["x"], None, vec![b.int(1)]),
        b.constant(&["x"], None, vec![b.int(2)]),
    ]);
    let checker = check(&[file]);
    assert_eq!(count_kind(&checker, ErrorKind::Redeclaration), 1);

    let scope = checker.file_scope("main.tern").expect("file scope");
    let x = checker.lookup(scope, "x").expect("x declared");
    assert!(matches!(checker.constant_value(x), Some(ConstValue::Int(1))));
}

#[test]
fn tuple_assignment_reports_both_counts() {
    let b = AstBuilder::new("main.tern");
    let three = b.proc(
        "three",
        b.proc_type(
            Vec::new(),
            vec![b.name("int"), b.name("int"), b.name("int")],
        ),
        vec![b.ret(vec![b.int(1), b.int(2), b.int(3)])],
    );
    let main = main_proc(
        &b,
        vec![
            b.var(&["a", "c"], None, vec![b.int(0), b.int(0)]),
            b.assign(
                vec![b.name("a"), b.name("c")],
                vec![b.call(b.name("three"), Vec::new())],
            ),
        ],
    );
    let checker = check(&[b.file(vec![three, main])]);
    let err = expect_error(&checker, "Assignment count mismatch `2` = `3`");
    assert_eq!(err.kind, ErrorKind::ArityMismatch);
}

#[test]
fn foreign_pointer_parameters_are_similar_enough() {
    let records = |b: &AstBuilder| {
        vec![
            b.type_decl("T", b.struct_type(vec![b.field("a", b.name("int"))])),
            b.type_decl("U", b.struct_type(vec![b.field("b", b.name("f64"))])),
        ]
    };
    let external = |b: &AstBuilder, name: &str, param: tern_ast::Expr| {
        b.foreign_proc(
            name,
            Some("ext"),
            b.proc_type(vec![b.field("p", param)], Vec::new()),
        )
    };

    let b = AstBuilder::new("main.tern");
    let mut decls = records(&b);
    decls.push(external(&b, "via_t", b.pointer(b.name("T"))));
    decls.push(external(&b, "via_u", b.pointer(b.name("U"))));
    let checker = check(&[b.file(decls)]);
    assert_clean(&checker);

    let b = AstBuilder::new("main.tern");
    let mut decls = records(&b);
    decls.push(external(&b, "by_t", b.name("T")));
    decls.push(external(&b, "by_u", b.name("U")));
    let checker = check(&[b.file(decls)]);
    expect_error(&checker, "Redeclaration of foreign procedure `ext` with different type signatures");
}

#[test]
fn second_using_with_a_shared_field_collides_once() {
    let b = AstBuilder::new("main.tern");
    let a = b.type_decl("A", b.struct_type(vec![b.field("n", b.name("int"))]));
    let bb = b.type_decl(
        "B",
        b.struct_type(vec![b.field("n", b.name("int")), b.field("m", b.name("int"))]),
    );
    let main = main_proc(
        &b,
        vec![
            b.var(&["a"], Some(b.name("A")), Vec::new()),
            b.var(&["b"], Some(b.name("B")), Vec::new()),
            b.using(vec![b.name("a")]),
            b.using(vec![b.name("b")]),
        ],
    );
    let checker = check(&[b.file(vec![a, bb, main])]);
    let err = expect_error(&checker, "Namespace collision while `using` `b` of: n");
    assert_eq!(err.kind, ErrorKind::IllegalUsing);
    assert_eq!(checker.errors().len(), 1, "unexpected errors: {:?}", checker.errors());
}
