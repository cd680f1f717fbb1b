#![allow(dead_code)]

use tern_ast::{AstBuilder, Expr, File, Stmt};
use tern_sema::{Checker, CheckerConfig, ErrorKind, SemanticError};

pub fn check(files: &[File]) -> Checker {
    check_with(CheckerConfig::default(), files)
}

pub fn check_with(config: CheckerConfig, files: &[File]) -> Checker {
    let mut checker = Checker::with_config(config);
    let _ = checker.check_files(files);
    checker
}

/// `main :: proc() { body }`
pub fn main_proc(b: &AstBuilder, body: Vec<Stmt>) -> Stmt {
    b.proc("main", b.proc_type(Vec::new(), Vec::new()), body)
}

/// A single file holding only `main`.
pub fn check_main(b: &AstBuilder, body: Vec<Stmt>) -> Checker {
    let main = main_proc(b, body);
    check(&[b.file(vec![main])])
}


#[track_caller]
pub fn assert_clean(checker: &Checker) {
    let errors = checker.errors();
    assert!(
        errors.is_empty(),
        "unexpected errors: {:#?}",
        errors.iter().map(|e| &e.message).collect::<Vec<_>>()
    );
}

/// The first error whose message contains `needle`.
#[track_caller]
pub fn expect_error(checker: &Checker, needle: &str) -> SemanticError {
    let errors = checker.errors();
    errors
        .iter()
        .find(|e| e.message.contains(needle))
        .cloned()
        .unwrap_or_else(|| {
            panic!(
                "expected an error containing {needle:?}, got: {:#?}",
                errors.iter().map(|e| &e.message).collect::<Vec<_>>()
            )
        })
}

pub fn count_kind(checker: &Checker, kind: ErrorKind) -> usize {
    checker.errors().iter().filter(|e| e.kind == kind).count()
}
