use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use miette::{Diagnostic, LabeledSpan, Severity};
use parking_lot::Mutex;
use tern_ast::{Pos, Span, Token};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Redeclaration,
    Undeclared,
    TypeMismatch,
    UntypedNilMisuse,
    ArityMismatch,
    IllegalControlFlow,
    MissingReturn,
    IllegalUsing,
    CyclicDeclaration,
    DuplicateCase,
    UnusedValue,
    InvalidOperation,
    InvalidDeclaration,
    UnusedImport,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Redeclaration => "redeclaration",
            ErrorKind::Undeclared => "undeclared",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::UntypedNilMisuse => "untyped_nil",
            ErrorKind::ArityMismatch => "arity_mismatch",
            ErrorKind::IllegalControlFlow => "illegal_control_flow",
            ErrorKind::MissingReturn => "missing_return",
            ErrorKind::IllegalUsing => "illegal_using",
            ErrorKind::CyclicDeclaration => "cyclic_declaration",
            ErrorKind::DuplicateCase => "duplicate_case",
            ErrorKind::UnusedValue => "unused_value",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::InvalidDeclaration => "invalid_declaration",
            ErrorKind::UnusedImport => "unused_import",
        }
    }
}

/// One diagnostic, positioned at the token that triggered it.
#[derive(Clone, Debug, Error)]
#[error("{pos} {message}")]
pub struct SemanticError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub pos: Pos,
    pub message: String,
    pub span: Span,
}

impl SemanticError {
    pub fn error(kind: ErrorKind, token: &Token, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            pos: token.pos.clone(),
            message: message.into(),
            span: token.span,
        }
    }

    pub fn warning(kind: ErrorKind, token: &Token, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, token, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Diagnostic for SemanticError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("tern::sema::{}", self.kind.code())))
    }

    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::underline(self.span))))
    }
}

/// Raised once the error count passes the configured cap. Every checking
/// routine propagates it; nothing recovers from it.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("too many errors ({count}), checking aborted")]
#[diagnostic(code(tern::sema::too_many_errors))]
pub struct TooManyErrors {
    pub count: usize,
}

pub type CheckResult<T> = Result<T, TooManyErrors>;

#[derive(Default)]
struct Reports {
    last: Option<Pos>,
    diagnostics: Vec<SemanticError>,
}

/// Shared sink for diagnostics. Safe to report into from several
/// procedure-body workers at once.
pub struct ErrorCollector {
    reports: Mutex<Reports>,
    count: AtomicUsize,
    cap: usize,
}

impl ErrorCollector {
    pub fn new(cap: usize) -> Self {
        Self {
            reports: Mutex::new(Reports::default()),
            count: AtomicUsize::new(0),
            cap,
        }
    }

    /// Records an error. An error at the same position as the one before it
    /// is counted but not stored.
    pub fn report(&self, err: SemanticError) -> CheckResult<()> {
        if self.count.load(Ordering::SeqCst) > self.cap {
            return Err(self.too_many());
        }

        let mut reports = self.reports.lock();
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if reports.last.as_ref() == Some(&err.pos) {
            tracing::trace!(pos = %err.pos, "suppressed repeated diagnostic");
        } else {
            tracing::trace!(pos = %err.pos, kind = err.kind.code(), message = %err.message, "diagnostic");
            reports.last = Some(err.pos.clone());
            reports.diagnostics.push(err);
        }
        drop(reports);

        if count > self.cap {
            return Err(TooManyErrors { count });
        }
        Ok(())
    }

    pub fn warn(&self, warning: SemanticError) {
        tracing::trace!(pos = %warning.pos, message = %warning.message, "warning");
        self.reports.lock().diagnostics.push(warning);
    }

    pub fn error_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_fatal(&self) -> bool {
        self.error_count() > self.cap
    }

    pub fn diagnostics(&self) -> Vec<SemanticError> {
        self.reports.lock().diagnostics.clone()
    }

    fn too_many(&self) -> TooManyErrors {
        TooManyErrors {
            count: self.error_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::AstBuilder;

    #[test]
    fn same_position_is_counted_but_not_stored() {
        let b = AstBuilder::new("t.tern");
        let tok = b.token("x");
        let errors = ErrorCollector::new(10);
        errors
            .report(SemanticError::error(ErrorKind::Undeclared, &tok, "first"))
            .expect("under cap");
        errors
            .report(SemanticError::error(ErrorKind::Undeclared, &tok, "second"))
            .expect("under cap");
        assert_eq!(errors.error_count(), 2);
        let stored = errors.diagnostics();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "first");
    }

    #[test]
    fn passing_the_cap_is_fatal() {
        let b = AstBuilder::new("t.tern");
        let errors = ErrorCollector::new(2);
        for _ in 0..2 {
            let tok = b.token("x");
            errors
                .report(SemanticError::error(ErrorKind::TypeMismatch, &tok, "bad"))
                .expect("under cap");
        }
        let tok = b.token("x");
        let err = errors
            .report(SemanticError::error(ErrorKind::TypeMismatch, &tok, "bad"))
            .expect_err("third error passes the cap");
        assert_eq!(err.count, 3);
        assert!(errors.is_fatal());

        let tok = b.token("y");
        errors
            .report(SemanticError::error(ErrorKind::TypeMismatch, &tok, "later"))
            .expect_err("collector stays fatal");
    }

    #[test]
    fn warnings_do_not_count() {
        let b = AstBuilder::new("t.tern");
        let errors = ErrorCollector::new(0);
        errors.warn(SemanticError::warning(
            ErrorKind::UnusedImport,
            &b.token("fmt"),
            "Unused import name: fmt",
        ));
        assert_eq!(errors.error_count(), 0);
        assert!(!errors.diagnostics()[0].is_error());
    }
}
