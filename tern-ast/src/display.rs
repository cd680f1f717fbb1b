use std::fmt;

use crate::{EnumField, Expr, ExprKind, Field, Literal, ProcTypeExpr, UnaryOp};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(name) => write!(f, "{name}"),
            ExprKind::Literal(Literal::Int(v)) => write!(f, "{v}"),
            ExprKind::Literal(Literal::Float(v)) => write!(f, "{v:?}"),
            ExprKind::Literal(Literal::Str(s)) => write!(f, "{s:?}"),
            ExprKind::Paren(inner) => write!(f, "({inner})"),
            ExprKind::Unary { op, expr } => {
                let sym = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::AddrOf => "&",
                };
                write!(f, "{sym}{expr}")
            }
            ExprKind::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            ExprKind::Call { func, args } => {
                write!(f, "{func}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            ExprKind::Selector { expr, field } => write!(f, "{expr}.{}", field.name()),
            ExprKind::Pointer(elem) => write!(f, "^{elem}"),
            ExprKind::Array { count, elem } => match count {
                Some(count) => write!(f, "[{count}]{elem}"),
                None => write!(f, "[]{elem}"),
            },
            ExprKind::Struct(fields) => {
                write!(f, "struct {{")?;
                write_fields(f, fields)?;
                write!(f, "}}")
            }
            ExprKind::Union(fields) => {
                write!(f, "union {{")?;
                write_fields(f, fields)?;
                write!(f, "}}")
            }
            ExprKind::Enum { base, fields } => {
                write!(f, "enum")?;
                if let Some(base) = base {
                    write!(f, " {base}")?;
                }
                write!(f, " {{")?;
                write_enum_fields(f, fields)?;
                write!(f, "}}")
            }
            ExprKind::Proc(pt) => write!(f, "{pt}"),
        }
    }
}

impl fmt::Display for ProcTypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc(")?;
        write_fields(f, &self.params)?;
        write!(f, ")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [one] => write!(f, " -> {one}"),
            many => {
                write!(f, " -> (")?;
                write_list(f, many)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[Field]) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if field.is_using {
            write!(f, "using ")?;
        }
        let names: Vec<&str> = field.names.iter().map(|n| n.name()).collect();
        write!(f, "{}: {}", names.join(", "), field.ty)?;
    }
    Ok(())
}

fn write_enum_fields(f: &mut fmt::Formatter<'_>, fields: &[EnumField]) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", field.name.name())?;
        if let Some(value) = &field.value {
            write!(f, " = {value}")?;
        }
    }
    Ok(())
}
