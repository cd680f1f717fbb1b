use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tern_ast::BinaryOp;
use thiserror::Error;

use crate::types::BasicKind;

/// A compile-time value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(Arc<str>),
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("constant overflow")]
    Overflow,
    #[error("operator not defined on these constants")]
    Unsupported,
}

impl ConstValue {
    /// Hash used to bucket switch cases. Equal values hash equally; ints and
    /// floats that compare equal share a bucket.
    pub fn hash_key(&self) -> u64 {
        let mut h = DefaultHasher::new();
        match self {
            ConstValue::Bool(b) => (0u8, *b).hash(&mut h),
            ConstValue::Int(v) => hash_number(*v as f64, &mut h),
            ConstValue::Float(v) => hash_number(*v, &mut h),
            ConstValue::String(s) => (2u8, &**s).hash(&mut h),
        }
        h.finish()
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality across int/float representations.
    pub fn same_value(&self, other: &ConstValue) -> bool {
        match (self, other) {
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::String(a), ConstValue::String(b)) => a == b,
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    pub fn negate(&self) -> Result<ConstValue, ValueError> {
        match self {
            ConstValue::Int(v) => v.checked_neg().map(ConstValue::Int).ok_or(ValueError::Overflow),
            ConstValue::Float(v) => Ok(ConstValue::Float(-v)),
            _ => Err(ValueError::Unsupported),
        }
    }

    pub fn not(&self) -> Result<ConstValue, ValueError> {
        match self {
            ConstValue::Bool(b) => Ok(ConstValue::Bool(!b)),
            _ => Err(ValueError::Unsupported),
        }
    }

    pub fn binary(&self, op: BinaryOp, rhs: &ConstValue) -> Result<ConstValue, ValueError> {
        use ConstValue::*;

        if op.is_comparison() {
            return compare(self, op, rhs).map(Bool);
        }
        match (self, rhs) {
            (Bool(a), Bool(b)) => match op {
                BinaryOp::And => Ok(Bool(*a && *b)),
                BinaryOp::Or => Ok(Bool(*a || *b)),
                _ => Err(ValueError::Unsupported),
            },
            (String(a), String(b)) if op == BinaryOp::Add => Ok(String(format!("{a}{b}").into())),
            (Int(a), Int(b)) => {
                let out = match op {
                    BinaryOp::Add => a.checked_add(*b),
                    BinaryOp::Sub => a.checked_sub(*b),
                    BinaryOp::Mul => a.checked_mul(*b),
                    BinaryOp::Div | BinaryOp::Rem if *b == 0 => {
                        return Err(ValueError::DivisionByZero);
                    }
                    BinaryOp::Div => a.checked_div(*b),
                    BinaryOp::Rem => a.checked_rem(*b),
                    _ => return Err(ValueError::Unsupported),
                };
                out.map(Int).ok_or(ValueError::Overflow)
            }
            (a, b) => {
                let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
                    return Err(ValueError::Unsupported);
                };
                match op {
                    BinaryOp::Add => Ok(Float(x + y)),
                    BinaryOp::Sub => Ok(Float(x - y)),
                    BinaryOp::Mul => Ok(Float(x * y)),
                    BinaryOp::Div if y == 0.0 => Err(ValueError::DivisionByZero),
                    BinaryOp::Div => Ok(Float(x / y)),
                    _ => Err(ValueError::Unsupported),
                }
            }
        }
    }

    /// Converts the value into the representation of `kind`, or `None` when
    /// it does not fit.
    pub fn represent_as(&self, kind: BasicKind) -> Option<ConstValue> {
        if kind.is_integer() || kind == BasicKind::UntypedInt {
            let v = match self {
                ConstValue::Int(v) => *v,
                ConstValue::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i128,
                _ => return None,
            };
            return match kind.int_range() {
                Some((lo, hi)) if v < lo || v > hi => None,
                _ => Some(ConstValue::Int(v)),
            };
        }
        if kind.is_float() || kind == BasicKind::UntypedFloat {
            let v = self.as_f64()?;
            let v = if kind == BasicKind::F32 {
                let narrow = v as f32;
                if narrow.is_infinite() && v.is_finite() {
                    return None;
                }
                narrow as f64
            } else {
                v
            };
            return Some(ConstValue::Float(v));
        }
        match (self, kind) {
            (ConstValue::Bool(_), BasicKind::Bool | BasicKind::UntypedBool) => Some(self.clone()),
            (ConstValue::String(_), BasicKind::String | BasicKind::UntypedString) => {
                Some(self.clone())
            }
            _ => None,
        }
    }
}

fn compare(a: &ConstValue, op: BinaryOp, b: &ConstValue) -> Result<bool, ValueError> {
    use std::cmp::Ordering;

    let ord = match (a, b) {
        (ConstValue::Bool(x), ConstValue::Bool(y)) => {
            return match op {
                BinaryOp::Eq => Ok(x == y),
                BinaryOp::NotEq => Ok(x != y),
                _ => Err(ValueError::Unsupported),
            };
        }
        (ConstValue::String(x), ConstValue::String(y)) => x.cmp(y),
        (ConstValue::Int(x), ConstValue::Int(y)) => x.cmp(y),
        (x, y) => {
            let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) else {
                return Err(ValueError::Unsupported);
            };
            x.partial_cmp(&y).ok_or(ValueError::Unsupported)?
        }
    };
    Ok(match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::LtEq => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        _ => return Err(ValueError::Unsupported),
    })
}

fn hash_number(v: f64, h: &mut impl Hasher) {
    1u8.hash(h);
    // -0.0 == 0.0
    let v = if v == 0.0 { 0.0f64 } else { v };
    v.to_bits().hash(h);
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v:?}"),
            ConstValue::String(s) => write!(f, "{s:?}"),
        }
    }
}
