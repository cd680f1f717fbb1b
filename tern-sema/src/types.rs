use std::sync::Arc;

use crate::arena::{EntityId, Lookup, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    F32,
    F64,
    String,
    Rawptr,
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    /// Declaration order; a kind's position is its reserved type index.
    pub const ALL: [BasicKind; 21] = [
        BasicKind::Invalid,
        BasicKind::Bool,
        BasicKind::I8,
        BasicKind::I16,
        BasicKind::I32,
        BasicKind::I64,
        BasicKind::Int,
        BasicKind::U8,
        BasicKind::U16,
        BasicKind::U32,
        BasicKind::U64,
        BasicKind::Uint,
        BasicKind::F32,
        BasicKind::F64,
        BasicKind::String,
        BasicKind::Rawptr,
        BasicKind::UntypedBool,
        BasicKind::UntypedInt,
        BasicKind::UntypedFloat,
        BasicKind::UntypedString,
        BasicKind::UntypedNil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::I8 => "i8",
            BasicKind::I16 => "i16",
            BasicKind::I32 => "i32",
            BasicKind::I64 => "i64",
            BasicKind::Int => "int",
            BasicKind::U8 => "u8",
            BasicKind::U16 => "u16",
            BasicKind::U32 => "u32",
            BasicKind::U64 => "u64",
            BasicKind::Uint => "uint",
            BasicKind::F32 => "f32",
            BasicKind::F64 => "f64",
            BasicKind::String => "string",
            BasicKind::Rawptr => "rawptr",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::I8
                | BasicKind::I16
                | BasicKind::I32
                | BasicKind::I64
                | BasicKind::Int
                | BasicKind::U8
                | BasicKind::U16
                | BasicKind::U32
                | BasicKind::U64
                | BasicKind::Uint
                | BasicKind::UntypedInt
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            BasicKind::F32 | BasicKind::F64 | BasicKind::UntypedFloat
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    /// The concrete kind an untyped constant settles on without context.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedFloat => BasicKind::F64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }

    pub fn int_range(self) -> Option<(i128, i128)> {
        Some(match self {
            BasicKind::I8 => (i8::MIN as i128, i8::MAX as i128),
            BasicKind::I16 => (i16::MIN as i128, i16::MAX as i128),
            BasicKind::I32 => (i32::MIN as i128, i32::MAX as i128),
            BasicKind::I64 | BasicKind::Int => (i64::MIN as i128, i64::MAX as i128),
            BasicKind::U8 => (0, u8::MAX as i128),
            BasicKind::U16 => (0, u16::MAX as i128),
            BasicKind::U32 => (0, u32::MAX as i128),
            BasicKind::U64 | BasicKind::Uint => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

impl TypeId {
    pub const INVALID: TypeId = TypeId::basic(BasicKind::Invalid);

    pub const fn basic(kind: BasicKind) -> TypeId {
        TypeId {
            slab: 0,
            index: kind as u32,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Basic(BasicKind),
    /// `base` stays `None` while the declaration is being resolved.
    Named {
        name: Arc<str>,
        base: Option<TypeId>,
        entity: EntityId,
    },
    Pointer(TypeId),
    Array {
        elem: TypeId,
        count: i64,
    },
    Slice(TypeId),
    Struct {
        fields: Vec<EntityId>,
    },
    Union {
        fields: Vec<EntityId>,
    },
    Enum {
        base: TypeId,
        members: Vec<EntityId>,
    },
    Tuple(Vec<TypeId>),
    Proc {
        params: Vec<TypeId>,
        results: Vec<TypeId>,
    },
}

/// Strips named wrappers down to the underlying type.
pub fn base_type(l: &impl Lookup, mut t: TypeId) -> TypeId {
    // Bounded: a named chain cannot be longer than the number of types.
    for _ in 0..1024 {
        match l.ty(t) {
            Type::Named { base: Some(b), .. } => t = *b,
            _ => return t,
        }
    }
    TypeId::INVALID
}

pub fn basic_kind(l: &impl Lookup, t: TypeId) -> Option<BasicKind> {
    match l.ty(base_type(l, t)) {
        Type::Basic(k) => Some(*k),
        _ => None,
    }
}

fn basic_is(l: &impl Lookup, t: TypeId, f: impl Fn(BasicKind) -> bool) -> bool {
    basic_kind(l, t).is_some_and(f)
}

pub fn is_invalid(l: &impl Lookup, t: TypeId) -> bool {
    t == TypeId::INVALID || basic_kind(l, t) == Some(BasicKind::Invalid)
}

pub fn is_untyped(l: &impl Lookup, t: TypeId) -> bool {
    basic_is(l, t, BasicKind::is_untyped)
}

pub fn is_untyped_nil(l: &impl Lookup, t: TypeId) -> bool {
    basic_kind(l, t) == Some(BasicKind::UntypedNil)
}

pub fn is_boolean(l: &impl Lookup, t: TypeId) -> bool {
    basic_is(l, t, BasicKind::is_boolean)
}

pub fn is_integer(l: &impl Lookup, t: TypeId) -> bool {
    basic_is(l, t, BasicKind::is_integer) || is_enum(l, t)
}

pub fn is_numeric(l: &impl Lookup, t: TypeId) -> bool {
    basic_is(l, t, BasicKind::is_numeric)
}

pub fn is_string(l: &impl Lookup, t: TypeId) -> bool {
    basic_is(l, t, BasicKind::is_string)
}

pub fn is_pointer(l: &impl Lookup, t: TypeId) -> bool {
    match l.ty(base_type(l, t)) {
        Type::Pointer(_) => true,
        Type::Basic(k) => *k == BasicKind::Rawptr,
        _ => false,
    }
}

pub fn is_enum(l: &impl Lookup, t: TypeId) -> bool {
    matches!(l.ty(base_type(l, t)), Type::Enum { .. })
}

pub fn is_union(l: &impl Lookup, t: TypeId) -> bool {
    matches!(l.ty(base_type(l, t)), Type::Union { .. })
}

/// Types that accept `nil`.
pub fn is_nillable(l: &impl Lookup, t: TypeId) -> bool {
    matches!(
        l.ty(base_type(l, t)),
        Type::Pointer(_) | Type::Slice(_) | Type::Proc { .. } | Type::Basic(BasicKind::Rawptr)
    )
}

/// Follows one level of pointer indirection.
pub fn deref(l: &impl Lookup, t: TypeId) -> TypeId {
    match l.ty(base_type(l, t)) {
        Type::Pointer(elem) => *elem,
        _ => t,
    }
}

/// Fields of a struct or union, after stripping names.
pub fn record_fields(l: &impl Lookup, t: TypeId) -> Option<&[EntityId]> {
    match l.ty(base_type(l, t)) {
        Type::Struct { fields } | Type::Union { fields } => Some(fields),
        _ => None,
    }
}

pub fn default_type(l: &impl Lookup, t: TypeId) -> TypeId {
    match l.ty(t) {
        Type::Basic(k) if k.is_untyped() => TypeId::basic(k.default_kind()),
        _ => t,
    }
}

/// Finds a field by name, descending into `using` fields breadth-first.
pub fn lookup_field(l: &impl Lookup, t: TypeId, name: &str) -> Option<EntityId> {
    let mut frontier = vec![deref(l, t)];
    let mut seen = Vec::new();
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for ty in frontier {
            let ty = base_type(l, ty);
            if seen.contains(&ty) {
                continue;
            }
            seen.push(ty);
            let Some(fields) = record_fields(l, ty) else {
                continue;
            };
            for &f in fields {
                let field = l.entity(f);
                if field.name() == name {
                    return Some(f);
                }
                if field.as_variable().is_some_and(|v| v.anonymous) {
                    if let Some(ft) = field.ty {
                        next.push(deref(l, ft));
                    }
                }
            }
        }
        frontier = next;
    }
    None
}

pub fn are_identical(l: &impl Lookup, a: TypeId, b: TypeId) -> bool {
    if a == b {
        return true;
    }
    match (l.ty(a), l.ty(b)) {
        (Type::Basic(x), Type::Basic(y)) => x == y,
        (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => {
            are_identical(l, *x, *y)
        }
        (
            Type::Array {
                elem: ex,
                count: cx,
            },
            Type::Array {
                elem: ey,
                count: cy,
            },
        ) => cx == cy && are_identical(l, *ex, *ey),
        (Type::Struct { fields: fx }, Type::Struct { fields: fy })
        | (Type::Union { fields: fx }, Type::Union { fields: fy }) => {
            fx.len() == fy.len()
                && fx.iter().zip(fy).all(|(&x, &y)| {
                    let (x, y) = (l.entity(x), l.entity(y));
                    let anon = |e: &crate::entity::Entity| e.as_variable().is_some_and(|v| v.anonymous);
                    x.name() == y.name()
                        && anon(x) == anon(y)
                        && match (x.ty, y.ty) {
                            (Some(tx), Some(ty)) => are_identical(l, tx, ty),
                            _ => false,
                        }
                })
        }
        (Type::Tuple(x), Type::Tuple(y)) => all_identical(l, x, y),
        (
            Type::Proc {
                params: px,
                results: rx,
            },
            Type::Proc {
                params: py,
                results: ry,
            },
        ) => all_identical(l, px, py) && all_identical(l, rx, ry),
        // Named and enum types are only identical to themselves.
        _ => false,
    }
}

fn all_identical(l: &impl Lookup, xs: &[TypeId], ys: &[TypeId]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(&x, &y)| are_identical(l, x, y))
}

/// Foreign symbols may be rebound with loosely matching signatures: counts
/// must agree and each pair must be identical or both pointers.
pub fn are_signatures_similar_enough(l: &impl Lookup, a: TypeId, b: TypeId) -> bool {
    let (
        Type::Proc {
            params: pa,
            results: ra,
        },
        Type::Proc {
            params: pb,
            results: rb,
        },
    ) = (l.ty(base_type(l, a)), l.ty(base_type(l, b)))
    else {
        return false;
    };
    let similar = |x: TypeId, y: TypeId| {
        (is_pointer(l, x) && is_pointer(l, y)) || are_identical(l, x, y)
    };
    pa.len() == pb.len()
        && ra.len() == rb.len()
        && pa.iter().zip(pb).all(|(&x, &y)| similar(x, y))
        && ra.iter().zip(rb).all(|(&x, &y)| similar(x, y))
}

pub fn type_to_string(l: &impl Lookup, t: TypeId) -> String {
    let mut out = String::new();
    write_type(l, t, &mut out, 0);
    out
}

fn write_type(l: &impl Lookup, t: TypeId, out: &mut String, depth: usize) {
    if depth > 32 {
        out.push_str("...");
        return;
    }
    let list = |out: &mut String, items: &[TypeId]| {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_type(l, item, out, depth + 1);
        }
    };
    let fields = |out: &mut String, fields: &[EntityId]| {
        for (i, &f) in fields.iter().enumerate() {
            if i > 0 {
                out.push_str("; ");
            }
            let e = l.entity(f);
            if e.as_variable().is_some_and(|v| v.anonymous) {
                out.push_str("using ");
            }
            out.push_str(e.name());
            out.push_str(": ");
            match e.ty {
                Some(ft) => write_type(l, ft, out, depth + 1),
                None => out.push_str("?"),
            }
        }
    };

    match l.ty(t) {
        Type::Basic(k) => out.push_str(k.name()),
        Type::Named { name, .. } => out.push_str(name),
        Type::Pointer(elem) => {
            out.push('^');
            write_type(l, *elem, out, depth + 1);
        }
        Type::Array { elem, count } => {
            out.push_str(&format!("[{count}]"));
            write_type(l, *elem, out, depth + 1);
        }
        Type::Slice(elem) => {
            out.push_str("[]");
            write_type(l, *elem, out, depth + 1);
        }
        Type::Struct { fields: fs } => {
            out.push_str("struct {");
            fields(out, fs);
            out.push('}');
        }
        Type::Union { fields: fs } => {
            out.push_str("union {");
            fields(out, fs);
            out.push('}');
        }
        Type::Enum { base, members } => {
            out.push_str("enum ");
            write_type(l, *base, out, depth + 1);
            out.push_str(" {");
            for (i, &m) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(l.entity(m).name());
            }
            out.push('}');
        }
        Type::Tuple(items) => {
            out.push('(');
            list(out, items);
            out.push(')');
        }
        Type::Proc { params, results } => {
            out.push_str("proc(");
            list(out, params);
            out.push(')');
            match results.as_slice() {
                [] => {}
                [one] => {
                    out.push_str(" -> ");
                    write_type(l, *one, out, depth + 1);
                }
                many => {
                    out.push_str(" -> (");
                    list(out, many);
                    out.push(')');
                }
            }
        }
    }
}
