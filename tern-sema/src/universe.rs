use std::sync::Arc;

use tern_ast::{Pos, Token, span};

use crate::arena::{EntityId, Lookup, ScopeId, Slab, Store, TypeId};
use crate::entity::{Entity, EntityKind, ImplicitId, Variable};
use crate::scope::ScopeFlags;
use crate::types::{BasicKind, Type};
use crate::value::ConstValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinId {
    Len,
    SizeOf,
    AlignOf,
    New,
    Assert,
    Panic,
    Print,
}

/// Whether a builtin call yields a value or only stands as a statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    Expr,
    Stmt,
}

#[derive(Clone, Copy, Debug)]
pub struct BuiltinProc {
    pub id: BuiltinId,
    pub name: &'static str,
    pub arity: usize,
    pub variadic: bool,
    pub kind: BuiltinKind,
}

pub const BUILTIN_PROCS: [BuiltinProc; 7] = [
    BuiltinProc {
        id: BuiltinId::Len,
        name: "len",
        arity: 1,
        variadic: false,
        kind: BuiltinKind::Expr,
    },
    BuiltinProc {
        id: BuiltinId::SizeOf,
        name: "size_of",
        arity: 1,
        variadic: false,
        kind: BuiltinKind::Expr,
    },
    BuiltinProc {
        id: BuiltinId::AlignOf,
        name: "align_of",
        arity: 1,
        variadic: false,
        kind: BuiltinKind::Expr,
    },
    BuiltinProc {
        id: BuiltinId::New,
        name: "new",
        arity: 1,
        variadic: false,
        kind: BuiltinKind::Expr,
    },
    BuiltinProc {
        id: BuiltinId::Assert,
        name: "assert",
        arity: 1,
        variadic: false,
        kind: BuiltinKind::Stmt,
    },
    BuiltinProc {
        id: BuiltinId::Panic,
        name: "panic",
        arity: 1,
        variadic: false,
        kind: BuiltinKind::Stmt,
    },
    BuiltinProc {
        id: BuiltinId::Print,
        name: "print",
        arity: 0,
        variadic: true,
        kind: BuiltinKind::Stmt,
    },
];

impl BuiltinId {
    pub fn proc(self) -> &'static BuiltinProc {
        let index = match self {
            BuiltinId::Len => 0,
            BuiltinId::SizeOf => 1,
            BuiltinId::AlignOf => 2,
            BuiltinId::New => 3,
            BuiltinId::Assert => 4,
            BuiltinId::Panic => 5,
            BuiltinId::Print => 6,
        };
        &BUILTIN_PROCS[index]
    }
}

/// The built-in environment. Owns nothing itself: everything lives in
/// slab 0, and this records where.
#[derive(Debug)]
pub struct Universe {
    pub scope: ScopeId,
    pub context_type: TypeId,
    pub context: EntityId,
    pub nil: EntityId,
}

fn universe_token(name: &str) -> Token {
    Token::new(
        name,
        Pos {
            file: Arc::from("<universe>"),
            line: 0,
            column: 0,
        },
        span(0, 0),
    )
}

impl Universe {
    /// Populates an empty slab 0: basic types at their reserved indices,
    /// then the global scope and its entities.
    pub fn build(slab: &mut Slab) -> Self {
        debug_assert_eq!(slab.id(), 0);
        let mut store = Store::detached(slab);

        for kind in BasicKind::ALL {
            let id = store.new_type(Type::Basic(kind));
            debug_assert_eq!(id, TypeId::basic(kind));
        }

        let scope = store.open_scope(None, ScopeFlags::GLOBAL);
        fn add(store: &mut Store<'_>, scope: ScopeId, entity: Entity) -> EntityId {
            let id = store.new_entity(entity);
            store.insert(scope, id);
            id
        }

        for kind in BasicKind::ALL {
            if kind == BasicKind::Invalid || kind.is_untyped() {
                continue;
            }
            let e = Entity::new(EntityKind::TypeName, universe_token(kind.name()), None)
                .with_type(TypeId::basic(kind));
            add(&mut store, scope, e);
        }

        for (name, value) in [("true", true), ("false", false)] {
            let e = Entity::new(
                EntityKind::Constant {
                    value: Some(ConstValue::Bool(value)),
                },
                universe_token(name),
                None,
            )
            .with_type(TypeId::basic(BasicKind::UntypedBool));
            add(&mut store, scope, e);
        }

        let nil = add(
            &mut store,
            scope,
            Entity::new(EntityKind::Nil, universe_token("nil"), None)
                .with_type(TypeId::basic(BasicKind::UntypedNil)),
        );

        for builtin in BUILTIN_PROCS {
            let e = Entity::new(EntityKind::Builtin(builtin.id), universe_token(builtin.name), None)
                .with_type(TypeId::INVALID);
            add(&mut store, scope, e);
        }

        // Context :: struct { user_index: int, user_data: rawptr }
        let type_entity = store.new_entity(Entity::new(
            EntityKind::TypeName,
            universe_token("Context"),
            None,
        ));
        let mut fields = Vec::new();
        for (i, (name, kind)) in [("user_index", BasicKind::Int), ("user_data", BasicKind::Rawptr)]
            .into_iter()
            .enumerate()
        {
            let field = Entity::new(
                EntityKind::Variable(Variable {
                    field: true,
                    field_index: i,
                    ..Variable::default()
                }),
                universe_token(name),
                None,
            )
            .with_type(TypeId::basic(kind));
            fields.push(store.new_entity(field));
        }
        let record = store.new_type(Type::Struct { fields });
        let context_type = store.new_type(Type::Named {
            name: Arc::from("Context"),
            base: Some(record),
            entity: type_entity,
        });
        store.set_entity_type(type_entity, context_type);
        store.insert(scope, type_entity);

        let context = add(
            &mut store,
            scope,
            Entity::new(
                EntityKind::ImplicitValue {
                    id: ImplicitId::Context,
                    backing: None,
                },
                universe_token("context"),
                None,
            )
            .with_type(context_type),
        );

        tracing::debug!(entities = store.scope(scope).len(), "universe built");
        Self {
            scope,
            context_type,
            context,
            nil,
        }
    }
}
