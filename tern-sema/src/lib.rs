#![forbid(unsafe_code)]

mod arena;
mod checker;
mod config;
mod entity;
mod error;
mod info;
mod operand;
mod scope;
mod termination;
mod types;
mod universe;
mod value;

pub use arena::{EntityId, Lookup, ScopeId, TypeId};
pub use checker::Checker;
pub use config::{CheckerConfig, ConfigError};
pub use entity::{Entity, EntityKind, ImplicitId, ImportName, Procedure, Variable};
pub use error::{CheckResult, ErrorCollector, ErrorKind, SemanticError, TooManyErrors};
pub use info::CheckerInfo;
pub use operand::{AddressingMode, Operand, TypeAndValue};
pub use scope::{Scope, ScopeFlags};
pub use termination::{has_break, has_break_list, is_terminating, is_terminating_list};
pub use types::{BasicKind, Type, are_identical, base_type};
pub use universe::{BUILTIN_PROCS, BuiltinId, BuiltinKind, BuiltinProc, Universe};
pub use value::{ConstValue, ValueError};
