use std::ops::{BitOr, BitOrAssign, Deref, DerefMut};
use std::sync::Arc;

use crate::arena::{EntityId, ScopeId, TypeId};

use super::Unit;

/// Which control-flow statements are legal at the current position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StmtFlags(u8);

impl StmtFlags {
    pub const NONE: Self = Self(0);
    pub const BREAK: Self = Self(1);
    pub const CONTINUE: Self = Self(1 << 1);
    pub const FALLTHROUGH: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for StmtFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StmtFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Label {
    pub name: Arc<str>,
    pub is_loop: bool,
}

/// Where the checker currently stands.
#[derive(Clone, Debug)]
pub(crate) struct CheckerContext {
    pub scope: ScopeId,
    /// Entity whose declaration or body is being checked.
    pub decl: Option<EntityId>,
    /// Signature of the enclosing procedure body.
    pub proc_sig: Option<TypeId>,
    pub in_defer: bool,
    pub labels: Vec<Label>,
    /// Named types under resolution, with the pointer depth at which each
    /// was entered.
    pub type_path: Vec<(EntityId, u32)>,
    pub indirection: u32,
    /// The next identifier resolved is an assignment target, not a use.
    pub assign_target: bool,
}

impl CheckerContext {
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            decl: None,
            proc_sig: None,
            in_defer: false,
            labels: Vec::new(),
            type_path: Vec::new(),
            indirection: 0,
            assign_target: false,
        }
    }
}

/// Restores the unit's context when dropped, on every exit path.
pub(crate) struct ContextGuard<'u, 's, 'a> {
    unit: &'u mut Unit<'s, 'a>,
    saved: Option<CheckerContext>,
}

impl<'s, 'a> Unit<'s, 'a> {
    pub(crate) fn enter(&mut self) -> ContextGuard<'_, 's, 'a> {
        let saved = self.ctx.clone();
        ContextGuard {
            unit: self,
            saved: Some(saved),
        }
    }
}

impl<'s, 'a> Deref for ContextGuard<'_, 's, 'a> {
    type Target = Unit<'s, 'a>;

    fn deref(&self) -> &Self::Target {
        self.unit
    }
}

impl DerefMut for ContextGuard<'_, '_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.unit
    }
}

impl Drop for ContextGuard<'_, '_, '_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.unit.ctx = saved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_clear() {
        let flags = StmtFlags::BREAK | StmtFlags::FALLTHROUGH;
        assert!(flags.contains(StmtFlags::BREAK));
        assert!(!flags.contains(StmtFlags::CONTINUE));
        assert!(!flags.without(StmtFlags::FALLTHROUGH).contains(StmtFlags::FALLTHROUGH));
        assert!(StmtFlags::NONE.contains(StmtFlags::NONE));
    }
}
