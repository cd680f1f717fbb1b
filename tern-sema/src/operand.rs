use tern_ast::NodeId;

use crate::arena::TypeId;
use crate::universe::BuiltinId;
use crate::value::ConstValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    Invalid,
    NoValue,
    Value,
    Variable,
    Constant,
    Type,
    Builtin,
}

/// Result of evaluating one expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Operand {
    pub mode: AddressingMode,
    pub ty: TypeId,
    pub value: Option<ConstValue>,
    pub expr: Option<NodeId>,
    pub builtin: Option<BuiltinId>,
}

impl Operand {
    pub fn invalid(expr: Option<NodeId>) -> Self {
        Self {
            mode: AddressingMode::Invalid,
            ty: TypeId::INVALID,
            value: None,
            expr,
            builtin: None,
        }
    }

    pub fn new(mode: AddressingMode, ty: TypeId, expr: NodeId) -> Self {
        Self {
            mode,
            ty,
            value: None,
            expr: Some(expr),
            builtin: None,
        }
    }

    pub fn constant(ty: TypeId, value: ConstValue, expr: NodeId) -> Self {
        Self {
            value: Some(value),
            ..Self::new(AddressingMode::Constant, ty, expr)
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == AddressingMode::Invalid
    }

    pub fn invalidate(&mut self) {
        self.mode = AddressingMode::Invalid;
        self.ty = TypeId::INVALID;
        self.value = None;
    }

    pub fn type_and_value(&self) -> TypeAndValue {
        TypeAndValue {
            mode: self.mode,
            ty: self.ty,
            value: self.value.clone(),
        }
    }
}

/// What the checker remembers about an expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeAndValue {
    pub mode: AddressingMode,
    pub ty: TypeId,
    pub value: Option<ConstValue>,
}
