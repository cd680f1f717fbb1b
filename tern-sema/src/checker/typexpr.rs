use std::sync::Arc;

use indexmap::IndexMap;
use tern_ast::{EnumField, Expr, ExprKind, Field, ProcTypeExpr};

use crate::arena::{EntityId, Lookup, ScopeId, TypeId};
use crate::entity::{Entity, EntityKind, Variable};
use crate::error::{CheckResult, ErrorKind};
use crate::operand::{AddressingMode, TypeAndValue};
use crate::types::{BasicKind, Type, basic_kind, is_integer, is_invalid, record_fields};
use crate::value::ConstValue;

use super::unit::Unit;

impl<'s, 'a> Unit<'s, 'a> {
    pub fn check_type(&mut self, expr: &Expr) -> CheckResult<TypeId> {
        self.check_type_named(expr, None)
    }

    /// Resolves a type expression. `named` is the type being declared, if
    /// any; enum members take it as their type.
    pub fn check_type_named(&mut self, expr: &Expr, named: Option<TypeId>) -> CheckResult<TypeId> {
        let ty = match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Selector { .. } => {
                let operand = self.check_expr(expr)?;
                match operand.mode {
                    AddressingMode::Type => operand.ty,
                    AddressingMode::Invalid => TypeId::INVALID,
                    _ => {
                        self.error(
                            ErrorKind::InvalidOperation,
                            &expr.token,
                            format!("`{expr}` is not a type"),
                        )?;
                        TypeId::INVALID
                    }
                }
            }
            ExprKind::Paren(inner) => self.check_type_named(inner, named)?,
            ExprKind::Pointer(elem) => {
                let elem = self.check_indirect_type(elem)?;
                self.store.new_type(Type::Pointer(elem))
            }
            ExprKind::Array { count: None, elem } => {
                let elem = self.check_indirect_type(elem)?;
                self.store.new_type(Type::Slice(elem))
            }
            ExprKind::Array {
                count: Some(count),
                elem,
            } => {
                let count = self.check_array_count(count)?;
                let elem = self.check_type(elem)?;
                self.store.new_type(Type::Array { elem, count })
            }
            ExprKind::Struct(fields) => self.check_record_type(fields, false)?,
            ExprKind::Union(fields) => self.check_record_type(fields, true)?,
            ExprKind::Enum { base, fields } => {
                self.check_enum_type(base.as_deref(), fields, named)?
            }
            ExprKind::Proc(pt) => self.check_proc_signature(pt, None)?,
            _ => {
                // Still resolve the names inside for the side tables.
                self.check_expr(expr)?;
                self.error(
                    ErrorKind::InvalidOperation,
                    &expr.token,
                    format!("`{expr}` is not a type"),
                )?;
                TypeId::INVALID
            }
        };
        self.info.types.insert(
            expr.id,
            TypeAndValue {
                mode: AddressingMode::Type,
                ty,
                value: None,
            },
        );
        Ok(ty)
    }

    /// Behind a pointer or slice a named type may refer to itself.
    fn check_indirect_type(&mut self, elem: &Expr) -> CheckResult<TypeId> {
        let mut c = self.enter();
        c.ctx.indirection += 1;
        c.check_type(elem)
    }

    fn check_array_count(&mut self, count: &Expr) -> CheckResult<i64> {
        let operand = self.check_expr(count)?;
        if operand.is_invalid() {
            return Ok(0);
        }
        let value = match (&operand.mode, &operand.value) {
            (AddressingMode::Constant, Some(ConstValue::Int(v))) => i64::try_from(*v).ok(),
            _ => None,
        };
        match value {
            Some(v) if v >= 0 => Ok(v),
            _ => {
                self.error(
                    ErrorKind::InvalidOperation,
                    &count.token,
                    format!("Array count `{count}` must be a non-negative constant integer"),
                )?;
                Ok(0)
            }
        }
    }

    fn check_record_type(&mut self, fields: &[Field], is_union: bool) -> CheckResult<TypeId> {
        let what = if is_union { "union" } else { "struct" };
        let mut entities = Vec::new();
        let mut seen: IndexMap<Arc<str>, EntityId> = IndexMap::new();

        for field in fields {
            let ty = self.check_type(&field.ty)?;
            for name in &field.names {
                let variable = Variable {
                    field: true,
                    anonymous: field.is_using,
                    field_index: entities.len(),
                    ..Variable::default()
                };
                let id = self.store.new_entity(
                    Entity::new(
                        EntityKind::Variable(variable),
                        name.token.clone(),
                        Some(name.id),
                    )
                    .with_type(ty),
                );
                self.info.definitions.insert(name.id, id);
                entities.push(id);

                if !name.is_discard() {
                    if let Some(&prev) = seen.get(name.name()) {
                        let pos = self.store.entity(prev).token.pos.clone();
                        self.error(
                            ErrorKind::Redeclaration,
                            &name.token,
                            format!(
                                "Field `{}` is already declared in this {what}\n\tat {pos}",
                                name.name()
                            ),
                        )?;
                        continue;
                    }
                    seen.insert(name.token.text.clone(), id);
                }
                if field.is_using {
                    self.embed_field(id, ty, &mut seen)?;
                }
            }
        }

        let record = if is_union {
            Type::Union { fields: entities }
        } else {
            Type::Struct { fields: entities }
        };
        Ok(self.store.new_type(record))
    }

    /// Makes the fields of a `using` field's type visible in the enclosing
    /// record's namespace. One collision abandons the whole embedding.
    fn embed_field(
        &mut self,
        field: EntityId,
        ty: TypeId,
        seen: &mut IndexMap<Arc<str>, EntityId>,
    ) -> CheckResult<()> {
        let token = self.store.entity(field).token.clone();
        let target = crate::types::deref(&self.store, ty);
        if is_invalid(&self.store, target) {
            return Ok(());
        }
        let Some(inner) = record_fields(&self.store, target).map(<[EntityId]>::to_vec) else {
            return self.error(
                ErrorKind::IllegalUsing,
                &token,
                format!(
                    "`using` on a field requires a struct or union type, got `{}`",
                    self.type_name(ty)
                ),
            );
        };
        for &f in &inner {
            let name = self.store.entity(f).name();
            if name == "_" {
                continue;
            }
            if let Some(&prev) = seen.get(name) {
                let prev = self.store.entity(prev);
                return self.error(
                    ErrorKind::IllegalUsing,
                    &token,
                    format!(
                        "Namespace collision while embedding `{}` of: {}\n\tat {}",
                        token.text, name, prev.token.pos
                    ),
                );
            }
        }
        for f in inner {
            let name = self.store.entity(f).token.text.clone();
            if &*name != "_" {
                seen.insert(name, f);
            }
        }
        Ok(())
    }

    fn check_enum_type(
        &mut self,
        base: Option<&Expr>,
        fields: &[EnumField],
        named: Option<TypeId>,
    ) -> CheckResult<TypeId> {
        let int = TypeId::basic(BasicKind::Int);
        let base_ty = match base {
            Some(b) => {
                let t = self.check_type(b)?;
                if is_integer(&self.store, t) || t == TypeId::INVALID {
                    t
                } else {
                    self.error(
                        ErrorKind::TypeMismatch,
                        &b.token,
                        format!("Enum base type must be an integer, got `{}`", self.type_name(t)),
                    )?;
                    int
                }
            }
            None => int,
        };
        let kind = basic_kind(&self.store, base_ty).unwrap_or(BasicKind::Int);

        let enum_ty = self.store.new_type(Type::Enum {
            base: base_ty,
            members: Vec::new(),
        });
        let member_ty = named.unwrap_or(enum_ty);

        let mut members: Vec<EntityId> = Vec::with_capacity(fields.len());
        let mut next: i128 = 0;
        for field in fields {
            let mut value = next;
            if let Some(expr) = &field.value {
                let operand = self.check_expr(expr)?;
                match (&operand.mode, &operand.value) {
                    (AddressingMode::Constant, Some(ConstValue::Int(v))) => value = *v,
                    _ if operand.is_invalid() => {}
                    _ => self.error(
                        ErrorKind::InvalidOperation,
                        &expr.token,
                        format!("Enum member `{}` must have a constant integer value", field.name.name()),
                    )?,
                }
            }
            if ConstValue::Int(value).represent_as(kind).is_none() {
                self.error(
                    ErrorKind::InvalidOperation,
                    &field.name.token,
                    format!(
                        "Enum member `{}` value {value} does not fit in `{}`",
                        field.name.name(),
                        kind.name()
                    ),
                )?;
            }
            next = value.checked_add(1).unwrap_or(value);

            if let Some(&prev) = members
                .iter()
                .find(|&&m| self.store.entity(m).name() == field.name.name())
            {
                let pos = self.store.entity(prev).token.pos.clone();
                self.error(
                    ErrorKind::Redeclaration,
                    &field.name.token,
                    format!(
                        "Enum member `{}` is already declared\n\tat {pos}",
                        field.name.name()
                    ),
                )?;
                continue;
            }

            let id = self.store.new_entity(
                Entity::new(
                    EntityKind::Constant {
                        value: Some(ConstValue::Int(value)),
                    },
                    field.name.token.clone(),
                    Some(field.name.id),
                )
                .with_type(member_ty),
            );
            self.info.definitions.insert(field.name.id, id);
            members.push(id);
        }

        if let Some(Type::Enum { members: slot, .. }) = self.store.ty_mut(enum_ty) {
            *slot = members;
        }
        Ok(enum_ty)
    }

    /// Builds a procedure type. With `scope` set, each named parameter is
    /// declared there as a variable.
    pub fn check_proc_signature(
        &mut self,
        pt: &ProcTypeExpr,
        scope: Option<ScopeId>,
    ) -> CheckResult<TypeId> {
        let mut params = Vec::new();
        for field in &pt.params {
            let ty = self.check_type(&field.ty)?;
            for name in &field.names {
                params.push(ty);
                let Some(scope) = scope else {
                    continue;
                };
                let variable = Variable {
                    param: true,
                    anonymous: field.is_using,
                    ..Variable::default()
                };
                let id = self.store.new_entity(
                    Entity::new(
                        EntityKind::Variable(variable),
                        name.token.clone(),
                        Some(name.id),
                    )
                    .with_type(ty),
                );
                self.add_entity(scope, Some(name), id)?;
            }
        }
        let mut results = Vec::with_capacity(pt.results.len());
        for result in &pt.results {
            results.push(self.check_type(result)?);
        }
        let ty = self.store.new_type(Type::Proc { params, results });
        self.info.types.insert(
            pt.id,
            TypeAndValue {
                mode: AddressingMode::Type,
                ty,
                value: None,
            },
        );
        Ok(ty)
    }
}
