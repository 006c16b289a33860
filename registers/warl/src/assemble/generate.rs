// Licensed under the Apache-2.0 license

//! Procedure construction for one lowered register.

use super::AssemblyContext;
use crate::error::{WarlError, WarlResult};
use crate::field::FieldProcedure;
use crate::procedure::{Expr, Procedure, RegisterProcedures};
use crate::types::{
    FieldKind, FieldSpec, RegisterShape, RegisterSpec, ShadowMode, ShadowSpec, WarlRule,
};
use crate::util::identifier;

/// Name of a field legalizer. The `legalize_field_` prefix keeps field
/// legalizers apart from register procedures named `legalize_<register>`.
pub(crate) fn field_procedure_name(register: &str, field: &str) -> String {
    format!("legalize_field_{}_{}", identifier(register), identifier(field))
}

impl AssemblyContext<'_> {
    /// Builds the `legalize` and `get` procedures of `spec` and registers its
    /// field legalizers.
    pub(super) fn generate(&mut self, spec: &RegisterSpec) -> WarlResult<RegisterProcedures> {
        let name = identifier(&spec.name);
        let mut legalize = Procedure::new(format!("legalize_{name}"));
        let mut get = Procedure::new(format!("get_{name}"));
        get.assign(Expr::Current);
        let mut synthesized = false;

        match &spec.shape {
            RegisterShape::Fields(_) => legalize.assign(Expr::Current),
            RegisterShape::Scalar(_) => legalize.assign(Expr::Const(0)),
        }
        for field in spec.fields() {
            let value = self.field_value(spec, field, &mut legalize)?;
            legalize.assign(Expr::Acc.insert(field.msb, field.lsb, value));
            if let FieldKind::Shadow(shadow) = &field.kind {
                get.assign(Expr::Acc.insert(
                    field.msb,
                    field.lsb,
                    self.shadow_source(spec, field, shadow)?,
                ));
                synthesized = true;
            }
        }

        self.claim_procedure_name(spec, &legalize.name)?;
        if synthesized {
            self.claim_procedure_name(spec, &get.name)?;
        }
        Ok(RegisterProcedures {
            name: spec.name.clone(),
            address: spec.address,
            width: spec.width,
            legalize,
            get: synthesized.then_some(get),
        })
    }

    /// New value of `field` after a write. Shadow targets are updated by a
    /// store emitted into `procedure` ahead of the value.
    fn field_value(
        &mut self,
        spec: &RegisterSpec,
        field: &FieldSpec,
        procedure: &mut Procedure,
    ) -> WarlResult<Expr> {
        let old = Expr::Current.slice(field.msb, field.lsb);
        let new = Expr::Written.slice(field.msb, field.lsb);
        Ok(match &field.kind {
            FieldKind::Warl(rule) => Expr::LegalizeField {
                procedure: self.add_field_procedure(spec, field, rule)?,
                current: Box::new(old),
                written: Box::new(new),
            },
            FieldKind::ReadOnlyConstant(constant) => Expr::Const(*constant),
            FieldKind::ReadOnlyVariable => old,
            FieldKind::Plain => new,
            FieldKind::Shadow(shadow) => match shadow.mode {
                ShadowMode::ReadOnly => old,
                ShadowMode::ReadWrite => {
                    let (target, value) = self.shadow_store(spec, field, shadow)?;
                    procedure.store(&target, value);
                    self.shadow_source(spec, field, shadow)?
                }
            },
        })
    }

    fn add_field_procedure(
        &mut self,
        spec: &RegisterSpec,
        field: &FieldSpec,
        rule: &WarlRule,
    ) -> WarlResult<String> {
        let name = field_procedure_name(&spec.name, &field.name);
        self.claim_procedure_name(spec, &name)?;
        log::trace!(
            "{}.{}: {} legal clauses, {} illegal-write rules{}",
            spec.name,
            field.name,
            rule.legal.len(),
            rule.illegal.len(),
            if rule.has_dependencies() {
                " (dependent)"
            } else {
                ""
            }
        );
        self.fields.push(FieldProcedure {
            name: name.clone(),
            register: spec.name.clone(),
            field: field.name.clone(),
            width: field.width(),
            rule: rule.clone(),
        });
        Ok(name)
    }

    /// Rejects `name` if an earlier field legalizer or register procedure
    /// already renders under it.
    fn claim_procedure_name(&self, spec: &RegisterSpec, name: &str) -> WarlResult<()> {
        let fields = self.fields.iter().map(|f| &f.name);
        let registers = self
            .registers
            .iter()
            .flat_map(|r| std::iter::once(&r.legalize).chain(&r.get))
            .map(|p| &p.name);
        if fields.chain(registers).any(|n| n == name) {
            return Err(WarlError::InvalidDefinition {
                register: spec.name.clone(),
                message: format!("procedure name '{name}' is already in use"),
            });
        }
        Ok(())
    }

    /// Resolves a shadow target among the registers assembled so far.
    fn shadow_target(
        &self,
        spec: &RegisterSpec,
        field: &FieldSpec,
        shadow: &ShadowSpec,
    ) -> WarlResult<(&RegisterSpec, Option<&FieldSpec>)> {
        let target = self
            .assembled(&shadow.target.register)
            .ok_or_else(|| WarlError::ForwardShadowReference {
                register: spec.name.clone(),
                field: field.name.clone(),
                target: shadow.target.to_string(),
            })?;
        match &shadow.target.field {
            None => Ok((target, None)),
            Some(name) => target
                .field(name)
                .map(|f| (target, Some(f)))
                .ok_or_else(|| WarlError::InvalidDefinition {
                    register: spec.name.clone(),
                    message: format!("shadow target '{}' does not exist", shadow.target),
                }),
        }
    }

    /// Present value of a shadow field, read from its target.
    fn shadow_source(
        &self,
        spec: &RegisterSpec,
        field: &FieldSpec,
        shadow: &ShadowSpec,
    ) -> WarlResult<Expr> {
        let (target, target_field) = self.shadow_target(spec, field, shadow)?;
        let register = Expr::register(&target.name);
        Ok(match target_field {
            Some(f) => register.slice(f.msb, f.lsb),
            None => register.slice(field.width() - 1, 0),
        })
    }

    /// Store propagating a write of `field` into its target, using the
    /// target's own write policy.
    fn shadow_store(
        &self,
        spec: &RegisterSpec,
        field: &FieldSpec,
        shadow: &ShadowSpec,
    ) -> WarlResult<(String, Expr)> {
        let (target, target_field) = self.shadow_target(spec, field, shadow)?;
        let new = Expr::Written.slice(field.msb, field.lsb);
        let Some(tf) = target_field else {
            return Ok((
                target.name.clone(),
                Expr::LegalizeRegister {
                    register: target.name.clone(),
                    current: Box::new(Expr::register(&target.name)),
                    written: Box::new(new),
                },
            ));
        };
        let old = Expr::register(&target.name).slice(tf.msb, tf.lsb);
        let value = match &tf.kind {
            FieldKind::Warl(_) => Expr::LegalizeField {
                procedure: field_procedure_name(&target.name, &tf.name),
                current: Box::new(old),
                written: Box::new(new),
            },
            FieldKind::ReadOnlyConstant(constant) => Expr::Const(*constant),
            FieldKind::ReadOnlyVariable => old,
            FieldKind::Plain | FieldKind::Shadow(_) => new,
        };
        Ok((
            target.name.clone(),
            Expr::register(&target.name).insert(tf.msb, tf.lsb, value),
        ))
    }
}
