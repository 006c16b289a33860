// Licensed under the Apache-2.0 license

//! Register assembly.
//!
//! Registers are assembled one at a time in definition order. An
//! [`AssemblyContext`] holds everything assembled so far: lowered register
//! specs (the only registers a shadow field may target), field legalizers,
//! register procedures, the reset procedure and the dispatch tables. The
//! first configuration error aborts the run.

mod generate;
mod parse;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

use crate::config::CompileConfig;
use crate::definition::{Definition, RegisterDef};
use crate::error::{WarlError, WarlResult};
use crate::field::FieldProcedure;
use crate::procedure::{
    CompiledRegisters, DispatchTables, Expr, Procedure, RegisterProcedures,
};
use crate::types::{FieldKind, RegisterSpec, Xlen};
use crate::util::{insert, low_bits, slice};
use anyhow::Context;
use std::path::Path;

/// Accumulated state of one compilation run.
pub struct AssemblyContext<'d> {
    definition: &'d Definition,
    config: &'d CompileConfig,
    specs: Vec<RegisterSpec>,
    fields: Vec<FieldProcedure>,
    registers: Vec<RegisterProcedures>,
    reset: Procedure,
    tables: DispatchTables,
}

impl<'d> AssemblyContext<'d> {
    pub fn new(definition: &'d Definition, config: &'d CompileConfig) -> Self {
        Self {
            definition,
            config,
            specs: Vec::new(),
            fields: Vec::new(),
            registers: Vec::new(),
            reset: Procedure::new("reset_regs".to_string()),
            tables: DispatchTables::default(),
        }
    }

    /// A register assembled earlier in this run.
    pub fn assembled(&self, name: &str) -> Option<&RegisterSpec> {
        self.specs.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Defines `register` and, unless filtered, assembles its procedures.
    pub fn add_register(&mut self, register: &RegisterDef) -> WarlResult<()> {
        let xlen = self.config.xlen;
        let Some(layout) = register.layout(xlen) else {
            log::debug!("{}: not accessible in {xlen}", register.name);
            return Ok(());
        };
        self.define(register)?;
        if self.config.filter.should_skip(&register.name) {
            log::debug!("{}: defined without legalization", register.name);
            return Ok(());
        }
        let spec = parse::lower_register(self.definition, register, layout, xlen)?;
        self.assemble(spec)
    }

    fn define(&mut self, register: &RegisterDef) -> WarlResult<()> {
        if let Some(first) = self.tables.names.get(&register.address) {
            return Err(WarlError::DuplicateAddress {
                address: register.address,
                first: first.clone(),
                second: register.name.clone(),
            });
        }
        if self
            .tables
            .addresses
            .keys()
            .any(|name| name.eq_ignore_ascii_case(&register.name))
        {
            return Err(WarlError::InvalidDefinition {
                register: register.name.clone(),
                message: "register is defined twice".to_string(),
            });
        }
        self.tables
            .defined
            .insert(register.address, register.privilege);
        self.tables
            .names
            .insert(register.address, register.name.clone());
        self.tables
            .addresses
            .insert(register.name.clone(), register.address);
        Ok(())
    }

    fn assemble(&mut self, spec: RegisterSpec) -> WarlResult<()> {
        let procedures = self.generate(&spec)?;

        let mask = low_bits(spec.width);
        if spec.reset_value & !mask != 0 {
            log::warn!(
                "{}: reset value {:#x} does not fit in {} bits",
                spec.name,
                spec.reset_value,
                spec.width
            );
        }
        // Read-only constants read back as their fixed value from reset on.
        let mut reset_value = spec.reset_value & mask;
        for field in spec.fields() {
            if let FieldKind::ReadOnlyConstant(constant) = field.kind {
                let bits = slice(reset_value, field.msb, field.lsb);
                if bits != constant {
                    log::warn!(
                        "{}.{}: reset value {bits:#x} differs from read-only constant {constant:#x}",
                        spec.name,
                        field.name
                    );
                    reset_value = insert(reset_value, field.msb, field.lsb, constant);
                }
            }
        }
        self.reset.store(&spec.name, Expr::Const(reset_value));

        self.tables.read.insert(spec.address, spec.name.clone());
        self.tables.write.insert(spec.address, spec.name.clone());
        log::debug!(
            "{}: assembled {} fields at {:#05x}{}",
            spec.name,
            spec.fields().len(),
            spec.address,
            if procedures.get.is_some() {
                " with read-side synthesis"
            } else {
                ""
            }
        );
        self.registers.push(procedures);
        self.specs.push(spec);
        Ok(())
    }

    pub fn finish(self) -> CompiledRegisters {
        CompiledRegisters {
            xlen: self.config.xlen,
            fields: self.fields,
            registers: self.registers,
            reset: self.reset,
            tables: self.tables,
        }
    }
}

/// Compiles every register of `definition` for the profile in `config`.
pub fn compile(definition: &Definition, config: &CompileConfig) -> WarlResult<CompiledRegisters> {
    log::info!(
        "Compiling {} register definitions for {}",
        definition.registers.len(),
        config.xlen
    );
    let mut context = AssemblyContext::new(definition, config);
    for register in &definition.registers {
        context.add_register(register)?;
    }
    let compiled = context.finish();
    log::info!(
        "Assembled {} registers with {} field legalizers",
        compiled.registers.len(),
        compiled.fields.len()
    );
    Ok(compiled)
}

/// Loads a definition file and renders its procedures for `xlen` with the
/// default legalize filter.
pub fn generate_warl_from_file(file: &Path, xlen: Xlen) -> anyhow::Result<String> {
    generate_warl_from_file_with_config(file, &CompileConfig::new(xlen))
}

/// Loads a definition file and renders its procedures under `config`.
pub fn generate_warl_from_file_with_config(
    file: &Path,
    config: &CompileConfig,
) -> anyhow::Result<String> {
    let definition = Definition::load(file)?;
    let compiled = compile(&definition, config)
        .with_context(|| format!("failed to compile {}", file.display()))?;
    Ok(compiled.to_string())
}
