// Licensed under the Apache-2.0 license

//! Execution of compiled procedures.

use crate::procedure::{CompiledRegisters, Expr, Procedure, Stmt};
use crate::types::{PrivilegeLevel, RegisterState};
use crate::util::{insert, low_bits, slice};
use std::collections::BTreeMap;

/// Result of one `legalize` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// New value of the legalized register.
    pub value: u64,
    /// Values stored to other registers, in program order.
    pub stores: Vec<(String, u64)>,
}

/// Caller state overlaid with the stores of the running procedure.
struct Frame<'a> {
    base: &'a dyn RegisterState,
    stores: Vec<(String, u64)>,
}

impl RegisterState for Frame<'_> {
    fn register_value(&self, name: &str) -> u64 {
        self.stores
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map_or_else(|| self.base.register_value(name), |(_, v)| *v)
    }
}

impl CompiledRegisters {
    /// Runs `register`'s legalize procedure without touching `state`.
    ///
    /// Returns `None` for registers that were not assembled.
    pub fn legalize(
        &self,
        register: &str,
        state: &dyn RegisterState,
        current: u64,
        written: u64,
    ) -> Option<Outcome> {
        let procedures = self.register(register)?;
        Some(self.run(
            &procedures.legalize,
            procedures.width,
            state,
            current,
            written,
        ))
    }

    /// Present value of `register` given its stored value `current`.
    pub fn get(&self, register: &str, state: &dyn RegisterState, current: u64) -> Option<u64> {
        let procedures = self.register(register)?;
        Some(match &procedures.get {
            Some(get) => self.run(get, procedures.width, state, current, 0).value,
            None => current,
        })
    }

    pub(crate) fn run(
        &self,
        procedure: &Procedure,
        width: u32,
        state: &dyn RegisterState,
        current: u64,
        written: u64,
    ) -> Outcome {
        let mut frame = Frame {
            base: state,
            stores: Vec::new(),
        };
        let mut acc = 0;
        for stmt in &procedure.body {
            match stmt {
                Stmt::Assign(expr) => acc = self.eval(expr, &mut frame, current, written, acc),
                Stmt::Store { register, value } => {
                    let value = self.eval(value, &mut frame, current, written, acc);
                    let value = self
                        .register(register)
                        .map_or(value, |r| value & low_bits(r.width));
                    frame.stores.push((register.clone(), value));
                }
            }
        }
        Outcome {
            value: acc & low_bits(width),
            stores: frame.stores,
        }
    }

    fn eval(&self, expr: &Expr, frame: &mut Frame, current: u64, written: u64, acc: u64) -> u64 {
        match expr {
            Expr::Current => current,
            Expr::Written => written,
            Expr::Acc => acc,
            Expr::Const(value) => *value,
            Expr::Register(name) => frame.register_value(name),
            Expr::Slice { value, msb, lsb } => {
                slice(self.eval(value, frame, current, written, acc), *msb, *lsb)
            }
            Expr::Insert {
                base,
                msb,
                lsb,
                value,
            } => {
                let base = self.eval(base, frame, current, written, acc);
                let value = self.eval(value, frame, current, written, acc);
                insert(base, *msb, *lsb, value)
            }
            Expr::LegalizeField {
                procedure,
                current: field_current,
                written: field_written,
            } => {
                let c = self.eval(field_current, frame, current, written, acc);
                let w = self.eval(field_written, frame, current, written, acc);
                match self.field(procedure) {
                    Some(field) => field.call(c, w, &*frame),
                    None => {
                        log::error!("call to unknown field procedure {procedure}");
                        w
                    }
                }
            }
            Expr::LegalizeRegister {
                register,
                current: target_current,
                written: target_written,
            } => {
                let c = self.eval(target_current, frame, current, written, acc);
                let w = self.eval(target_written, frame, current, written, acc);
                match self.register(register) {
                    Some(target) => {
                        let outcome = self.run(&target.legalize, target.width, &*frame, c, w);
                        frame.stores.extend(outcome.stores);
                        outcome.value
                    }
                    None => {
                        log::error!("call to unknown register procedure {register}");
                        w
                    }
                }
            }
        }
    }
}

/// Register storage driven by a [`CompiledRegisters`].
///
/// Registers are keyed by name; addresses are resolved through the dispatch
/// tables. Every access is total: unknown addresses report `None` rather
/// than failing.
pub struct RegisterFile<'a> {
    compiled: &'a CompiledRegisters,
    values: BTreeMap<String, u64>,
}

impl<'a> RegisterFile<'a> {
    /// Creates a register file holding the reset values.
    pub fn new(compiled: &'a CompiledRegisters) -> Self {
        let mut file = Self {
            compiled,
            values: BTreeMap::new(),
        };
        file.reset();
        file
    }

    /// Assigns every register its reset value.
    pub fn reset(&mut self) {
        self.values.clear();
        let outcome = self.compiled.run(&self.compiled.reset, 64, &self.values, 0, 0);
        self.values.extend(outcome.stores);
    }

    /// Stored value of `name`, without read-side synthesis.
    pub fn value(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Overwrites the stored value of `name`, bypassing legalization.
    pub fn set_value(&mut self, name: &str, value: u64) {
        let value = self
            .compiled
            .register(name)
            .map_or(value, |r| value & low_bits(r.width));
        self.values.insert(name.to_string(), value);
    }

    pub fn read(&self, address: u32) -> Option<u64> {
        let name = self.compiled.tables.read.get(&address)?;
        let current = self.values.register_value(name);
        self.compiled.get(name, &self.values, current)
    }

    /// Legalizes and stores `value`, returning the stored result.
    pub fn write(&mut self, address: u32, value: u64) -> Option<u64> {
        let name = self.compiled.tables.write.get(&address)?;
        let current = self.values.register_value(name);
        let outcome = self.compiled.legalize(name, &self.values, current, value)?;
        log::trace!(
            "write {name} {value:#x} -> {:#x} ({} shadow stores)",
            outcome.value,
            outcome.stores.len()
        );
        self.values.extend(outcome.stores);
        self.values.insert(name.clone(), outcome.value);
        Some(outcome.value)
    }

    pub fn is_defined(&self, address: u32, level: PrivilegeLevel) -> bool {
        self.compiled.tables.is_defined(address, level)
    }

    pub fn name_of(&self, address: u32) -> Option<&str> {
        self.compiled.tables.name_of(address)
    }

    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.compiled.tables.address_of(name)
    }
}
