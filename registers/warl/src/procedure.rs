// Licensed under the Apache-2.0 license

//! Structured procedure definitions produced by the assembler.
//!
//! A procedure is a list of statements over a single accumulator. Register
//! procedures take `(current, written)` and return the accumulator; `get`
//! procedures take the current value only and never read `Written`. The
//! same tree is both executed by [`RegisterFile`](crate::eval::RegisterFile)
//! and rendered by the text backend.

use crate::field::FieldProcedure;
use crate::types::{Privilege, PrivilegeLevel, Xlen};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// The register's value before the write.
    Current,
    /// The value being written.
    Written,
    /// The accumulator.
    Acc,
    Const(u64),
    /// Present value of another register, including stores made earlier in
    /// the same procedure.
    Register(String),
    /// Bits `msb..=lsb` of `value`, right-aligned.
    Slice {
        value: Box<Expr>,
        msb: u32,
        lsb: u32,
    },
    /// `base` with bits `msb..=lsb` replaced by the low bits of `value`.
    Insert {
        base: Box<Expr>,
        msb: u32,
        lsb: u32,
        value: Box<Expr>,
    },
    /// Call of a field legalizer.
    LegalizeField {
        procedure: String,
        current: Box<Expr>,
        written: Box<Expr>,
    },
    /// Call of another register's `legalize` procedure.
    LegalizeRegister {
        register: String,
        current: Box<Expr>,
        written: Box<Expr>,
    },
}

impl Expr {
    pub fn slice(self, msb: u32, lsb: u32) -> Expr {
        Expr::Slice {
            value: Box::new(self),
            msb,
            lsb,
        }
    }

    pub fn insert(self, msb: u32, lsb: u32, value: Expr) -> Expr {
        Expr::Insert {
            base: Box::new(self),
            msb,
            lsb,
            value: Box::new(value),
        }
    }

    pub fn register(name: &str) -> Expr {
        Expr::Register(name.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// Replace the accumulator.
    Assign(Expr),
    /// Write another register.
    Store { register: String, value: Expr },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Procedure {
    pub name: String,
    pub body: Vec<Stmt>,
}

impl Procedure {
    pub fn new(name: String) -> Self {
        Self {
            name,
            body: Vec::new(),
        }
    }

    pub fn assign(&mut self, expr: Expr) {
        self.body.push(Stmt::Assign(expr));
    }

    pub fn store(&mut self, register: &str, value: Expr) {
        self.body.push(Stmt::Store {
            register: register.to_string(),
            value,
        });
    }
}

/// Procedures of one assembled register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterProcedures {
    pub name: String,
    pub address: u32,
    /// Storage width; stored values never exceed it.
    pub width: u32,
    pub legalize: Procedure,
    /// Read-side synthesis, present when the register has shadow fields.
    pub get: Option<Procedure>,
}

/// Address-indexed tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchTables {
    /// Readable registers by address.
    pub read: BTreeMap<u32, String>,
    /// Writable registers by address.
    pub write: BTreeMap<u32, String>,
    /// Required privilege of every defined address.
    pub defined: BTreeMap<u32, Privilege>,
    pub names: BTreeMap<u32, String>,
    pub addresses: BTreeMap<String, u32>,
}

impl DispatchTables {
    pub fn is_defined(&self, address: u32, level: PrivilegeLevel) -> bool {
        self.defined
            .get(&address)
            .is_some_and(|privilege| privilege.allows(level))
    }

    pub fn name_of(&self, address: u32) -> Option<&str> {
        self.names.get(&address).map(String::as_str)
    }

    /// Address of `name`. Names match case-insensitively, as in definitions.
    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.addresses.get(name).copied().or_else(|| {
            self.addresses
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, address)| *address)
        })
    }
}

/// Everything one compilation run produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledRegisters {
    pub xlen: Xlen,
    /// Field legalizers in assembly order.
    pub fields: Vec<FieldProcedure>,
    /// Register procedures in assembly order.
    pub registers: Vec<RegisterProcedures>,
    /// Assigns every assembled register its reset value.
    pub reset: Procedure,
    pub tables: DispatchTables,
}

impl CompiledRegisters {
    pub fn field(&self, procedure: &str) -> Option<&FieldProcedure> {
        self.fields.iter().find(|f| f.name == procedure)
    }

    pub fn register(&self, name: &str) -> Option<&RegisterProcedures> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Procedures of the register assembled at `address`.
    pub fn register_at(&self, address: u32) -> Option<&RegisterProcedures> {
        self.registers.iter().find(|r| r.address == address)
    }
}
