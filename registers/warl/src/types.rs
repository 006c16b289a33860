// Licensed under the Apache-2.0 license

//! Lowered register model consumed by the assembler.
//!
//! These structures are produced from a [`Definition`](crate::definition::Definition)
//! once a width profile has been selected and every legal expression has been
//! parsed. Bit positions and legal values are fully resolved here; nothing in
//! this module refers back to the textual input.

use crate::range::{contains, LegalSet, RangeEntry};
use crate::segmented::ResolutionMode;
use crate::util::slice;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Architecture width profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Xlen {
    #[serde(rename = "32")]
    Rv32,
    #[default]
    #[serde(rename = "64")]
    Rv64,
}

impl Xlen {
    pub fn bits(self) -> u32 {
        match self {
            Xlen::Rv32 => 32,
            Xlen::Rv64 => 64,
        }
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rv{}", self.bits())
    }
}

/// Privilege a register requires to be accessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    #[serde(alias = "M")]
    Machine,
    #[serde(alias = "S")]
    Supervisor,
    #[serde(alias = "U")]
    Any,
}

/// Privilege level of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrivilegeLevel {
    Machine,
    Supervisor,
    User,
}

impl Privilege {
    /// True if an access made at `level` satisfies this requirement.
    pub fn allows(self, level: PrivilegeLevel) -> bool {
        match self {
            Privilege::Machine => level == PrivilegeLevel::Machine,
            Privilege::Supervisor => {
                matches!(level, PrivilegeLevel::Machine | PrivilegeLevel::Supervisor)
            }
            Privilege::Any => true,
        }
    }
}

/// Read access to register values by name.
///
/// Registers that are not present read as zero.
pub trait RegisterState {
    fn register_value(&self, name: &str) -> u64;
}

impl RegisterState for BTreeMap<String, u64> {
    fn register_value(&self, name: &str) -> u64 {
        self.get(name).copied().unwrap_or(0)
    }
}

impl RegisterState for HashMap<String, u64> {
    fn register_value(&self, name: &str) -> u64 {
        self.get(name).copied().unwrap_or(0)
    }
}

/// One conjunct of a dependency predicate: the bits `msb..=lsb` of
/// `register` must lie in `values`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredicateTerm {
    pub register: String,
    /// Absolute bit positions within `register`.
    pub msb: u32,
    pub lsb: u32,
    /// Values relative to the slice.
    pub values: Vec<RangeEntry>,
}

impl PredicateTerm {
    pub fn holds(&self, state: &dyn RegisterState) -> bool {
        let bits = slice(state.register_value(&self.register), self.msb, self.lsb);
        contains(bits, &self.values)
    }
}

/// Conjunction of [`PredicateTerm`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Predicate {
    pub terms: Vec<PredicateTerm>,
}

impl Predicate {
    pub fn holds(&self, state: &dyn RegisterState) -> bool {
        self.terms.iter().all(|t| t.holds(state))
    }
}

/// Guard evaluation where an absent predicate always holds.
pub(crate) fn guard_holds(guard: &Option<Predicate>, state: &dyn RegisterState) -> bool {
    guard.as_ref().map_or(true, |p| p.holds(state))
}

/// A legality clause: when `guard` holds, the written value must be in `set`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegalClause {
    pub guard: Option<Predicate>,
    pub set: LegalSet,
}

/// Replacement chosen by a fallback rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Literal(u64),
    Resolve(ResolutionMode),
}

/// An illegal-write handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackRule {
    pub guard: Option<Predicate>,
    /// Field-relative written values the rule is restricted to.
    pub trigger: Option<Vec<RangeEntry>>,
    pub action: Resolution,
}

/// Legality clauses and fallback rules of one WARL field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WarlRule {
    pub legal: Vec<LegalClause>,
    pub illegal: Vec<FallbackRule>,
}

impl WarlRule {
    pub fn has_dependencies(&self) -> bool {
        self.legal.iter().any(|c| c.guard.is_some())
            || self.illegal.iter().any(|r| r.guard.is_some())
    }
}

/// Behaviour of a shadow field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowMode {
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "ro")]
    ReadOnly,
}

/// A register, or one field of a register, mirrored by a shadow field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub register: String,
    pub field: Option<String>,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}", self.register, field),
            None => write!(f, "{}", self.register),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShadowSpec {
    pub target: FieldRef,
    pub mode: ShadowMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Warl(WarlRule),
    ReadOnlyConstant(u64),
    ReadOnlyVariable,
    Plain,
    Shadow(ShadowSpec),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub msb: u32,
    pub lsb: u32,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }
}

/// Layout of a register's storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterShape {
    /// Named fields; bits not covered by a field keep their current value.
    Fields(Vec<FieldSpec>),
    /// A single value occupying `msb..=lsb`, with zero padding below `lsb`.
    Scalar(FieldSpec),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterSpec {
    pub name: String,
    pub address: u32,
    pub privilege: Privilege,
    pub reset_value: u64,
    /// Storage width in bits.
    pub width: u32,
    pub shape: RegisterShape,
}

impl RegisterSpec {
    pub fn fields(&self) -> &[FieldSpec] {
        match &self.shape {
            RegisterShape::Fields(fields) => fields,
            RegisterShape::Scalar(field) => std::slice::from_ref(field),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        match &self.shape {
            RegisterShape::Fields(fields) => {
                fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
            }
            RegisterShape::Scalar(_) => None,
        }
    }
}
