// Licensed under the Apache-2.0 license

//! Register definition input.
//!
//! A definition is an ordered list of registers. Each register carries an
//! optional layout per width profile; a layout is either a list of fields or
//! a single scalar field. Register order is significant: shadow targets must
//! appear before the registers that shadow them.
//!
//! ```toml
//! [[register]]
//! name = "mtvec"
//! address = 0x305
//! privilege = "machine"
//! reset_value = 0
//!
//! [[register.rv64.fields]]
//! name = "mode"
//! msb = 1
//! lsb = 0
//! warl = { legal = ["[1:0] in [0, 1]"], wr_illegal = ["unchanged"] }
//! ```

use crate::types::{Privilege, ShadowMode, Xlen};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(rename = "register", default)]
    pub registers: Vec<RegisterDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDef {
    pub name: String,
    pub address: u32,
    #[serde(alias = "priv_mode")]
    pub privilege: Privilege,
    #[serde(default, alias = "reset-val")]
    pub reset_value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rv32: Option<LayoutDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rv64: Option<LayoutDef>,
}

impl RegisterDef {
    /// Layout for `xlen`, if the register exists and is accessible there.
    pub fn layout(&self, xlen: Xlen) -> Option<&LayoutDef> {
        let layout = match xlen {
            Xlen::Rv32 => self.rv32.as_ref(),
            Xlen::Rv64 => self.rv64.as_ref(),
        };
        layout.filter(|l| l.accessible)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDef {
    #[serde(default = "default_true")]
    pub accessible: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<FieldDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarlDef {
    /// `reg::field` or `reg` names that guards may refer to by their leaf.
    #[serde(default)]
    pub dependency_fields: Vec<String>,
    pub legal: Vec<String>,
    #[serde(default)]
    pub wr_illegal: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(default)]
    pub name: String,
    pub msb: u32,
    pub lsb: u32,
    #[serde(default = "default_true")]
    pub implemented: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warl: Option<WarlDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ro_constant: Option<u64>,
    #[serde(default)]
    pub ro_variable: bool,
    /// `reg` or `reg.field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_type: Option<ShadowMode>,
}

impl FieldDef {
    /// A plain field covering `msb..=lsb`.
    pub fn new(name: &str, msb: u32, lsb: u32) -> Self {
        Self {
            name: name.to_string(),
            msb,
            lsb,
            implemented: true,
            warl: None,
            ro_constant: None,
            ro_variable: false,
            shadow: None,
            shadow_type: None,
        }
    }
}

impl Definition {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid TOML register definition")
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid JSON register definition")
    }

    /// Loads a `.toml` or `.json` definition file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let definition = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => bail!("unsupported definition format: {}", path.display()),
        };
        definition.with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn register(&self, name: &str) -> Option<&RegisterDef> {
        self.registers
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}
