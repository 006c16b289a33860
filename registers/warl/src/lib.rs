// Licensed under the Apache-2.0 license

//! WARL (write-any, read-legal) register legalization compiler.
//!
//! This crate turns declarative register definitions into legalization
//! procedures: for every register, a `legalize(current, written)` procedure
//! that maps any written value to a legal one, an optional `get(current)`
//! procedure for registers that mirror other registers, a reset procedure
//! and the address-indexed dispatch tables.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use registers_warl::{
//!     compile, generate_warl_from_file, CompileConfig, Definition, PrivilegeLevel,
//!     RegisterFile, Xlen,
//! };
//!
//! // Render procedures from a definition file
//! let text = generate_warl_from_file(Path::new("csrs.toml"), Xlen::Rv64).unwrap();
//!
//! // Or compile and execute them directly
//! let definition = Definition::load(Path::new("csrs.toml")).unwrap();
//! let config = CompileConfig::new(Xlen::Rv32).skip("mscratch");
//! let compiled = compile(&definition, &config).unwrap();
//! let mut file = RegisterFile::new(&compiled);
//! if file.is_defined(0x305, PrivilegeLevel::Machine) {
//!     file.write(0x305, 0x8000_0003);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`range`], [`resolve`], [`segmented`]: legal value sets and the search
//!   that picks a legal value for an illegal write
//! - [`legal`]: grammar of legal and illegal-write expressions
//! - [`field`]: per-field legalization
//! - [`definition`]: the serialized register definition tree
//! - [`types`]: lowered register and field descriptions
//! - [`procedure`]: procedure trees and dispatch tables
//! - [`eval`]: execution of compiled procedures ([`RegisterFile`])
//! - [`output`]: text rendering
//! - [`config`]: compilation options ([`CompileConfig`])
//! - [`util`]: bit manipulation and name helpers

pub mod config;
pub mod definition;
pub mod error;
pub mod eval;
pub mod field;
pub mod legal;
pub mod output;
pub mod procedure;
pub mod range;
pub mod resolve;
pub mod segmented;
pub mod types;
pub mod util;

mod assemble;

// Re-export main public API
pub use assemble::{
    compile, generate_warl_from_file, generate_warl_from_file_with_config, AssemblyContext,
};
pub use config::{CompileConfig, LegalizeFilter};
pub use definition::Definition;
pub use error::{WarlError, WarlResult};
pub use eval::{Outcome, RegisterFile};
pub use procedure::CompiledRegisters;
pub use range::{LegalSet, RangeEntry, RangeSegment};
pub use segmented::ResolutionMode;
pub use types::{Privilege, PrivilegeLevel, RegisterState, Xlen};
