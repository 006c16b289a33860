// Licensed under the Apache-2.0 license

use thiserror::Error;

/// Configuration errors raised while compiling register definitions.
///
/// None of these are recoverable within a run: the first one aborts the
/// compilation and no procedures are produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarlError {
    /// A legal set (or one of its segments) resolves to no values at all.
    #[error("{register}.{field}: legal range is empty")]
    EmptyRange { register: String, field: String },

    /// A field declares both bitmask and range-list legal values.
    #[error("{register}.{field}: cannot mix bitmask and range legal values")]
    MixedRepresentation { register: String, field: String },

    /// A dependency clause names a field that cannot be resolved.
    #[error("{register}.{field}: cannot resolve dependency '{dependency}'")]
    UnresolvedDependency {
        register: String,
        field: String,
        dependency: String,
    },

    /// A shadow field targets a register that has not been assembled yet.
    #[error("{register}.{field}: shadow target '{target}' must be defined before this register")]
    ForwardShadowReference {
        register: String,
        field: String,
        target: String,
    },

    /// Two registers of the same width profile share an address.
    #[error("address {address:#05x} is used by both '{first}' and '{second}'")]
    DuplicateAddress {
        address: u32,
        first: String,
        second: String,
    },

    /// Two fields of one register cover a common bit.
    #[error("{register}: fields '{first}' and '{second}' overlap")]
    OverlappingField {
        register: String,
        first: String,
        second: String,
    },

    /// A field or legal slice does not fit inside its container.
    #[error("{register}.{field}: bits [{msb}:{lsb}] do not fit in {width} bits")]
    FieldOutOfRange {
        register: String,
        field: String,
        msb: u32,
        lsb: u32,
        width: u32,
    },

    /// A legal value, literal replacement or bitmask exceeds its slice.
    #[error("{register}.{field}: value {value:#x} does not fit in mask {mask:#x}")]
    ValueOutOfRange {
        register: String,
        field: String,
        value: u64,
        mask: u64,
    },

    /// A legal or illegal-write expression does not parse.
    #[error("{register}.{field}: cannot parse '{text}': {message}")]
    Syntax {
        register: String,
        field: String,
        text: String,
        message: String,
    },

    /// A register entry is structurally incomplete.
    #[error("{register}: {message}")]
    InvalidDefinition { register: String, message: String },
}

pub type WarlResult<T> = std::result::Result<T, WarlError>;
