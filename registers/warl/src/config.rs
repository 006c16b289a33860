// Licensed under the Apache-2.0 license

//! Compilation options.
//!
//! [`CompileConfig`] selects the width profile to compile and carries a
//! [`LegalizeFilter`] naming registers that are declared to the dispatch
//! tables but get no legalization procedures of their own.

use crate::types::Xlen;

/// Free-running counters that are defined but never legalized.
pub const DEFAULT_SKIPPED: [&str; 10] = [
    "mcycle",
    "mcycleh",
    "time",
    "timeh",
    "minstret",
    "minstreth",
    "cycle",
    "cycleh",
    "instret",
    "instreth",
];

/// Registers excluded from legalization.
///
/// A skipped register still answers `is_defined` and appears in the name
/// map, but has no procedures, no read/write entries and no reset value.
///
/// # Example
///
/// ```
/// use registers_warl::config::LegalizeFilter;
///
/// let filter = LegalizeFilter::with_defaults().skip("mscratch");
/// assert!(filter.should_skip("MCYCLE"));
/// assert!(filter.should_skip("mscratch"));
/// assert!(!filter.should_skip("mstatus"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalizeFilter {
    /// Lowercased register names.
    pub skip_names: Vec<String>,
}

impl LegalizeFilter {
    /// A filter that skips nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// A filter that skips the free-running counters.
    pub fn with_defaults() -> Self {
        Self {
            skip_names: DEFAULT_SKIPPED.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Skip another register (case-insensitive).
    pub fn skip(mut self, name: &str) -> Self {
        self.skip_names.push(name.to_lowercase());
        self
    }

    pub fn should_skip(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.skip_names.iter().any(|n| *n == name)
    }
}

/// Options for one compilation run.
///
/// # Example
///
/// ```
/// use registers_warl::config::{CompileConfig, LegalizeFilter};
/// use registers_warl::Xlen;
///
/// let config = CompileConfig::new(Xlen::Rv32).with_filter(LegalizeFilter::none());
/// assert_eq!(config.xlen, Xlen::Rv32);
/// assert!(!config.filter.should_skip("mcycle"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileConfig {
    pub xlen: Xlen,
    pub filter: LegalizeFilter,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self::new(Xlen::default())
    }
}

impl CompileConfig {
    /// Compiles `xlen` with the default filter.
    pub fn new(xlen: Xlen) -> Self {
        Self {
            xlen,
            filter: LegalizeFilter::with_defaults(),
        }
    }

    pub fn with_filter(mut self, filter: LegalizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Adds a register to the current filter.
    pub fn skip(mut self, name: &str) -> Self {
        self.filter = self.filter.skip(name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let filter = LegalizeFilter::with_defaults();
        for name in DEFAULT_SKIPPED {
            assert!(filter.should_skip(name));
        }
        assert!(filter.should_skip("InstRetH"));
        assert!(!filter.should_skip("mepc"));
    }

    #[test]
    fn test_empty_filter() {
        let filter = LegalizeFilter::none();
        assert!(!filter.should_skip("mcycle"));
    }

    #[test]
    fn test_config_builder() {
        let config = CompileConfig::default().skip("MSCRATCH");
        assert_eq!(config.xlen, Xlen::Rv64);
        assert!(config.filter.should_skip("mscratch"));
        assert!(config.filter.should_skip("time"));

        let config = CompileConfig::new(Xlen::Rv32)
            .with_filter(LegalizeFilter::none())
            .skip("mepc");
        assert_eq!(config.filter.skip_names, vec!["mepc".to_string()]);
    }
}
