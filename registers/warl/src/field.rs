// Licensed under the Apache-2.0 license

//! Field-level WARL evaluation.

use crate::range::{contains, LegalSet};
use crate::types::{guard_holds, FallbackRule, RegisterState, Resolution, WarlRule};
use crate::util::low_bits;

impl FallbackRule {
    /// Whether this rule fires for `written` under `state`.
    pub fn applies(&self, written: u64, state: &dyn RegisterState) -> bool {
        guard_holds(&self.guard, state)
            && self
                .trigger
                .as_ref()
                .map_or(true, |values| contains(written, values))
    }
}

impl WarlRule {
    /// Legalizes one field-relative `written` value.
    ///
    /// Every clause whose guard holds is checked against the original written
    /// value; bitmask clauses are applied to the running result directly.
    /// Once any clause has rejected the value it stays illegal, and every
    /// fallback rule that applies is folded over the result in declaration
    /// order, so the last applicable rule decides. A mode resolves against
    /// the legal set of the last clause that rejected the value.
    pub fn legalize(
        &self,
        width: u32,
        current: u64,
        written: u64,
        state: &dyn RegisterState,
    ) -> u64 {
        let mut value = written;
        let mut rejected_by: Option<&LegalSet> = None;
        for clause in &self.legal {
            if !guard_holds(&clause.guard, state) {
                continue;
            }
            match &clause.set {
                LegalSet::Bitmask(bitmask) => value = bitmask.apply(value),
                set => {
                    if !set.contains(written) {
                        rejected_by = Some(set);
                    }
                }
            }
        }

        let Some(set) = rejected_by else {
            return value & low_bits(width);
        };
        log::trace!("written value {written:#x} is illegal");
        let value = self.illegal.iter().fold(value, |acc, rule| {
            if !rule.applies(written, state) {
                return acc;
            }
            match rule.action {
                Resolution::Literal(literal) => literal,
                Resolution::Resolve(mode) => set.legalize(current, acc, mode, width),
            }
        });
        value & low_bits(width)
    }
}

/// A compiled field legalizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldProcedure {
    /// Procedure identifier, unique across the compilation.
    pub name: String,
    pub register: String,
    pub field: String,
    pub width: u32,
    pub rule: WarlRule,
}

impl FieldProcedure {
    pub fn call(&self, current: u64, written: u64, state: &dyn RegisterState) -> u64 {
        self.rule.legalize(
            self.width,
            current & low_bits(self.width),
            written & low_bits(self.width),
            state,
        )
    }
}
