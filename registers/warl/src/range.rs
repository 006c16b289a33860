// Licensed under the Apache-2.0 license

//! Legal-value representations.
//!
//! A field's legal values are either a list of [`RangeSegment`]s, each
//! governing the bits selected by its mask, or a single [`BitmaskSpec`].
//! Values stored in a segment are already shifted into field position, so
//! membership is tested against `value & mask`.

use crate::resolve;
use crate::segmented::{legalize_segments, ResolutionMode};
use thiserror::Error;

/// Raised when a resolution is requested over a range with no entries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("empty WARL range")]
pub struct EmptyRangeError;

/// A single legal value or an inclusive interval of legal values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeEntry {
    Value(u64),
    Interval(u64, u64),
}

impl RangeEntry {
    pub fn lower(&self) -> u64 {
        match *self {
            RangeEntry::Value(v) => v,
            RangeEntry::Interval(lo, _) => lo,
        }
    }

    pub fn upper(&self) -> u64 {
        match *self {
            RangeEntry::Value(v) => v,
            RangeEntry::Interval(_, hi) => hi,
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.lower() <= value && value <= self.upper()
    }
}

/// True iff `value` equals some `Value` entry or falls inside some
/// `Interval` entry (bounds inclusive).
pub fn contains(value: u64, entries: &[RangeEntry]) -> bool {
    entries.iter().any(|e| e.contains(value))
}

/// Builds the inclusive gaps left by `entries` inside `0..=domain_mask`.
///
/// Gaps are stepped by the lowest set bit of `domain_mask`, so every bound
/// produced stays aligned to the slice the mask describes.
pub fn complement(entries: &[RangeEntry], domain_mask: u64) -> Vec<RangeEntry> {
    if domain_mask == 0 {
        return Vec::new();
    }
    let step = domain_mask & domain_mask.wrapping_neg();

    let mut covered: Vec<(u64, u64)> = entries
        .iter()
        .map(|e| (e.lower(), e.upper().min(domain_mask)))
        .filter(|(lo, hi)| lo <= hi)
        .collect();
    covered.sort_unstable();
    covered.dedup();

    let mut gaps = Vec::new();
    // Smallest value not yet covered or emitted; None once the top is reached.
    let mut next = Some(0u64);
    for (lo, hi) in covered {
        let Some(start) = next else {
            break;
        };
        if lo > start {
            gaps.push(RangeEntry::Interval(
                start,
                lo.saturating_sub(step).max(start),
            ));
        }
        if hi >= start {
            next = hi.checked_add(step).filter(|n| *n <= domain_mask);
        }
    }
    if let Some(start) = next {
        gaps.push(RangeEntry::Interval(start, domain_mask));
    }
    gaps
}

/// One prioritised slice of a legal set.
///
/// `values` is fixed at construction and guaranteed non-empty, which makes
/// every resolution over a segment total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeSegment {
    /// Bit positions governed by this segment.
    pub mask: u64,
    /// Step applied when the search has to move past the written bits.
    pub delta: u64,
    values: Vec<RangeEntry>,
    min: u64,
    max: u64,
}

impl RangeSegment {
    pub fn new(mask: u64, delta: u64, values: Vec<RangeEntry>) -> Result<Self, EmptyRangeError> {
        let min = resolve::min(&values)?;
        let max = resolve::max(&values)?;
        Ok(Self {
            mask,
            delta,
            values,
            min,
            max,
        })
    }

    pub fn values(&self) -> &[RangeEntry] {
        &self.values
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn contains(&self, value: u64) -> bool {
        contains(value & self.mask, &self.values)
    }

    pub fn next_up(&self, value: u64) -> u64 {
        resolve::next_up(value, &self.values).unwrap_or(self.max)
    }

    pub fn next_down(&self, value: u64) -> u64 {
        resolve::next_down(value, &self.values).unwrap_or(self.min)
    }
}

/// True iff every segment accepts the bits of `value` under its mask.
pub fn segments_contain(value: u64, segments: &[RangeSegment]) -> bool {
    segments.iter().all(|s| s.contains(value))
}

/// Union of the masks of `segments`.
pub fn covered_mask(segments: &[RangeSegment]) -> u64 {
    segments.iter().fold(0, |acc, s| acc | s.mask)
}

/// Pass-through bits plus forced defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmaskSpec {
    /// Bits copied from the written value.
    pub mask: u64,
    /// Values forced into every bit outside `mask`.
    pub default: u64,
}

impl BitmaskSpec {
    pub fn apply(&self, value: u64) -> u64 {
        (value & self.mask) | (self.default & !self.mask)
    }

    pub fn contains(&self, value: u64) -> bool {
        self.apply(value) == value
    }
}

/// The declared legal values of one legality clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegalSet {
    /// Ordered most-significant mask first.
    Segments(Vec<RangeSegment>),
    Bitmask(BitmaskSpec),
}

impl LegalSet {
    /// Builds a segment list in resolution order.
    pub fn from_segments(mut segments: Vec<RangeSegment>) -> Self {
        segments.sort_by(|a, b| b.mask.cmp(&a.mask));
        LegalSet::Segments(segments)
    }

    pub fn contains(&self, value: u64) -> bool {
        match self {
            LegalSet::Segments(segments) => segments_contain(value, segments),
            LegalSet::Bitmask(bitmask) => bitmask.contains(value),
        }
    }

    /// Resolves `written` into this set. Bitmask sets ignore `mode`.
    pub fn legalize(&self, current: u64, written: u64, mode: ResolutionMode, width: u32) -> u64 {
        match self {
            LegalSet::Segments(segments) => {
                legalize_segments(current, written, segments, mode, 0, width)
            }
            LegalSet::Bitmask(bitmask) => bitmask.apply(written),
        }
    }
}
