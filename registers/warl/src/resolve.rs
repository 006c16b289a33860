// Licensed under the Apache-2.0 license

//! Point-wise resolution of a value against a list of range entries.
//!
//! Every function here fails only when `entries` is empty; for any non-empty
//! list the search degrades to the closest available value instead of
//! failing, so callers holding a validated [`RangeSegment`] never see an
//! error.
//!
//! [`RangeSegment`]: crate::range::RangeSegment

use crate::range::{EmptyRangeError, RangeEntry};

pub type ResolveResult = Result<u64, EmptyRangeError>;

/// Largest legal value.
pub fn max(entries: &[RangeEntry]) -> ResolveResult {
    entries
        .iter()
        .map(RangeEntry::upper)
        .max()
        .ok_or(EmptyRangeError)
}

/// Smallest legal value.
pub fn min(entries: &[RangeEntry]) -> ResolveResult {
    entries
        .iter()
        .map(RangeEntry::lower)
        .min()
        .ok_or(EmptyRangeError)
}

fn keep_min(slot: &mut Option<u64>, candidate: u64) {
    *slot = Some(slot.map_or(candidate, |v| v.min(candidate)));
}

fn keep_max(slot: &mut Option<u64>, candidate: u64) {
    *slot = Some(slot.map_or(candidate, |v| v.max(candidate)));
}

/// Closest legal values at or above, and below, `value`.
fn neighbours(value: u64, entries: &[RangeEntry]) -> (Option<u64>, Option<u64>) {
    let mut above = None;
    let mut below = None;
    for entry in entries {
        match *entry {
            RangeEntry::Value(v) if v == value => return (Some(value), Some(value)),
            RangeEntry::Value(v) if v > value => keep_min(&mut above, v),
            RangeEntry::Value(v) => keep_max(&mut below, v),
            RangeEntry::Interval(lo, hi) if lo <= value && value <= hi => {
                return (Some(value), Some(value));
            }
            RangeEntry::Interval(lo, _) if lo > value => keep_min(&mut above, lo),
            RangeEntry::Interval(_, hi) => keep_max(&mut below, hi),
        }
    }
    (above, below)
}

/// Smallest legal value `>= value`, or the largest legal value below it when
/// none exists.
pub fn next_up(value: u64, entries: &[RangeEntry]) -> ResolveResult {
    let (above, below) = neighbours(value, entries);
    above.or(below).ok_or(EmptyRangeError)
}

/// Largest legal value `<= value`, or the smallest legal value above it when
/// none exists.
pub fn next_down(value: u64, entries: &[RangeEntry]) -> ResolveResult {
    let (above, below) = neighbours(value, entries);
    below.or(above).ok_or(EmptyRangeError)
}

/// Which candidate wins when both neighbours are equally distant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreak {
    Up,
    Down,
}

/// Picks whichever of `up` and `down` is numerically closer to `value`.
pub fn closer(value: u64, up: u64, down: u64, tie: TieBreak) -> u64 {
    let (to_up, to_down) = (up.abs_diff(value), down.abs_diff(value));
    match tie {
        TieBreak::Up if to_up <= to_down => up,
        TieBreak::Down if to_up < to_down => up,
        _ => down,
    }
}

/// Nearest legal value, preferring the upper neighbour on a tie.
pub fn nearest_up(value: u64, entries: &[RangeEntry]) -> ResolveResult {
    Ok(closer(
        value,
        next_up(value, entries)?,
        next_down(value, entries)?,
        TieBreak::Up,
    ))
}

/// Nearest legal value, preferring the lower neighbour on a tie.
pub fn nearest_down(value: u64, entries: &[RangeEntry]) -> ResolveResult {
    Ok(closer(
        value,
        next_up(value, entries)?,
        next_down(value, entries)?,
        TieBreak::Down,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use RangeEntry::{Interval, Value};

    const ENTRIES: [RangeEntry; 2] = [Interval(0, 2), Value(8)];

    #[test]
    fn test_min_max() {
        assert_eq!(min(&ENTRIES), Ok(0));
        assert_eq!(max(&ENTRIES), Ok(8));
        // Interval lower bounds fold into the minimum.
        assert_eq!(min(&[Value(9), Interval(4, 20)]), Ok(4));
        assert_eq!(min(&[]), Err(EmptyRangeError));
        assert_eq!(max(&[]), Err(EmptyRangeError));
    }

    #[test]
    fn test_next_up() {
        assert_eq!(next_up(5, &ENTRIES), Ok(8));
        assert_eq!(next_up(1, &ENTRIES), Ok(1));
        assert_eq!(next_up(8, &ENTRIES), Ok(8));
        // Nothing above: degrade to the largest value below.
        assert_eq!(next_up(9, &ENTRIES), Ok(8));
        assert_eq!(next_up(u64::MAX, &ENTRIES), Ok(8));
        assert_eq!(next_up(3, &[]), Err(EmptyRangeError));
    }

    #[test]
    fn test_next_down() {
        assert_eq!(next_down(5, &ENTRIES), Ok(2));
        assert_eq!(next_down(2, &ENTRIES), Ok(2));
        assert_eq!(next_down(9, &ENTRIES), Ok(8));
        // Nothing below: degrade to the smallest value above.
        assert_eq!(next_down(3, &[Value(7), Interval(10, 12)]), Ok(7));
        assert_eq!(next_down(0, &[Value(7)]), Ok(7));
    }

    #[test]
    fn test_nearest_tie_break() {
        // 5 is three away from both 2 and 8.
        assert_eq!(nearest_up(5, &ENTRIES), Ok(8));
        assert_eq!(nearest_down(5, &ENTRIES), Ok(2));
        assert_eq!(nearest_up(6, &ENTRIES), Ok(8));
        assert_eq!(nearest_down(4, &ENTRIES), Ok(2));
    }

    #[test]
    fn test_nearest_uses_lower_neighbour() {
        // Resolving the "down" candidate through the next-up search would
        // always return 8 here.
        assert_eq!(nearest_up(3, &ENTRIES), Ok(2));
        assert_eq!(nearest_down(3, &ENTRIES), Ok(2));
        assert_eq!(nearest_down(7, &ENTRIES), Ok(8));
    }

    #[test]
    fn test_nearest_at_domain_edges() {
        assert_eq!(nearest_up(u64::MAX, &[Value(0), Value(u64::MAX - 1)]), Ok(u64::MAX - 1));
        assert_eq!(nearest_down(0, &[Value(1), Value(u64::MAX)]), Ok(1));
    }
}
