// Licensed under the Apache-2.0 license

//! Legalization across a prioritised list of range segments.
//!
//! Segments are visited most-significant mask first. The search modes walk
//! the list once, resolving each segment against the written bits under its
//! mask and, as soon as one segment is forced to move, filling every lower
//! segment with the extreme that keeps the composite value on the same side
//! of the written value. Recursion depth is bounded by the segment count, so
//! every mode terminates with a value.

use crate::range::{covered_mask, RangeSegment};
use crate::resolve::{closer, TieBreak};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Policy selecting the replacement for an illegal write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionMode {
    /// Keep the current value.
    Unchanged,
    Largest,
    Smallest,
    NextUp,
    NextDown,
    NearestUp,
    NearestDown,
    /// Flip the top bit of the written value without consulting the set.
    AddressFixup,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resolution mode '{0}'")]
pub struct UnknownModeError(pub String);

impl FromStr for ResolutionMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unchanged" => Ok(ResolutionMode::Unchanged),
            "largest" => Ok(ResolutionMode::Largest),
            "smallest" => Ok(ResolutionMode::Smallest),
            "nextup" => Ok(ResolutionMode::NextUp),
            "nextdown" => Ok(ResolutionMode::NextDown),
            "nearup" => Ok(ResolutionMode::NearestUp),
            "neardown" => Ok(ResolutionMode::NearestDown),
            "addr" => Ok(ResolutionMode::AddressFixup),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionMode::Unchanged => "Unchanged",
            ResolutionMode::Largest => "Largest",
            ResolutionMode::Smallest => "Smallest",
            ResolutionMode::NextUp => "Nextup",
            ResolutionMode::NextDown => "Nextdown",
            ResolutionMode::NearestUp => "Nearup",
            ResolutionMode::NearestDown => "Neardown",
            ResolutionMode::AddressFixup => "Addr",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn resolve(self, segment: &RangeSegment, bits: u64) -> u64 {
        match self {
            Direction::Up => segment.next_up(bits),
            Direction::Down => segment.next_down(bits),
        }
    }

    fn step(self, bits: u64, delta: u64) -> Option<u64> {
        match self {
            Direction::Up => bits.checked_add(delta),
            Direction::Down => bits.checked_sub(delta),
        }
    }

    /// Whether `candidate` lies on this direction's side of `reference`.
    fn reaches(self, candidate: u64, reference: u64) -> bool {
        match self {
            Direction::Up => candidate >= reference,
            Direction::Down => candidate <= reference,
        }
    }
}

/// OR of every segment's largest (or smallest) legal value.
fn extreme(segments: &[RangeSegment], largest: bool) -> u64 {
    segments.iter().fold(0, |acc, s| {
        acc | if largest { s.max() } else { s.min() }
    })
}

/// Fill for the segments below one that moved: smallest after moving up,
/// largest after moving down.
fn fill_below(rest: &[RangeSegment], candidate: u64, bits: u64) -> u64 {
    match candidate.cmp(&bits) {
        Ordering::Greater => extreme(rest, false),
        _ => extreme(rest, true),
    }
}

fn search(written: u64, segments: &[RangeSegment], direction: Direction, resolved: u64) -> u64 {
    let Some((segment, rest)) = segments.split_first() else {
        return 0;
    };
    let bits = written & segment.mask;
    let candidate = direction.resolve(segment, bits);
    if candidate != bits {
        return candidate | fill_below(rest, candidate, bits);
    }

    let value = candidate | search(written, rest, direction, resolved | segment.mask);
    let remainder = written & covered_mask(segments) & !resolved;
    if direction.reaches(value, remainder) {
        return value;
    }

    // The lower segments could not stay on this side of the written value:
    // move this segment by one step and fill below with the extreme.
    match direction.step(bits, segment.delta) {
        Some(stepped) => {
            let moved = direction.resolve(segment, stepped);
            if moved != bits && direction.reaches(moved, bits) {
                moved | fill_below(rest, moved, bits)
            } else {
                value
            }
        }
        None => value,
    }
}

fn nearest(written: u64, segments: &[RangeSegment], tie: TieBreak, resolved: u64) -> u64 {
    let up = search(written, segments, Direction::Up, resolved);
    let down = search(written, segments, Direction::Down, resolved);
    if up == down {
        return up;
    }
    let target = written & covered_mask(segments) & !resolved;
    closer(target, up, down, tie)
}

/// Resolves `written` into the legal values described by `segments`.
///
/// `segments` must be ordered most-significant mask first. `resolved` holds
/// bit positions already settled by an enclosing search and is zero for a
/// top-level call. `width` is the field width, used only by
/// [`ResolutionMode::AddressFixup`].
pub fn legalize_segments(
    current: u64,
    written: u64,
    segments: &[RangeSegment],
    mode: ResolutionMode,
    resolved: u64,
    width: u32,
) -> u64 {
    match mode {
        ResolutionMode::Unchanged => current & covered_mask(segments),
        ResolutionMode::Largest => extreme(segments, true),
        ResolutionMode::Smallest => extreme(segments, false),
        ResolutionMode::NextUp => search(written, segments, Direction::Up, resolved),
        ResolutionMode::NextDown => search(written, segments, Direction::Down, resolved),
        ResolutionMode::NearestUp => nearest(written, segments, TieBreak::Up, resolved),
        ResolutionMode::NearestDown => nearest(written, segments, TieBreak::Down, resolved),
        ResolutionMode::AddressFixup => written ^ (1u64 << (width.clamp(1, 64) - 1)),
    }
}
