// Licensed under the Apache-2.0 license

//! Grammar for WARL legal and illegal-write expressions.
//!
//! ```text
//! legal    := [guard "->"] term+
//! term     := bits ("in" | "not in") list
//!           | bits "bitmask" "[" mask "," default "]"
//! illegal  := [guard "->"] action
//! guard    := cond (("&" | "&&" | "and")? cond)*
//! cond     := name bits ("in" | "not in") list
//!           | "wr_val" "in" list
//! action   := number | mode
//! bits     := "[" n [":" n] "]"
//! list     := "[" entry ("," entry)* "]"
//! entry    := number [":" number]
//! ```
//!
//! Numbers are decimal or `0x`-prefixed hex. The parsers here only recognise
//! syntax; widths, shifting and dependency lookup happen during lowering.

use crate::range::RangeEntry;
use crate::segmented::ResolutionMode;
use thiserror::Error;
use winnow::ascii::{dec_uint, hex_uint, multispace0, multispace1, Caseless};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::token::take_while;
use winnow::{ModalResult, Parser};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SyntaxError(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    In,
    NotIn,
    Bitmask,
}

/// `[msb:lsb] op [values]`, with values as written (relative to the slice).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetTerm {
    pub msb: u32,
    pub lsb: u32,
    pub op: SetOp,
    pub values: Vec<RangeEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardTerm {
    /// `name[msb:lsb] in [..]`; `negated` for `not in`.
    Field {
        name: String,
        msb: u32,
        lsb: u32,
        negated: bool,
        values: Vec<RangeEntry>,
    },
    /// `wr_val in [..]`
    Written(Vec<RangeEntry>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedLegal {
    pub guard: Vec<GuardTerm>,
    pub terms: Vec<SetTerm>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Literal(u64),
    Mode(ResolutionMode),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedIllegal {
    pub guard: Vec<GuardTerm>,
    pub action: Action,
}

fn number(input: &mut &str) -> ModalResult<u64> {
    alt((preceded(alt(("0x", "0X")), hex_uint), dec_uint)).parse_next(input)
}

fn bit_index(input: &mut &str) -> ModalResult<u32> {
    dec_uint.parse_next(input)
}

fn colon(input: &mut &str) -> ModalResult<()> {
    (multispace0, ':', multispace0).void().parse_next(input)
}

fn entry(input: &mut &str) -> ModalResult<RangeEntry> {
    (number, opt(preceded(colon, number)))
        .map(|(lo, hi)| match hi {
            Some(hi) => RangeEntry::Interval(lo, hi),
            None => RangeEntry::Value(lo),
        })
        .parse_next(input)
}

fn list(input: &mut &str) -> ModalResult<Vec<RangeEntry>> {
    delimited(
        ('[', multispace0),
        separated(1.., entry, (multispace0, ',', multispace0)),
        (multispace0, ']'),
    )
    .parse_next(input)
}

/// `[msb:lsb]` or `[bit]`.
fn bits(input: &mut &str) -> ModalResult<(u32, u32)> {
    delimited(
        ('[', multispace0),
        (bit_index, opt(preceded(colon, bit_index))),
        (multispace0, ']'),
    )
    .map(|(msb, lsb)| (msb, lsb.unwrap_or(msb)))
    .parse_next(input)
}

fn set_op(input: &mut &str) -> ModalResult<SetOp> {
    alt((
        (Caseless("not"), multispace1, Caseless("in")).value(SetOp::NotIn),
        Caseless("in").value(SetOp::In),
        Caseless("bitmask").value(SetOp::Bitmask),
    ))
    .parse_next(input)
}

fn set_term(input: &mut &str) -> ModalResult<SetTerm> {
    (bits, multispace0, set_op, multispace0, list)
        .map(|((msb, lsb), _, op, _, values)| SetTerm {
            msb,
            lsb,
            op,
            values,
        })
        .parse_next(input)
}

fn identifier<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn written_term(input: &mut &str) -> ModalResult<GuardTerm> {
    preceded(
        (Caseless("wr_val"), multispace0, Caseless("in"), multispace0),
        list,
    )
    .map(GuardTerm::Written)
    .parse_next(input)
}

fn field_term(input: &mut &str) -> ModalResult<GuardTerm> {
    let name = identifier.parse_next(input)?;
    let (msb, lsb) = preceded(multispace0, bits).parse_next(input)?;
    let op = preceded(
        multispace0,
        alt((
            (Caseless("not"), multispace1, Caseless("in")).value(true),
            Caseless("in").value(false),
        )),
    )
    .parse_next(input)?;
    let values = preceded(multispace0, list).parse_next(input)?;
    Ok(GuardTerm::Field {
        name: name.to_string(),
        msb,
        lsb,
        negated: op,
        values,
    })
}

fn conjunction(input: &mut &str) -> ModalResult<()> {
    alt((
        (multispace0, alt(("&&", "&", Caseless("and"))), multispace0).void(),
        multispace1.void(),
    ))
    .parse_next(input)
}

fn guard_terms(input: &mut &str) -> ModalResult<Vec<GuardTerm>> {
    separated(1.., alt((written_term, field_term)), conjunction).parse_next(input)
}

fn action_term(input: &mut &str) -> ModalResult<Action> {
    alt((
        terminated(number, multispace0).map(Action::Literal),
        identifier.try_map(|name| name.parse::<ResolutionMode>().map(Action::Mode)),
    ))
    .parse_next(input)
}

fn run<'s, O>(
    parser: impl Parser<&'s str, O, ErrMode<ContextError>>,
    text: &'s str,
) -> Result<O, SyntaxError> {
    delimited(multispace0, parser, multispace0)
        .parse(text)
        .map_err(|e| SyntaxError(e.to_string()))
}

/// Splits `guard -> body`, returning the guard text if present.
fn split_guard(text: &str) -> (Option<&str>, &str) {
    match text.split_once("->") {
        Some((guard, body)) => (Some(guard), body),
        None => (None, text),
    }
}

/// Parses a legality clause.
pub fn parse_legal(text: &str) -> Result<ParsedLegal, SyntaxError> {
    let (guard_text, body) = split_guard(text);
    let guard = match guard_text {
        Some(g) => run(guard_terms, g)?,
        None => Vec::new(),
    };
    if guard.iter().any(|t| matches!(t, GuardTerm::Written(_))) {
        return Err(SyntaxError("wr_val is only allowed in illegal-write rules".to_string()));
    }
    let terms: Vec<SetTerm> = run(repeat(1.., preceded(multispace0, set_term)), body)?;
    Ok(ParsedLegal { guard, terms })
}

/// Parses an illegal-write rule.
pub fn parse_illegal(text: &str) -> Result<ParsedIllegal, SyntaxError> {
    let (guard_text, body) = split_guard(text);
    let guard = match guard_text {
        Some(g) => run(guard_terms, g)?,
        None => Vec::new(),
    };
    if guard
        .iter()
        .filter(|t| matches!(t, GuardTerm::Written(_)))
        .count()
        > 1
    {
        return Err(SyntaxError("more than one wr_val trigger".to_string()));
    }
    let action = run(action_term, body)?;
    Ok(ParsedIllegal { guard, action })
}
