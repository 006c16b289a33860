// Licensed under the Apache-2.0 license

//! Lowering of register definitions into [`RegisterSpec`]s.

use crate::definition::{Definition, FieldDef, LayoutDef, RegisterDef, WarlDef};
use crate::error::{WarlError, WarlResult};
use crate::legal::{parse_illegal, parse_legal, Action, GuardTerm, SetOp, SetTerm};
use crate::range::{complement, BitmaskSpec, LegalSet, RangeEntry, RangeSegment};
use crate::types::{
    FallbackRule, FieldKind, FieldRef, FieldSpec, LegalClause, Predicate, PredicateTerm,
    RegisterShape, RegisterSpec, Resolution, ShadowMode, ShadowSpec, WarlRule, Xlen,
};
use crate::util::{bit_mask, low_bits};

/// Name given to the value of a scalar register.
pub(crate) const SCALAR_FIELD: &str = "value";

/// Register/field pair errors are reported against.
struct Site<'a> {
    register: &'a str,
    field: &'a str,
}

impl Site<'_> {
    fn out_of_range(&self, msb: u32, lsb: u32, width: u32) -> WarlError {
        WarlError::FieldOutOfRange {
            register: self.register.to_string(),
            field: self.field.to_string(),
            msb,
            lsb,
            width,
        }
    }

    fn value_out_of_range(&self, value: u64, mask: u64) -> WarlError {
        WarlError::ValueOutOfRange {
            register: self.register.to_string(),
            field: self.field.to_string(),
            value,
            mask,
        }
    }

    fn syntax(&self, text: &str, message: impl Into<String>) -> WarlError {
        WarlError::Syntax {
            register: self.register.to_string(),
            field: self.field.to_string(),
            text: text.to_string(),
            message: message.into(),
        }
    }

    fn empty(&self) -> WarlError {
        WarlError::EmptyRange {
            register: self.register.to_string(),
            field: self.field.to_string(),
        }
    }

    fn mixed(&self) -> WarlError {
        WarlError::MixedRepresentation {
            register: self.register.to_string(),
            field: self.field.to_string(),
        }
    }

    fn unresolved(&self, dependency: &str) -> WarlError {
        WarlError::UnresolvedDependency {
            register: self.register.to_string(),
            field: self.field.to_string(),
            dependency: dependency.to_string(),
        }
    }

    fn check_slice(&self, msb: u32, lsb: u32, width: u32) -> WarlResult<()> {
        if lsb > msb || msb >= width {
            return Err(self.out_of_range(msb, lsb, width));
        }
        Ok(())
    }
}

/// Lowers `register` for `xlen`, resolving dependencies against
/// `definition`.
pub(crate) fn lower_register(
    definition: &Definition,
    register: &RegisterDef,
    layout: &LayoutDef,
    xlen: Xlen,
) -> WarlResult<RegisterSpec> {
    let shape = match (&layout.scalar, layout.fields.is_empty()) {
        (Some(_), false) => {
            return Err(WarlError::InvalidDefinition {
                register: register.name.clone(),
                message: "a layout cannot declare both fields and a scalar".to_string(),
            })
        }
        (Some(scalar), true) => {
            RegisterShape::Scalar(lower_scalar(definition, register, scalar, xlen)?)
        }
        (None, true) => RegisterShape::Scalar(FieldSpec {
            name: SCALAR_FIELD.to_string(),
            msb: xlen.bits() - 1,
            lsb: 0,
            kind: FieldKind::Plain,
        }),
        (None, false) => RegisterShape::Fields(lower_fields(definition, register, layout, xlen)?),
    };
    let width = match &shape {
        RegisterShape::Fields(_) => xlen.bits(),
        RegisterShape::Scalar(field) => field.msb + 1,
    };
    Ok(RegisterSpec {
        name: register.name.clone(),
        address: register.address,
        privilege: register.privilege,
        reset_value: register.reset_value,
        width,
        shape,
    })
}

fn lower_scalar(
    definition: &Definition,
    register: &RegisterDef,
    scalar: &FieldDef,
    xlen: Xlen,
) -> WarlResult<FieldSpec> {
    let name = if scalar.name.is_empty() {
        SCALAR_FIELD
    } else {
        scalar.name.as_str()
    };
    let site = Site {
        register: &register.name,
        field: name,
    };
    site.check_slice(scalar.msb, scalar.lsb, xlen.bits())?;
    let kind = if scalar.implemented {
        lower_kind(definition, &site, scalar, xlen)?
    } else {
        log::warn!("{}: scalar is not implemented, value is preserved", register.name);
        FieldKind::ReadOnlyVariable
    };
    Ok(FieldSpec {
        name: name.to_string(),
        msb: scalar.msb,
        lsb: scalar.lsb,
        kind,
    })
}

fn lower_fields(
    definition: &Definition,
    register: &RegisterDef,
    layout: &LayoutDef,
    xlen: Xlen,
) -> WarlResult<Vec<FieldSpec>> {
    for (i, field) in layout.fields.iter().enumerate() {
        if field.name.is_empty() {
            return Err(WarlError::InvalidDefinition {
                register: register.name.clone(),
                message: format!("field {i} has no name"),
            });
        }
        let site = Site {
            register: &register.name,
            field: &field.name,
        };
        site.check_slice(field.msb, field.lsb, xlen.bits())?;
        if let Some(other) = layout.fields[..i]
            .iter()
            .find(|o| o.lsb <= field.msb && field.lsb <= o.msb)
        {
            return Err(WarlError::OverlappingField {
                register: register.name.clone(),
                first: other.name.clone(),
                second: field.name.clone(),
            });
        }
    }

    let mut fields = Vec::new();
    for field in &layout.fields {
        if !field.implemented {
            log::warn!(
                "{}.{}: not implemented, bits [{}:{}] are preserved",
                register.name,
                field.name,
                field.msb,
                field.lsb
            );
            continue;
        }
        let site = Site {
            register: &register.name,
            field: &field.name,
        };
        fields.push(FieldSpec {
            name: field.name.clone(),
            msb: field.msb,
            lsb: field.lsb,
            kind: lower_kind(definition, &site, field, xlen)?,
        });
    }
    Ok(fields)
}

fn lower_kind(
    definition: &Definition,
    site: &Site,
    field: &FieldDef,
    xlen: Xlen,
) -> WarlResult<FieldKind> {
    if let Some(target) = &field.shadow {
        log::trace!("{}.{}: shadow of {target}", site.register, site.field);
        let target = match target.split_once('.') {
            Some((register, field)) => FieldRef {
                register: register.trim().to_string(),
                field: Some(field.trim().to_string()),
            },
            None => FieldRef {
                register: target.trim().to_string(),
                field: None,
            },
        };
        return Ok(FieldKind::Shadow(ShadowSpec {
            target,
            mode: field.shadow_type.unwrap_or(ShadowMode::ReadOnly),
        }));
    }

    let width = field.msb - field.lsb + 1;
    match (&field.warl, field.ro_constant, field.ro_variable) {
        (None, None, false) => Ok(FieldKind::Plain),
        (None, None, true) => Ok(FieldKind::ReadOnlyVariable),
        (None, Some(constant), false) => {
            if constant > low_bits(width) {
                return Err(site.value_out_of_range(constant, low_bits(width)));
            }
            Ok(FieldKind::ReadOnlyConstant(constant))
        }
        (Some(warl), None, false) => Ok(FieldKind::Warl(lower_warl(
            definition, site, warl, width, xlen,
        )?)),
        _ => Err(WarlError::InvalidDefinition {
            register: site.register.to_string(),
            message: format!("field '{}' declares more than one kind", site.field),
        }),
    }
}

fn lower_warl(
    definition: &Definition,
    site: &Site,
    warl: &WarlDef,
    width: u32,
    xlen: Xlen,
) -> WarlResult<WarlRule> {
    if warl.legal.is_empty() {
        return Err(site.empty());
    }

    let mut legal = Vec::new();
    for text in &warl.legal {
        let parsed = parse_legal(text).map_err(|e| site.syntax(text, e.0))?;
        let guard = lower_guard(definition, site, warl, &parsed.guard, xlen, text)?;
        let set = lower_set(site, &parsed.terms, width, text)?;
        legal.push(LegalClause { guard, set });
    }
    let bitmasks = legal
        .iter()
        .filter(|c| matches!(c.set, LegalSet::Bitmask(_)))
        .count();
    if bitmasks != 0 && bitmasks != legal.len() {
        return Err(site.mixed());
    }

    let mut illegal = Vec::new();
    for text in &warl.wr_illegal {
        let parsed = parse_illegal(text).map_err(|e| site.syntax(text, e.0))?;
        let trigger = parsed.guard.iter().find_map(|t| match t {
            GuardTerm::Written(values) => Some(values.clone()),
            GuardTerm::Field { .. } => None,
        });
        if let Some(values) = &trigger {
            check_entries(site, values, u64::MAX, text)?;
        }
        let guard = lower_guard(definition, site, warl, &parsed.guard, xlen, text)?;
        let action = match parsed.action {
            Action::Literal(value) => {
                if value > low_bits(width) {
                    return Err(site.value_out_of_range(value, low_bits(width)));
                }
                Resolution::Literal(value)
            }
            Action::Mode(mode) => Resolution::Resolve(mode),
        };
        illegal.push(FallbackRule {
            guard,
            trigger,
            action,
        });
    }

    Ok(WarlRule { legal, illegal })
}

/// Rejects reversed intervals and values above `max`.
fn check_entries(site: &Site, entries: &[RangeEntry], max: u64, text: &str) -> WarlResult<()> {
    for entry in entries {
        if entry.lower() > entry.upper() {
            return Err(site.syntax(
                text,
                format!("interval {:#x}:{:#x} is reversed", entry.lower(), entry.upper()),
            ));
        }
        if entry.upper() > max {
            return Err(site.value_out_of_range(entry.upper(), max));
        }
    }
    Ok(())
}

fn shifted(entries: &[RangeEntry], lsb: u32) -> Vec<RangeEntry> {
    entries
        .iter()
        .map(|e| match *e {
            RangeEntry::Value(v) => RangeEntry::Value(v << lsb),
            RangeEntry::Interval(lo, hi) => RangeEntry::Interval(lo << lsb, hi << lsb),
        })
        .collect()
}

fn lower_set(site: &Site, terms: &[SetTerm], width: u32, text: &str) -> WarlResult<LegalSet> {
    let mut segments = Vec::new();
    let mut bitmask = None;
    for term in terms {
        site.check_slice(term.msb, term.lsb, width)?;
        let slice_max = low_bits(term.msb - term.lsb + 1);
        match term.op {
            SetOp::Bitmask => {
                let (mask, default) = match term.values.as_slice() {
                    [RangeEntry::Value(mask), RangeEntry::Value(default)] => (*mask, *default),
                    _ => return Err(site.syntax(text, "bitmask takes [mask, default]")),
                };
                if bitmask.is_some() {
                    return Err(site.syntax(text, "only one bitmask term is allowed"));
                }
                for value in [mask, default] {
                    if value > slice_max {
                        return Err(site.value_out_of_range(value, slice_max));
                    }
                }
                bitmask = Some(BitmaskSpec {
                    mask: mask << term.lsb,
                    default: default << term.lsb,
                });
            }
            SetOp::In | SetOp::NotIn => {
                check_entries(site, &term.values, slice_max, text)?;
                let mask = bit_mask(term.msb, term.lsb);
                let mut values = shifted(&term.values, term.lsb);
                if term.op == SetOp::NotIn {
                    values = complement(&values, mask);
                }
                let segment =
                    RangeSegment::new(mask, 1 << term.lsb, values).map_err(|_| site.empty())?;
                segments.push(segment);
            }
        }
    }
    match (bitmask, segments.is_empty()) {
        (Some(bitmask), true) => Ok(LegalSet::Bitmask(bitmask)),
        (Some(_), false) => Err(site.mixed()),
        (None, _) => Ok(LegalSet::from_segments(segments)),
    }
}

/// Resolves a dependency name to `(register, base bit, container width)`.
fn resolve_dependency<'d>(
    definition: &'d Definition,
    site: &Site,
    warl: &WarlDef,
    name: &str,
    xlen: Xlen,
) -> WarlResult<(&'d str, u32, u32)> {
    let entry = warl
        .dependency_fields
        .iter()
        .find(|d| {
            d.rsplit("::")
                .next()
                .is_some_and(|leaf| leaf.trim().eq_ignore_ascii_case(name))
        })
        .ok_or_else(|| site.unresolved(name))?;

    let (register_name, field_name) = match entry.split_once("::") {
        Some((register, field)) => (register.trim(), Some(field.trim())),
        None => (entry.trim(), None),
    };
    let register = definition
        .register(register_name)
        .ok_or_else(|| site.unresolved(entry))?;
    let layout = register.layout(xlen).ok_or_else(|| site.unresolved(entry))?;

    match (field_name, &layout.scalar) {
        (None, Some(scalar)) => Ok((&register.name, 0, scalar.msb + 1)),
        (None, None) => Ok((&register.name, 0, xlen.bits())),
        (Some(field_name), _) => {
            let field = layout
                .fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(field_name))
                .ok_or_else(|| site.unresolved(entry))?;
            Ok((&register.name, field.lsb, field.msb - field.lsb + 1))
        }
    }
}

fn lower_guard(
    definition: &Definition,
    site: &Site,
    warl: &WarlDef,
    guard: &[GuardTerm],
    xlen: Xlen,
    text: &str,
) -> WarlResult<Option<Predicate>> {
    let mut terms = Vec::new();
    for term in guard {
        let GuardTerm::Field {
            name,
            msb,
            lsb,
            negated,
            values,
        } = term
        else {
            continue;
        };
        let (register, base, container) = resolve_dependency(definition, site, warl, name, xlen)?;
        if lsb > msb || *msb >= container {
            return Err(site.out_of_range(*msb, *lsb, container));
        }
        let slice_max = low_bits(msb - lsb + 1);
        check_entries(site, values, slice_max, text)?;
        let values = if *negated {
            complement(values, slice_max)
        } else {
            values.clone()
        };
        terms.push(PredicateTerm {
            register: register.to_string(),
            msb: base + msb,
            lsb: base + lsb,
            values,
        });
    }
    Ok((!terms.is_empty()).then_some(Predicate { terms }))
}
