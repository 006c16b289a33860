// Licensed under the Apache-2.0 license

//! Bit-slice helpers, plus the identifier and literal forms shared by the
//! assembler and the renderer.

/// Mask with the low `width` bits set. Widths of 64 and above saturate.
///
/// # Examples
/// ```
/// use registers_warl::util::low_bits;
/// assert_eq!(low_bits(0), 0);
/// assert_eq!(low_bits(4), 0xf);
/// assert_eq!(low_bits(64), u64::MAX);
/// ```
pub fn low_bits(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Mask covering bit positions `msb..=lsb`.
///
/// # Examples
/// ```
/// use registers_warl::util::bit_mask;
/// assert_eq!(bit_mask(7, 4), 0xf0);
/// assert_eq!(bit_mask(63, 0), u64::MAX);
/// ```
pub fn bit_mask(msb: u32, lsb: u32) -> u64 {
    low_bits(msb - lsb + 1) << lsb
}

/// Extracts bits `msb..=lsb` of `value`, right-aligned.
pub fn slice(value: u64, msb: u32, lsb: u32) -> u64 {
    (value >> lsb) & low_bits(msb - lsb + 1)
}

/// Replaces bits `msb..=lsb` of `base` with the low bits of `value`.
pub fn insert(base: u64, msb: u32, lsb: u32, value: u64) -> u64 {
    let mask = bit_mask(msb, lsb);
    (base & !mask) | ((value << lsb) & mask)
}

/// Identifier under which a register or field name is rendered.
///
/// Register names match case-insensitively, so identifiers are folded to
/// lowercase. Characters outside `[a-z0-9]` become `_`, and a leading digit
/// gets a `_` prefix.
///
/// # Examples
/// ```
/// use registers_warl::util::identifier;
/// assert_eq!(identifier("MSTATUS"), "mstatus");
/// assert_eq!(identifier("pmp.cfg-0"), "pmp_cfg_0");
/// assert_eq!(identifier("0x7c0"), "_0x7c0");
/// ```
pub fn identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        result.push('_');
    }
    result.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else {
            '_'
        }
    }));
    result
}

/// Bit-vector literal for `value`: lowercase hex with a `0x` prefix.
///
/// # Examples
/// ```
/// use registers_warl::util::hex_literal;
/// assert_eq!(hex_literal(0), "0x0");
/// assert_eq!(hex_literal(0x1800), "0x1800");
/// ```
pub fn hex_literal(value: u64) -> String {
    format!("{value:#x}")
}
