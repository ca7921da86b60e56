// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Bus value literals and bit vectors.
//!
//! A bit vector here is always stored least-significant bit first,
//! i.e. `bits[0]` is bit 0 of the value.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// The radix used for bare (unprefixed) bus value literals.
///
/// GTKWave timing dumps write bus values as bare hex, so that is
/// the default.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radix {
    Bin,
    Dec,
    #[default]
    Hex,
}

impl FromStr for Radix {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bin" | "binary" | "b" => Ok(Radix::Bin),
            "dec" | "decimal" | "d" => Ok(Radix::Dec),
            "hex" | "hexadecimal" | "h" => Ok(Radix::Hex),
            _ => Err(format!("unknown radix `{}` (expected hex, dec or bin)", s))
        }
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Radix::Bin => "bin",
            Radix::Dec => "dec",
            Radix::Hex => "hex",
        })
    }
}

/// A value literal split into its radix and digit string.
///
/// `0x` and the verilog-style `'h`, `'d`, `'b` prefixes are always
/// recognized. `0b` is only a binary prefix in documents whose bare
/// radix is not hex, where `0B` is a plain hex value.
/// Returns None if the literal has none of the known lexical forms.
fn classify(literal: &str, bare: Radix) -> Option<(Radix, &str)> {
    let s = literal.trim();
    let prefixed = |p: &str| {
        s.strip_prefix(p).or_else(|| s.strip_prefix(&p.to_ascii_uppercase()[..]))
    };
    let (radix, digits) = if let Some(d) = prefixed("0x").or_else(|| prefixed("'h")) {
        (Radix::Hex, d)
    }
    else if let Some(d) = prefixed("'d") {
        (Radix::Dec, d)
    }
    else if let Some(d) = prefixed("'b") {
        (Radix::Bin, d)
    }
    else if let (true, Some(d)) = (bare != Radix::Hex, prefixed("0b")) {
        (Radix::Bin, d)
    }
    else {
        (bare, s)
    };
    // underscores are digit separators, as in verilog literals.
    let valid = !digits.is_empty() && digits.chars().any(|c| c != '_') &&
        digits.chars().all(|c| c == '_' || match radix {
            Radix::Bin => matches!(c, '0' | '1'),
            Radix::Dec => c.is_ascii_digit(),
            Radix::Hex => c.is_ascii_hexdigit(),
        });
    valid.then_some((radix, digits))
}

/// Number of bits a literal is assumed to encode when no explicit
/// range is available.
///
/// Hex digits count 4 bits each and binary digits 1 bit each.
/// Decimal literals count the bit length of their value.
/// Unrecognized literals hint 0 bits.
pub fn literal_width_hint(literal: &str, bare: Radix) -> usize {
    let Some((radix, digits)) = classify(literal, bare) else {
        return 0
    };
    let ndigits = digits.chars().filter(|&c| c != '_').count();
    match radix {
        Radix::Hex => 4 * ndigits,
        Radix::Bin => ndigits,
        Radix::Dec => {
            let v = decimal_bits(digits, usize::MAX);
            match v.iter().rposition(|&b| b) {
                Some(msb) => msb + 1,
                None => 1
            }
        }
    }
}

/// Decode a literal to exactly `width` bits (LSB first).
///
/// Short values are zero-extended and long values are truncated,
/// both at the most-significant end.
/// Literals of no known form decode to all zeros.
pub fn decode_literal(literal: &str, width: usize, bare: Radix) -> Vec<bool> {
    let Some((radix, digits)) = classify(literal, bare) else {
        return vec![false; width]
    };
    let mut bits = match radix {
        Radix::Bin => digits.chars().rev()
            .filter(|&c| c != '_')
            .map(|c| c == '1')
            .collect::<Vec<_>>(),
        Radix::Hex => digits.chars().rev()
            .filter_map(|c| c.to_digit(16))
            .flat_map(|d| (0..4).map(move |i| (d >> i) & 1 == 1))
            .collect(),
        Radix::Dec => decimal_bits(digits, width),
    };
    bits.resize(width, false);
    bits
}

/// Convert a decimal digit string to bits without an integer size
/// limit, keeping at most `max_bits` low bits.
fn decimal_bits(digits: &str, max_bits: usize) -> Vec<bool> {
    // little-endian base 2^32 limbs
    let mut limbs: Vec<u32> = vec![];
    for d in digits.chars().filter_map(|c| c.to_digit(10)) {
        let mut carry = d as u64;
        for limb in limbs.iter_mut() {
            let v = *limb as u64 * 10 + carry;
            *limb = v as u32;
            carry = v >> 32;
        }
        if carry != 0 {
            limbs.push(carry as u32);
        }
    }
    let mut bits = Vec::new();
    'outer: for limb in limbs {
        for i in 0..32 {
            if bits.len() >= max_bits { break 'outer }
            bits.push((limb >> i) & 1 == 1);
        }
    }
    while bits.last() == Some(&false) {
        bits.pop();
    }
    bits
}

/// An inclusive `[msb:lsb]` bus range as written in a bus name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusRange {
    pub msb: u32,
    pub lsb: u32,
}

/// Widest bus expanded bit by bit. Wider buses are kept as one node.
pub const MAX_BUS_WIDTH: usize = 4096;

impl BusRange {
    /// Number of bits covered. Computed in `u64`, so `[u32::MAX:0]`
    /// does not overflow.
    #[inline]
    pub fn width(self) -> u64 {
        self.msb.abs_diff(self.lsb) as u64 + 1
    }

    /// The lowest absolute index covered by this range.
    #[inline]
    pub fn low(self) -> u32 {
        self.msb.min(self.lsb)
    }
}

/// The suffix form of a bus or signal name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NameSuffix<'i> {
    /// `base[msb:lsb]`
    Range(&'i str, BusRange),
    /// `base[idx]`
    Index(&'i str, u32),
    /// anything else.
    Plain(&'i str),
}

/// Split a name into its base and trailing bracket suffix.
pub fn split_name(name: &str) -> NameSuffix<'_> {
    let name = name.trim();
    let Some(body) = name.strip_suffix(']') else {
        return NameSuffix::Plain(name)
    };
    let Some(open) = body.rfind('[') else {
        return NameSuffix::Plain(name)
    };
    let base = body[..open].trim_end();
    let inner = &body[open + 1..];
    if base.is_empty() {
        return NameSuffix::Plain(name)
    }
    match inner.split_once(':') {
        Some((a, b)) => match (a.trim().parse(), b.trim().parse()) {
            (Ok(msb), Ok(lsb)) => NameSuffix::Range(base, BusRange { msb, lsb }),
            _ => NameSuffix::Plain(name)
        },
        None => match inner.trim().parse() {
            Ok(idx) => NameSuffix::Index(base, idx),
            Err(_) => NameSuffix::Plain(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_to_u128(bits: &[bool]) -> u128 {
        bits.iter().take(128).enumerate()
            .fold(0, |acc, (i, &b)| acc | ((b as u128) << i))
    }

    #[test]
    fn hex_decodes_lsb_first() {
        assert_eq!(decode_literal("5", 4, Radix::Hex),
                   vec![true, false, true, false]);
        assert_eq!(decode_literal("0F", 8, Radix::Hex),
                   vec![true, true, true, true, false, false, false, false]);
        assert_eq!(decode_literal("0xa", 4, Radix::Dec),
                   vec![false, true, false, true]);
    }

    #[test]
    fn decimal_and_binary_forms() {
        assert_eq!(decode_literal("5", 4, Radix::Dec),
                   vec![true, false, true, false]);
        assert_eq!(decode_literal("12", 4, Radix::Dec),
                   vec![false, false, true, true]);
        assert_eq!(decode_literal("0b0110", 4, Radix::Dec),
                   vec![false, true, true, false]);
        assert_eq!(decode_literal("'b11", 2, Radix::Hex), vec![true, true]);
        // in hex documents `0B` is eleven, not an empty binary literal.
        assert_eq!(decode_literal("0B", 4, Radix::Hex),
                   vec![true, true, false, true]);
        assert_eq!(decode_literal("110", 3, Radix::Bin),
                   vec![false, true, true]);
    }

    #[test]
    fn pads_and_truncates_at_msb() {
        assert_eq!(decode_literal("1", 3, Radix::Hex), vec![true, false, false]);
        // 0x1F truncated to 3 bits keeps the low bits.
        assert_eq!(decode_literal("1F", 3, Radix::Hex), vec![true, true, true]);
        assert_eq!(decode_literal("0b1000", 3, Radix::Dec), vec![false; 3]);
    }

    #[test]
    fn malformed_literals_are_zero() {
        assert_eq!(decode_literal("zz", 4, Radix::Hex), vec![false; 4]);
        assert_eq!(decode_literal("", 2, Radix::Hex), vec![false; 2]);
        assert_eq!(decode_literal("0x", 2, Radix::Hex), vec![false; 2]);
        assert_eq!(decode_literal("1F", 8, Radix::Dec), vec![false; 8]);
        assert_eq!(decode_literal("102", 4, Radix::Bin), vec![false; 4]);
    }

    #[test]
    fn hex_value_survives_bits() {
        for (lit, width, val) in [("0F", 8, 0x0f), ("DEAD", 16, 0xdead),
                                  ("1ff", 8, 0xff), ("7", 2, 3)] {
            let bits = decode_literal(lit, width, Radix::Hex);
            assert_eq!(bits.len(), width);
            assert_eq!(bits_to_u128(&bits), val, "literal {}", lit);
        }
    }

    #[test]
    fn long_decimal_literal() {
        let bits = decode_literal("340282366920938463463374607431768211455", 128, Radix::Dec);
        assert!(bits.iter().all(|&b| b));
        assert_eq!(literal_width_hint("340282366920938463463374607431768211455", Radix::Dec), 128);
    }

    #[test]
    fn width_hints() {
        assert_eq!(literal_width_hint("0F", Radix::Hex), 8);
        assert_eq!(literal_width_hint("0x123", Radix::Dec), 12);
        assert_eq!(literal_width_hint("0b101", Radix::Dec), 3);
        assert_eq!(literal_width_hint("0b101", Radix::Hex), 20);
        assert_eq!(literal_width_hint("5", Radix::Dec), 3);
        assert_eq!(literal_width_hint("0", Radix::Dec), 1);
        assert_eq!(literal_width_hint("xyz", Radix::Hex), 0);
    }

    #[test]
    fn name_suffixes() {
        assert_eq!(split_name("A[3:0]"),
                   NameSuffix::Range("A", BusRange { msb: 3, lsb: 0 }));
        assert_eq!(split_name("ui_in[7:4]"),
                   NameSuffix::Range("ui_in", BusRange { msb: 7, lsb: 4 }));
        assert_eq!(split_name("d[3]"), NameSuffix::Index("d", 3));
        assert_eq!(split_name("clk"), NameSuffix::Plain("clk"));
        assert_eq!(split_name("x[a:b]"), NameSuffix::Plain("x[a:b]"));
        assert_eq!(split_name("[3:0]"), NameSuffix::Plain("[3:0]"));
        let r = BusRange { msb: 0, lsb: 7 };
        assert_eq!(r.width(), 8);
        let r = BusRange { msb: u32::MAX, lsb: 0 };
        assert_eq!(r.width(), u32::MAX as u64 + 1);
        assert_eq!(r.low(), 0);
    }
}
