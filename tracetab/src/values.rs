// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use std::borrow::Cow;
use std::fmt::{Display, Formatter, Write};

/// Simulation time in the units declared by the `$timescale` command.
pub type Time = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Timescale {
    /// Never interpreted, only the unit ends up in the table.
    pub factor: String,
    /// Kept exactly as it appears in the dump, e.g. `ns`.
    pub unit: String,
}

impl Timescale {
    pub fn new(factor: impl Into<String>, unit: impl Into<String>) -> Self {
        Timescale {
            factor: factor.into(),
            unit: unit.into(),
        }
    }
}

impl Display for Timescale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.factor, self.unit)
    }
}

/// A value as it was recorded by a single scalar or vector change. The encoding is not
/// interpreted beyond stripping the `b` prefix of vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Scalar(char),
    /// bit characters, most significant bit first
    Vector(String),
}

impl Value {
    /// Renders the value for a table cell. Scalars are not affected by the radix.
    pub fn render(&self, radix: Radix) -> Cow<'_, str> {
        match self {
            Value::Scalar(c) => Cow::Owned(c.to_string()),
            Value::Vector(bits) => match radix {
                Radix::Binary => Cow::Borrowed(bits),
                _ if !is_two_state(bits.as_bytes()) => Cow::Borrowed(bits),
                Radix::Decimal => Cow::Owned(bits_to_decimal(bits.as_bytes())),
                Radix::Hexadecimal => Cow::Owned(bits_to_hex(bits.as_bytes())),
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Scalar(c) => write!(f, "{c}"),
            Value::Vector(bits) => write!(f, "b{bits}"),
        }
    }
}

/// How vector values are printed in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Radix {
    Binary,
    #[default]
    Decimal,
    Hexadecimal,
}

#[inline]
fn is_two_state(bits: &[u8]) -> bool {
    !bits.is_empty() && bits.iter().all(|b| matches!(b, b'0' | b'1'))
}

const DECIMAL_LIMB: u64 = 1_000_000_000;

/// Converts a 2-state bit string of arbitrary width into its unsigned decimal representation.
fn bits_to_decimal(bits: &[u8]) -> String {
    debug_assert!(is_two_state(bits));
    // little endian limbs in base 10^9
    let mut limbs: Vec<u32> = vec![0];
    for &bit in bits {
        let mut carry = (bit == b'1') as u64;
        for limb in limbs.iter_mut() {
            let value = (*limb as u64) * 2 + carry;
            *limb = (value % DECIMAL_LIMB) as u32;
            carry = value / DECIMAL_LIMB;
        }
        if carry > 0 {
            limbs.push(carry as u32);
        }
    }
    let mut limbs = limbs.iter().rev();
    let mut out = limbs.next().map(|l| l.to_string()).unwrap_or_default();
    for limb in limbs {
        // writing into a String cannot fail
        let _ = write!(out, "{limb:09}");
    }
    out
}

/// Converts a 2-state bit string into lower case hex digits without leading zeros.
fn bits_to_hex(bits: &[u8]) -> String {
    debug_assert!(is_two_state(bits));
    let padding = (4 - bits.len() % 4) % 4;
    let mut out = String::with_capacity(bits.len() / 4 + 1);
    let mut nibble = 0u32;
    for (ii, &bit) in std::iter::repeat(&b'0')
        .take(padding)
        .chain(bits.iter())
        .enumerate()
    {
        nibble = (nibble << 1) | (bit == b'1') as u32;
        if ii % 4 == 3 {
            if !(out.is_empty() && nibble == 0) {
                out.push(char::from_digit(nibble, 16).unwrap_or('?'));
            }
            nibble = 0;
        }
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}
