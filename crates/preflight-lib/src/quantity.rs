//! Resource quantities
//!
//! Parses and compares Kubernetes-style resource quantities such as `"4"`,
//! `"500m"`, `"100Gi"` or `"1e3"`. Values are held exactly in nano-units;
//! anything finer than one nano-unit rounds up.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Nano-units per whole unit
const NANOS_PER_UNIT: i128 = 1_000_000_000;

/// Largest power of ten that fits in an i128
const MAX_POW10: i32 = 38;

const BINARY_SUFFIXES: [(u32, &str); 6] = [
    (10, "Ki"),
    (20, "Mi"),
    (30, "Gi"),
    (40, "Ti"),
    (50, "Pi"),
    (60, "Ei"),
];

const DECIMAL_SUFFIXES: [(i32, &str); 10] = [
    (-9, "n"),
    (-6, "u"),
    (-3, "m"),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
    (18, "E"),
    (0, ""),
];

/// Errors raised while parsing a quantity string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("invalid number in quantity {0:?}")]
    InvalidNumber(String),

    #[error("unknown suffix {suffix:?} in quantity {input:?}")]
    UnknownSuffix { input: String, suffix: String },

    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),
}

/// Suffix family a quantity was written in, used when rendering it back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuantityFormat {
    #[default]
    DecimalSI,
    BinarySI,
    DecimalExponent,
}

#[derive(Debug, Clone, Copy)]
enum Scale {
    Binary(u32),
    Decimal(i32),
    Exponent(i32),
}

impl Scale {
    fn from_suffix(suffix: &str) -> Option<Self> {
        if let Some((power, _)) = BINARY_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
            return Some(Scale::Binary(*power));
        }
        if let Some((exp, _)) = DECIMAL_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
            return Some(Scale::Decimal(*exp));
        }
        let exponent = suffix.strip_prefix(|c| c == 'e' || c == 'E')?;
        exponent.parse::<i32>().ok().map(Scale::Exponent)
    }

    fn format(self) -> QuantityFormat {
        match self {
            Scale::Binary(_) => QuantityFormat::BinarySI,
            Scale::Decimal(_) => QuantityFormat::DecimalSI,
            Scale::Exponent(_) => QuantityFormat::DecimalExponent,
        }
    }
}

/// A parsed, comparable resource measurement
///
/// Equality and ordering consider only the value, so `"1Gi"` equals
/// `"1073741824"`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    /// The zero quantity
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse a quantity string
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        if input.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, unsigned) = match input.as_bytes()[0] {
            b'-' => (true, &input[1..]),
            b'+' => (false, &input[1..]),
            _ => (false, input),
        };

        let number_len = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(number_len);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(QuantityError::InvalidNumber(input.to_string()));
        }

        let scale = Scale::from_suffix(suffix).ok_or_else(|| QuantityError::UnknownSuffix {
            input: input.to_string(),
            suffix: suffix.to_string(),
        })?;

        let magnitude = to_nanos(whole, fraction, scale)
            .ok_or_else(|| QuantityError::OutOfRange(input.to_string()))?;

        Ok(Self {
            nanos: if negative { -magnitude } else { magnitude },
            format: scale.format(),
        })
    }

    /// Value in nano-units
    pub fn as_nanos(&self) -> i128 {
        self.nanos
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn format(&self) -> QuantityFormat {
        self.format
    }
}

fn pow10(exp: i32) -> Option<i128> {
    u32::try_from(exp).ok().and_then(|e| 10i128.checked_pow(e))
}

/// Divide a non-negative value by 10^exp, rounding up
fn div_ceil_pow10(value: i128, exp: i32) -> Option<i128> {
    if exp > MAX_POW10 {
        return Some(if value == 0 { 0 } else { 1 });
    }
    let divisor = pow10(exp)?;
    let quotient = value / divisor;
    Some(if value % divisor == 0 {
        quotient
    } else {
        quotient + 1
    })
}

fn to_nanos(whole: &str, fraction: &str, scale: Scale) -> Option<i128> {
    let mantissa: i128 = format!("{whole}{fraction}").parse().ok()?;
    let fraction_len = i32::try_from(fraction.len()).ok()?;

    match scale {
        Scale::Binary(power) => {
            let scaled = mantissa
                .checked_mul(1i128.checked_shl(power)?)?
                .checked_mul(NANOS_PER_UNIT)?;
            div_ceil_pow10(scaled, fraction_len)
        }
        Scale::Decimal(exp) | Scale::Exponent(exp) => {
            let shift = exp.checked_add(9)?.checked_sub(fraction_len)?;
            if shift >= 0 {
                mantissa.checked_mul(pow10(shift)?)
            } else {
                div_ceil_pow10(mantissa, -shift)
            }
        }
    }
}

/// Render whole units with the largest decimal suffix that divides exactly
fn decimal_suffix(units: u128) -> (u128, &'static str) {
    for (exp, suffix) in DECIMAL_SUFFIXES.iter().filter(|(e, _)| *e > 0).rev() {
        let base = 10u128.pow(*exp as u32);
        if units % base == 0 {
            return (units / base, *suffix);
        }
    }
    (units, "")
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.nanos < 0 { "-" } else { "" };
        let nanos = self.nanos.unsigned_abs();
        let per_unit = NANOS_PER_UNIT as u128;

        if nanos % per_unit != 0 {
            let (value, suffix) = if nanos % 1_000_000 == 0 {
                (nanos / 1_000_000, "m")
            } else if nanos % 1_000 == 0 {
                (nanos / 1_000, "u")
            } else {
                (nanos, "n")
            };
            return write!(f, "{sign}{value}{suffix}");
        }

        let units = nanos / per_unit;
        if units == 0 {
            return f.write_str("0");
        }

        match self.format {
            QuantityFormat::BinarySI => {
                for (power, suffix) in BINARY_SUFFIXES.iter().rev() {
                    let base = 1u128 << power;
                    if units % base == 0 {
                        return write!(f, "{sign}{}{suffix}", units / base);
                    }
                }
                let (value, suffix) = decimal_suffix(units);
                write!(f, "{sign}{value}{suffix}")
            }
            QuantityFormat::DecimalSI => {
                let (value, suffix) = decimal_suffix(units);
                write!(f, "{sign}{value}{suffix}")
            }
            QuantityFormat::DecimalExponent => {
                let mut value = units;
                let mut exp = 0;
                while value % 1_000 == 0 {
                    value /= 1_000;
                    exp += 3;
                }
                if exp == 0 {
                    write!(f, "{sign}{value}")
                } else {
                    write!(f, "{sign}{value}e{exp}")
                }
            }
        }
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.to_string()
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    /// Saturating addition; a zero left-hand side adopts the right-hand format
    fn add(self, rhs: Self) -> Self::Output {
        Quantity {
            nanos: self.nanos.saturating_add(rhs.nanos),
            format: if self.is_zero() { rhs.format } else { self.format },
        }
    }
}
