//! Fixed-precision asset amounts.
//!
//! All monetary quantities are integers scaled by a per-symbol precision
//! (4 decimal places in the default deployment). **Never use f64 for
//! financial calculations** — fee math converts to `Decimal` and truncates
//! toward zero, so a discount is never rounded in the payer's favor.
//!
//! The canonical string form (`"311.0000 CORE"`) matters beyond display:
//! it is the digest form of an asset in signed transfer payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AuthError, Result};

/// Largest representable raw amount, mirroring common ledger limits.
pub const MAX_RAW_AMOUNT: i64 = (1 << 62) - 1;

/// An asset symbol: code plus decimal precision.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: String,
    precision: u8,
}

impl Symbol {
    /// Create a new symbol.
    pub fn new(code: impl Into<String>, precision: u8) -> Self {
        Self {
            code: code.into(),
            precision,
        }
    }

    /// The symbol code (e.g. `"CORE"`).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Number of decimal places in the canonical string form.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// A code of 1-7 uppercase ASCII letters with a workable precision.
    pub fn is_valid(&self) -> bool {
        !self.code.is_empty()
            && self.code.len() <= 7
            && self.code.bytes().all(|b| b.is_ascii_uppercase())
            && self.precision <= 12
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// An integer asset quantity scaled by its symbol's precision.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    /// Create from a raw (already scaled) amount.
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// Zero of the given symbol.
    pub fn zero(symbol: Symbol) -> Self {
        Self::new(0, symbol)
    }

    /// Raw scaled amount.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// The asset's symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Whether the amount is within ledger range and the symbol well formed.
    pub fn is_valid(&self) -> bool {
        self.symbol.is_valid() && self.amount > -MAX_RAW_AMOUNT && self.amount < MAX_RAW_AMOUNT
    }

    /// Whether the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Checked addition; `None` on overflow or symbol mismatch.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if self.symbol != other.symbol {
            return None;
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.symbol.clone()))
    }

    /// Checked subtraction; `None` on overflow or symbol mismatch.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        if self.symbol != other.symbol {
            return None;
        }
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Self::new(amount, self.symbol.clone()))
    }

    /// Exact decimal view of the scaled amount (e.g. raw `3_110_000` at
    /// precision 4 becomes `311.0000`).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, u32::from(self.symbol.precision))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.symbol.precision as usize;
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if precision == 0 {
            return write!(f, "{}{} {}", sign, magnitude, self.symbol.code);
        }
        let unit = match 10u64.checked_pow(self.symbol.precision as u32) {
            Some(unit) => unit,
            // precision too large to scale; render the raw amount
            None => return write!(f, "{}{} {}", sign, magnitude, self.symbol.code),
        };
        let integral = magnitude / unit;
        let fractional = magnitude % unit;
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            integral,
            fractional,
            self.symbol.code,
            width = precision
        )
    }
}

impl FromStr for Asset {
    type Err = AuthError;

    /// Parse the canonical form, inferring precision from the fractional
    /// digit count: `"500.0000 CORE"` parses to raw `5_000_000` at
    /// precision 4.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AuthError::InvalidArgument(format!("malformed asset: {s:?}"));

        let mut parts = s.split_whitespace();
        let quantity = parts.next().ok_or_else(invalid)?;
        let code = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let (negative, quantity) = match quantity.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, quantity),
        };
        let (integral, fractional) = match quantity.split_once('.') {
            Some((integral, fractional)) => (integral, fractional),
            None => (quantity, ""),
        };
        if integral.is_empty() && fractional.is_empty() {
            return Err(invalid());
        }
        if !integral.bytes().all(|b| b.is_ascii_digit())
            || !fractional.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let precision = u8::try_from(fractional.len()).map_err(|_| invalid())?;
        let unit = 10i64
            .checked_pow(u32::from(precision))
            .ok_or_else(invalid)?;
        let integral: i64 = if integral.is_empty() {
            0
        } else {
            integral.parse().map_err(|_| invalid())?
        };
        let fractional: i64 = if fractional.is_empty() {
            0
        } else {
            fractional.parse().map_err(|_| invalid())?
        };
        let mut amount = integral
            .checked_mul(unit)
            .and_then(|scaled| scaled.checked_add(fractional))
            .ok_or_else(invalid)?;
        if negative {
            amount = -amount;
        }

        Ok(Self::new(amount, Symbol::new(code, precision)))
    }
}
