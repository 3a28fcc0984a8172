use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const INR_CURRENCY_CODE: &str = "INR";

const PAISE_PER_RUPEE: i64 = 100;

//--------------------------------------        Paise        ---------------------------------------------------------
/// A fixed-point rupee amount, stored as an integer number of paise so that no floating point ever touches money.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Paise(i64);

op!(binary Paise, Add, add);
op!(binary Paise, Sub, sub);
op!(inplace Paise, AddAssign, add_assign);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as a rupee amount: {0}")]
pub struct PaiseConversionError(String);

impl From<i64> for Paise {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Paise {
    type Error = PaiseConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| PaiseConversionError(format!("{value} paise is too large to represent")))
    }
}

impl Paise {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * PAISE_PER_RUPEE)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The amount in the form the gateway expects: whole rupees without a fraction (`"500"`), otherwise exactly two
    /// decimal places (`"500.50"`).
    pub fn to_rupee_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let rupees = abs / PAISE_PER_RUPEE as u64;
        let paise = abs % PAISE_PER_RUPEE as u64;
        if paise == 0 {
            format!("{sign}{rupees}")
        } else {
            format!("{sign}{rupees}.{paise:02}")
        }
    }
}

impl Display for Paise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₹{}.{:02}", abs / PAISE_PER_RUPEE as u64, abs % PAISE_PER_RUPEE as u64)
    }
}

/// Parses a rupee amount such as `"500"`, `"500.5"` or `"500.50"`. More than two decimal places, signs, exponents and
/// empty strings are rejected.
impl FromStr for Paise {
    type Err = PaiseConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || PaiseConversionError(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) || (s.contains('.') && frac.is_empty()) {
            return Err(err());
        }
        let rupees = whole.parse::<i64>().map_err(|_| err())?;
        let paise = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse::<i64>().map_err(|_| err())?,
        };
        rupees.checked_mul(PAISE_PER_RUPEE).and_then(|v| v.checked_add(paise)).map(Self).ok_or_else(err)
    }
}
