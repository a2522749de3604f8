//! Named relational checks between close price and moving averages.
//!
//! Grammar: `price_above_ma{N}`, `price_below_ma{N}`, `ma{A}_above_ma{B}`,
//! `ma{A}_below_ma{B}`. Comparisons are strict.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A relational check between the close and a moving average, or between two averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaCheck {
    PriceAbove(usize),
    PriceBelow(usize),
    MaAbove(usize, usize),
    MaBelow(usize, usize),
}

impl MaCheck {
    /// MA periods the check reads.
    pub fn periods(&self) -> Vec<usize> {
        match *self {
            MaCheck::PriceAbove(p) | MaCheck::PriceBelow(p) => vec![p],
            MaCheck::MaAbove(a, b) | MaCheck::MaBelow(a, b) => vec![a, b],
        }
    }

    /// Evaluate against a close and the moving averages at the same bar.
    ///
    /// False (never an error) when a referenced average is missing or undefined.
    pub fn holds(&self, close: f64, averages: &BTreeMap<usize, f64>) -> bool {
        let ma = |p: usize| averages.get(&p).copied().filter(|v| v.is_finite());
        match *self {
            MaCheck::PriceAbove(p) => ma(p).is_some_and(|m| close > m),
            MaCheck::PriceBelow(p) => ma(p).is_some_and(|m| close < m),
            MaCheck::MaAbove(a, b) => matches!((ma(a), ma(b)), (Some(x), Some(y)) if x > y),
            MaCheck::MaBelow(a, b) => matches!((ma(a), ma(b)), (Some(x), Some(y)) if x < y),
        }
    }
}

fn parse_period(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&p| p >= 1)
}

impl FromStr for MaCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || format!("unknown moving-average check '{s}'");

        if let Some(rest) = s.strip_prefix("price_above_ma") {
            return parse_period(rest).map(MaCheck::PriceAbove).ok_or_else(unknown);
        }
        if let Some(rest) = s.strip_prefix("price_below_ma") {
            return parse_period(rest).map(MaCheck::PriceBelow).ok_or_else(unknown);
        }

        let rest = s.strip_prefix("ma").ok_or_else(unknown)?;
        let (lhs, rhs, above) = if let Some((l, r)) = rest.split_once("_above_ma") {
            (l, r, true)
        } else if let Some((l, r)) = rest.split_once("_below_ma") {
            (l, r, false)
        } else {
            return Err(unknown());
        };
        let (a, b) = match (parse_period(lhs), parse_period(rhs)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(unknown()),
        };
        if a == b {
            return Err(format!("'{s}' compares a moving average with itself"));
        }
        Ok(if above {
            MaCheck::MaAbove(a, b)
        } else {
            MaCheck::MaBelow(a, b)
        })
    }
}

impl fmt::Display for MaCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaCheck::PriceAbove(p) => write!(f, "price_above_ma{p}"),
            MaCheck::PriceBelow(p) => write!(f, "price_below_ma{p}"),
            MaCheck::MaAbove(a, b) => write!(f, "ma{a}_above_ma{b}"),
            MaCheck::MaBelow(a, b) => write!(f, "ma{a}_below_ma{b}"),
        }
    }
}
