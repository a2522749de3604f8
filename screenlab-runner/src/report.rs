//! Screening results and their output shapes.
//!
//! Callers choose between a flat symbol list and detail records:
//!
//! ```json
//! {
//!   "symbol": "AAPL", "price": 189.3, "date": "2024-03-01",
//!   "indicators": {
//!     "RSI": 41.2,
//!     "MACD": { "macd": 0.8, "signal": 0.5, "histogram": 0.3 },
//!     "MA": { "MA20": 185.1, "MA50": 180.4, "MA200": 172.9 }
//!   }
//! }
//! ```

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use screenlab_core::indicators::ma_label;
use screenlab_core::{IndicatorSnapshot, SignalDirection, Symbol};

/// A symbol that satisfied the criteria, with the snapshot used for the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub symbol: Symbol,
    pub snapshot: IndicatorSnapshot,
}

/// Why a symbol never reached evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Excluded by `min_volume` / `price_range` before any computation.
    FilteredOut,
    /// Not enough bars for the referenced indicators.
    InsufficientHistory,
    /// The series could not be processed.
    Fault(String),
}

/// A symbol that did not match, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Outcome of one screening request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    /// Content hash of the criteria and indicator settings.
    pub request_id: String,
    /// Matches in universe order.
    pub matches: Vec<Match>,
    /// Symbols excluded before evaluation, in universe order.
    pub skipped: Vec<SkippedSymbol>,
    /// Symbols whose snapshot was evaluated (matched or not).
    pub evaluated: usize,
}

impl ScreeningResult {
    /// Matching symbols in universe order.
    pub fn symbols(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.symbol.as_str()).collect()
    }

    /// Symbols skipped because of a computation fault.
    pub fn faults(&self) -> impl Iterator<Item = &SkippedSymbol> {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Fault(_)))
    }

    pub fn skipped_count(&self, reason: &SkipReason) -> usize {
        self.skipped
            .iter()
            .filter(|s| std::mem::discriminant(&s.reason) == std::mem::discriminant(reason))
            .count()
    }

    /// Caller-facing shape for `verbosity`.
    pub fn output(&self, verbosity: Verbosity) -> ScreenOutput {
        match verbosity {
            Verbosity::Symbols => {
                ScreenOutput::Symbols(self.matches.iter().map(|m| m.symbol.clone()).collect())
            }
            Verbosity::Detailed => ScreenOutput::Detailed(
                self.matches
                    .iter()
                    .map(|m| DetailRecord::from(&m.snapshot))
                    .collect(),
            ),
        }
    }
}

/// Requested output shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Symbols,
    Detailed,
}

impl Verbosity {
    pub fn is_detailed(self) -> bool {
        self == Verbosity::Detailed
    }
}

/// Either a symbol list or detail records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScreenOutput {
    Symbols(Vec<Symbol>),
    Detailed(Vec<DetailRecord>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdDetail {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossover: Option<SignalDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<SignalDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailIndicators {
    #[serde(rename = "RSI", skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(rename = "MACD", skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdDetail>,
    #[serde(
        rename = "MA",
        serialize_with = "serialize_ma",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub moving_averages: BTreeMap<usize, f64>,
}

/// One symbol's detail record in the transport shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRecord {
    pub symbol: Symbol,
    pub price: f64,
    pub date: NaiveDate,
    pub indicators: DetailIndicators,
}

impl From<&IndicatorSnapshot> for DetailRecord {
    fn from(snapshot: &IndicatorSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            price: snapshot.close,
            date: snapshot.date,
            indicators: DetailIndicators {
                rsi: snapshot.rsi,
                macd: snapshot.macd.map(|m| MacdDetail {
                    macd: m.macd,
                    signal: m.signal,
                    histogram: m.histogram,
                    crossover: m.crossover,
                    divergence: m.divergence,
                }),
                moving_averages: snapshot.moving_averages.clone(),
            },
        }
    }
}

/// `MA20`, `MA50`, `MA200` in period order.
fn serialize_ma<S: Serializer>(averages: &BTreeMap<usize, f64>, s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(averages.len()))?;
    for (period, value) in averages {
        map.serialize_entry(&ma_label(*period), value)?;
    }
    map.end()
}
