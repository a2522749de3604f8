//! Criteria model: what a screening request asks for.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "indicators": {
//!     "rsi":  { "below": 30, "above": 70 },
//!     "macd": { "crossover": "bullish", "divergence": "bearish" },
//!     "ma":   { "criteria": "price_above_ma20" }
//!   },
//!   "show_all": false,
//!   "filters": { "min_volume": 100000, "price_range": { "min": 5, "max": 500 } }
//! }
//! ```
//!
//! Families combine with AND. Alternatives inside one family (RSI `below` and
//! `above`, MACD `crossover` and `divergence`) combine with OR. Family names
//! are case-insensitive.
//!
//! The flat form `{"RSI": {"below": 30}, "MACD": {"signal": "bullish"}}`,
//! with families at the top level, is also accepted. It cannot be mixed with
//! an `indicators` object.

pub mod error;
pub mod filters;
pub mod ma_check;

pub use error::CriteriaError;
pub use filters::{Filters, PriceRange};
pub use ma_check::MaCheck;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::indicators::{IndicatorSettings, IndicatorSpec, SignalDirection};
use crate::snapshot::IndicatorFamily;

/// RSI thresholds. Either comparison holding is a match.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsiCondition {
    pub below: Option<f64>,
    pub above: Option<f64>,
}

impl RsiCondition {
    /// Match when RSI is strictly below `threshold`.
    pub fn below(threshold: f64) -> Self {
        Self {
            below: Some(threshold),
            above: None,
        }
    }

    /// Match when RSI is strictly above `threshold`.
    pub fn above(threshold: f64) -> Self {
        Self {
            below: None,
            above: Some(threshold),
        }
    }

    pub fn matches(&self, rsi: f64) -> bool {
        self.below.is_some_and(|t| rsi < t) || self.above.is_some_and(|t| rsi > t)
    }
}

/// MACD signals. Either signal holding is a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacdCondition {
    pub crossover: Option<SignalDirection>,
    pub divergence: Option<SignalDirection>,
}

impl MacdCondition {
    /// Match a signal-line crossover in `direction`.
    pub fn crossover(direction: SignalDirection) -> Self {
        Self {
            crossover: Some(direction),
            divergence: None,
        }
    }

    /// Match a price/MACD divergence in `direction`.
    pub fn divergence(direction: SignalDirection) -> Self {
        Self {
            crossover: None,
            divergence: Some(direction),
        }
    }

    pub fn matches(
        &self,
        crossover: Option<SignalDirection>,
        divergence: Option<SignalDirection>,
    ) -> bool {
        let hit = |wanted: Option<SignalDirection>, seen: Option<SignalDirection>| {
            wanted.is_some() && wanted == seen
        };
        hit(self.crossover, crossover) || hit(self.divergence, divergence)
    }
}

/// A fully-formed screening request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    pub rsi: Option<RsiCondition>,
    pub macd: Option<MacdCondition>,
    pub ma: Option<MaCheck>,
    pub show_all: bool,
    pub filters: Filters,
}

// ─── Wire types ──────────────────────────────────────────────────────

/// Unknown top-level keys land in `legacy` and must name a family.
#[derive(Deserialize)]
struct WireCriteria {
    #[serde(default)]
    indicators: Map<String, Value>,
    #[serde(default)]
    show_all: bool,
    #[serde(default)]
    filters: Option<Value>,
    #[serde(flatten)]
    legacy: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRsi {
    below: Option<f64>,
    above: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMacd {
    #[serde(alias = "signal")]
    crossover: Option<SignalDirection>,
    divergence: Option<SignalDirection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMa {
    criteria: String,
}

impl Criteria {
    /// Criteria matching every symbol with a usable series.
    pub fn show_all() -> Self {
        Self {
            show_all: true,
            ..Self::default()
        }
    }

    /// Set the RSI family.
    pub fn with_rsi(mut self, condition: RsiCondition) -> Self {
        self.rsi = Some(condition);
        self
    }

    pub fn with_macd(mut self, condition: MacdCondition) -> Self {
        self.macd = Some(condition);
        self
    }

    pub fn with_ma(mut self, check: MaCheck) -> Self {
        self.ma = Some(check);
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// True when no family is present. Without `show_all`, such criteria match nothing.
    pub fn has_no_families(&self) -> bool {
        self.rsi.is_none() && self.macd.is_none() && self.ma.is_none()
    }

    /// Parse criteria from JSON text. Invalid JSON is `Malformed`.
    pub fn from_json(text: &str) -> Result<Self, CriteriaError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CriteriaError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse and validate the wire shape.
    pub fn from_value(value: Value) -> Result<Self, CriteriaError> {
        let wire: WireCriteria =
            serde_json::from_value(value).map_err(|e| CriteriaError::Malformed(e.to_string()))?;

        let mut criteria = Criteria {
            show_all: wire.show_all,
            ..Criteria::default()
        };

        if !wire.legacy.is_empty() && !wire.indicators.is_empty() {
            return Err(CriteriaError::Malformed(
                "top-level indicator keys cannot be combined with `indicators`".into(),
            ));
        }

        let nested = wire
            .indicators
            .into_iter()
            .map(|(name, body)| (format!("indicators.{name}"), name, body));
        let top_level = wire
            .legacy
            .into_iter()
            .map(|(name, body)| (name.clone(), name, body));

        for (field, name, body) in nested.chain(top_level) {
            let family: IndicatorFamily = match name.parse() {
                Ok(family) => family,
                Err(_) if field == name => {
                    return Err(CriteriaError::Malformed(format!("unknown field `{name}`")))
                }
                Err(_) => return Err(CriteriaError::indicator(field, "unknown indicator")),
            };
            if body.is_null() {
                continue;
            }
            match family {
                IndicatorFamily::Rsi => {
                    if criteria.rsi.is_some() {
                        return Err(CriteriaError::indicator(field, "given more than once"));
                    }
                    criteria.rsi = Some(parse_rsi(&field, body)?);
                }
                IndicatorFamily::Macd => {
                    if criteria.macd.is_some() {
                        return Err(CriteriaError::indicator(field, "given more than once"));
                    }
                    criteria.macd = Some(parse_macd(&field, body)?);
                }
                IndicatorFamily::Ma => {
                    if criteria.ma.is_some() {
                        return Err(CriteriaError::indicator(field, "given more than once"));
                    }
                    criteria.ma = Some(parse_ma(&field, body)?);
                }
            }
        }

        if let Some(filters) = wire.filters.filter(|v| !v.is_null()) {
            criteria.filters = parse_filters(filters)?;
        }

        Ok(criteria)
    }

    /// Canonical wire form. Field order is stable, so the output can be hashed.
    pub fn to_value(&self) -> Value {
        let mut indicators = Map::new();
        if let Some(rsi) = &self.rsi {
            let mut body = Map::new();
            if let Some(t) = rsi.below {
                body.insert("below".into(), json!(t));
            }
            if let Some(t) = rsi.above {
                body.insert("above".into(), json!(t));
            }
            indicators.insert("rsi".into(), Value::Object(body));
        }
        if let Some(macd) = &self.macd {
            let mut body = Map::new();
            if let Some(d) = macd.crossover {
                body.insert("crossover".into(), json!(d));
            }
            if let Some(d) = macd.divergence {
                body.insert("divergence".into(), json!(d));
            }
            indicators.insert("macd".into(), Value::Object(body));
        }
        if let Some(check) = &self.ma {
            indicators.insert("ma".into(), json!({ "criteria": check.to_string() }));
        }

        let mut root = Map::new();
        root.insert("indicators".into(), Value::Object(indicators));
        root.insert("show_all".into(), json!(self.show_all));
        if !self.filters.is_empty() {
            root.insert("filters".into(), json!(self.filters));
        }
        Value::Object(root)
    }

    /// Indicator calculators needed to decide this request.
    ///
    /// Under `show_all` nothing needs computing.
    pub fn required_indicators(&self, settings: &IndicatorSettings) -> Vec<IndicatorSpec> {
        if self.show_all {
            return Vec::new();
        }
        let mut specs = Vec::new();
        if self.rsi.is_some() {
            specs.push(settings.rsi());
        }
        if self.macd.is_some() {
            specs.push(settings.macd());
        }
        if let Some(check) = &self.ma {
            specs.extend(check.periods().into_iter().map(|p| settings.sma(p)));
        }
        specs.sort();
        specs.dedup();
        specs
    }
}

// ─── Family parsers ──────────────────────────────────────────────────

fn parse_rsi(field: &str, body: Value) -> Result<RsiCondition, CriteriaError> {
    let wire: WireRsi =
        serde_json::from_value(body).map_err(|e| CriteriaError::indicator(field, e.to_string()))?;
    if wire.below.is_none() && wire.above.is_none() {
        return Err(CriteriaError::indicator(
            field,
            "expected at least one of `below`, `above`",
        ));
    }
    for (name, threshold) in [("below", wire.below), ("above", wire.above)] {
        if let Some(t) = threshold {
            if !t.is_finite() || !(0.0..=100.0).contains(&t) {
                return Err(CriteriaError::indicator(
                    format!("{field}.{name}"),
                    format!("threshold {t} is outside [0, 100]"),
                ));
            }
        }
    }
    Ok(RsiCondition {
        below: wire.below,
        above: wire.above,
    })
}

fn parse_macd(field: &str, body: Value) -> Result<MacdCondition, CriteriaError> {
    let wire: WireMacd =
        serde_json::from_value(body).map_err(|e| CriteriaError::indicator(field, e.to_string()))?;
    if wire.crossover.is_none() && wire.divergence.is_none() {
        return Err(CriteriaError::indicator(
            field,
            "expected at least one of `crossover`, `divergence`",
        ));
    }
    Ok(MacdCondition {
        crossover: wire.crossover,
        divergence: wire.divergence,
    })
}

fn parse_ma(field: &str, body: Value) -> Result<MaCheck, CriteriaError> {
    let wire: WireMa =
        serde_json::from_value(body).map_err(|e| CriteriaError::indicator(field, e.to_string()))?;
    wire.criteria
        .parse()
        .map_err(|reason: String| CriteriaError::indicator(format!("{field}.criteria"), reason))
}

fn parse_filters(body: Value) -> Result<Filters, CriteriaError> {
    let filters: Filters = serde_json::from_value(body)
        .map_err(|e| CriteriaError::filter("filters", e.to_string()))?;
    if let Some(range) = filters.price_range {
        if !range.min.is_finite() || !range.max.is_finite() {
            return Err(CriteriaError::filter(
                "filters.price_range",
                "bounds must be finite numbers",
            ));
        }
        if range.min < 0.0 {
            return Err(CriteriaError::filter(
                "filters.price_range.min",
                format!("{} is negative", range.min),
            ));
        }
        if range.min > range.max {
            return Err(CriteriaError::filter(
                "filters.price_range",
                format!("min {} is greater than max {}", range.min, range.max),
            ));
        }
    }
    Ok(filters)
}
