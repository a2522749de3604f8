//! Latest-snapshot view of a symbol's computed indicators.
//!
//! A [`SnapshotPlan`] says which calculators to run, which of them must be
//! defined for the symbol to be screenable, and how to derive MACD signals.
//! [`SnapshotPlan::build`] then picks the most recent bar at which every
//! required value is defined.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::criteria::Criteria;
use crate::domain::{PriceSeries, Symbol};
use crate::indicators::{
    divergence_at, recent_crossover, IndicatorSettings, IndicatorSpec, IndicatorValues,
    SignalDirection,
};

/// MACD values at the snapshot bar plus the signals derived around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub crossover: Option<SignalDirection>,
    pub divergence: Option<SignalDirection>,
}

/// Indicator values for one symbol as of one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    /// Period → SMA value, only for averages defined at `date`.
    pub moving_averages: BTreeMap<usize, f64>,
}

/// Indicator families a caller can ask to have reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorFamily {
    Rsi,
    Macd,
    Ma,
}

impl IndicatorFamily {
    /// Every family, in detail-record order.
    pub const ALL: [IndicatorFamily; 3] =
        [IndicatorFamily::Rsi, IndicatorFamily::Macd, IndicatorFamily::Ma];
}

impl FromStr for IndicatorFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsi" => Ok(IndicatorFamily::Rsi),
            "macd" => Ok(IndicatorFamily::Macd),
            "ma" => Ok(IndicatorFamily::Ma),
            _ => Err(format!("unknown indicator '{s}'")),
        }
    }
}

impl fmt::Display for IndicatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndicatorFamily::Rsi => "RSI",
            IndicatorFamily::Macd => "MACD",
            IndicatorFamily::Ma => "MA",
        })
    }
}

/// Which calculators run for a symbol and what the snapshot needs from them.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPlan {
    /// Must be defined at the snapshot bar.
    required: Vec<IndicatorSpec>,
    /// Everything to compute and report (superset of `required`).
    reported: Vec<IndicatorSpec>,
    /// Crossover referenced: the previous bar's MACD pair must be defined too.
    needs_crossover: bool,
    /// Divergence referenced: the MACD line `divergence_lookback` bars back must be defined.
    needs_divergence: bool,
    crossover_window: usize,
    divergence_lookback: usize,
}

impl SnapshotPlan {
    /// Plan for screening. With `detailed`, the default indicator set is
    /// computed and reported as well, without being required.
    pub fn for_criteria(criteria: &Criteria, settings: &IndicatorSettings, detailed: bool) -> Self {
        let required = criteria.required_indicators(settings);
        let mut reported = required.clone();
        if detailed {
            reported.extend(family_specs(&IndicatorFamily::ALL, settings));
        }
        reported.sort();
        reported.dedup();

        let macd = if criteria.show_all { None } else { criteria.macd };
        Self {
            required,
            reported,
            needs_crossover: macd.is_some_and(|m| m.crossover.is_some()),
            needs_divergence: macd.is_some_and(|m| m.divergence.is_some()),
            crossover_window: settings.crossover_window,
            divergence_lookback: settings.divergence_lookback,
        }
    }

    /// Plan for single-symbol analysis: report the families, require nothing.
    pub fn for_families(families: &[IndicatorFamily], settings: &IndicatorSettings) -> Self {
        let mut reported = family_specs(families, settings);
        reported.sort();
        reported.dedup();
        Self {
            required: Vec::new(),
            reported,
            needs_crossover: false,
            needs_divergence: false,
            crossover_window: settings.crossover_window,
            divergence_lookback: settings.divergence_lookback,
        }
    }

    /// Calculators whose values must be defined on the snapshot bar.
    pub fn required(&self) -> &[IndicatorSpec] {
        &self.required
    }

    /// Calculators to run (or fetch from cache) before [`build`](Self::build).
    pub fn specs_to_compute(&self) -> &[IndicatorSpec] {
        &self.reported
    }

    fn usable_at(&self, values: &IndicatorValues, i: usize) -> bool {
        for spec in &self.required {
            for name in spec.series_names() {
                if values.get_defined(&name, i).is_none() {
                    return false;
                }
            }
            if let IndicatorSpec::Macd { .. } = spec {
                let key = spec.key();
                let line = format!("{key}.line");
                let signal = format!("{key}.signal");
                if self.needs_crossover
                    && (i == 0
                        || values.get_defined(&line, i - 1).is_none()
                        || values.get_defined(&signal, i - 1).is_none())
                {
                    return false;
                }
                if self.needs_divergence
                    && (i < self.divergence_lookback
                        || values
                            .get_defined(&line, i - self.divergence_lookback)
                            .is_none())
                {
                    return false;
                }
            }
        }
        true
    }

    /// Most recent usable snapshot, or `None` if history is insufficient.
    pub fn build(
        &self,
        series: &PriceSeries,
        values: &IndicatorValues,
    ) -> Option<IndicatorSnapshot> {
        let bars = series.bars();
        let index = (0..bars.len())
            .rev()
            .find(|&i| bars[i].close.is_finite() && self.usable_at(values, i))?;
        let bar = &bars[index];

        let mut snapshot = IndicatorSnapshot {
            symbol: series.symbol().to_string(),
            date: bar.date,
            close: bar.close,
            volume: bar.volume,
            rsi: None,
            macd: None,
            moving_averages: BTreeMap::new(),
        };

        for spec in &self.reported {
            match *spec {
                IndicatorSpec::Rsi { .. } => {
                    snapshot.rsi = values.get_defined(&spec.key(), index);
                }
                IndicatorSpec::Sma { period } => {
                    if let Some(v) = values.get_defined(&spec.key(), index) {
                        snapshot.moving_averages.insert(period, v);
                    }
                }
                IndicatorSpec::Macd { .. } => {
                    snapshot.macd = self.macd_at(series, values, spec, index);
                }
            }
        }

        Some(snapshot)
    }

    fn macd_at(
        &self,
        series: &PriceSeries,
        values: &IndicatorValues,
        spec: &IndicatorSpec,
        index: usize,
    ) -> Option<MacdSnapshot> {
        let key = spec.key();
        let line = values.get_series(&format!("{key}.line"))?;
        let signal = values.get_series(&format!("{key}.signal"))?;
        let histogram = values.get_series(&format!("{key}.histogram"))?;

        let (m, s, h) = (
            *line.get(index)?,
            *signal.get(index)?,
            *histogram.get(index)?,
        );
        if !(m.is_finite() && s.is_finite() && h.is_finite()) {
            return None;
        }

        let closes = series.closes();
        Some(MacdSnapshot {
            macd: m,
            signal: s,
            histogram: h,
            crossover: recent_crossover(line, signal, index, self.crossover_window),
            divergence: divergence_at(&closes, line, index, self.divergence_lookback),
        })
    }
}

fn family_specs(families: &[IndicatorFamily], settings: &IndicatorSettings) -> Vec<IndicatorSpec> {
    let mut specs = Vec::new();
    for family in families {
        match family {
            IndicatorFamily::Rsi => specs.push(settings.rsi()),
            IndicatorFamily::Macd => specs.push(settings.macd()),
            IndicatorFamily::Ma => {
                specs.extend(settings.ma_periods.iter().map(|&p| settings.sma(p)))
            }
        }
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{MaCheck, MacdCondition, RsiCondition};
    use crate::indicators::make_bars;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new("TEST", make_bars(closes)).unwrap()
    }

    fn compute(plan: &SnapshotPlan, s: &PriceSeries) -> IndicatorValues {
        let mut values = IndicatorValues::new();
        for spec in plan.specs_to_compute() {
            spec.compute(s.bars()).store(spec, &mut values);
        }
        values
    }

    #[test]
    fn show_all_snapshot_is_latest_bar_without_indicators() {
        let s = series(&[1.0, 2.0, 3.0]);
        let plan =
            SnapshotPlan::for_criteria(&Criteria::show_all(), &IndicatorSettings::default(), false);
        assert!(plan.specs_to_compute().is_empty());
        let snap = plan.build(&s, &compute(&plan, &s)).unwrap();
        assert_eq!(snap.close, 3.0);
        assert_eq!(snap.date, s.last_date().unwrap());
        assert!(snap.rsi.is_none());
    }

    #[test]
    fn insufficient_history_yields_none() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let criteria = Criteria::default().with_ma(MaCheck::MaAbove(20, 50));
        let plan = SnapshotPlan::for_criteria(&criteria, &IndicatorSettings::default(), false);
        assert!(plan.build(&s, &compute(&plan, &s)).is_none());
    }

    #[test]
    fn rsi_snapshot_at_latest_bar() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + 2.0 * i as f64 / 19.0).collect();
        let s = series(&closes);
        let criteria = Criteria::default().with_rsi(RsiCondition::above(70.0));
        let plan = SnapshotPlan::for_criteria(&criteria, &IndicatorSettings::default(), false);
        let snap = plan.build(&s, &compute(&plan, &s)).unwrap();
        assert_eq!(snap.rsi, Some(100.0));
        assert_eq!(snap.date, s.last_date().unwrap());
    }

    #[test]
    fn crossover_needs_one_extra_bar_of_macd() {
        let settings = IndicatorSettings::default();
        // signal first defined at index 33
        let closes: Vec<f64> = (0..34).map(|i| 50.0 + (i as f64 * 0.4).sin()).collect();
        let s = series(&closes);

        let plain =
            Criteria::default().with_macd(MacdCondition::divergence(SignalDirection::Bullish));
        let crossing =
            Criteria::default().with_macd(MacdCondition::crossover(SignalDirection::Bullish));

        let plan = SnapshotPlan::for_criteria(&plain, &settings, false);
        assert!(plan.build(&s, &compute(&plan, &s)).is_some());

        let plan = SnapshotPlan::for_criteria(&crossing, &settings, false);
        assert!(plan.build(&s, &compute(&plan, &s)).is_none());

        let longer = series(&(0..35).map(|i| 50.0 + (i as f64 * 0.4).sin()).collect::<Vec<_>>());
        assert!(plan.build(&longer, &compute(&plan, &longer)).is_some());
    }

    #[test]
    fn detailed_plan_reports_undefined_averages_as_absent() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let criteria = Criteria::default().with_ma(MaCheck::PriceAbove(20));
        let plan = SnapshotPlan::for_criteria(&criteria, &IndicatorSettings::default(), true);
        let snap = plan.build(&s, &compute(&plan, &s)).unwrap();
        assert!(snap.moving_averages.contains_key(&20));
        assert!(snap.moving_averages.contains_key(&50));
        assert!(!snap.moving_averages.contains_key(&200));
        assert!(snap.rsi.is_some());
        assert!(snap.macd.is_some());
    }

    #[test]
    fn family_parsing() {
        assert_eq!("RSI".parse::<IndicatorFamily>(), Ok(IndicatorFamily::Rsi));
        assert_eq!("ma".parse::<IndicatorFamily>(), Ok(IndicatorFamily::Ma));
        assert!("adx".parse::<IndicatorFamily>().is_err());
        assert_eq!(IndicatorFamily::Macd.to_string(), "MACD");
    }

    #[test]
    fn family_plan_requires_nothing() {
        let plan =
            SnapshotPlan::for_families(&[IndicatorFamily::Rsi], &IndicatorSettings::default());
        assert!(plan.required().is_empty());
        assert_eq!(plan.specs_to_compute().len(), 1);
    }
}
