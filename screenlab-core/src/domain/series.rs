//! PriceSeries and Universe: the immutable inputs to a screening request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{PriceBar, Symbol};

/// Problems with a symbol's price history.
///
/// These are data errors: the screener excludes the symbol and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series for '{symbol}' is empty")]
    Empty { symbol: Symbol },

    #[error("series for '{symbol}' is not sorted: {prev} is followed by {next}")]
    UnsortedDates {
        symbol: Symbol,
        prev: NaiveDate,
        next: NaiveDate,
    },

    #[error("series for '{symbol}' has duplicate date {date}")]
    DuplicateDate { symbol: Symbol, date: NaiveDate },

    #[error("series for '{symbol}' has a non-finite close on {date}")]
    NonFiniteClose { symbol: Symbol, date: NaiveDate },
}

/// Ordered daily bars for one symbol, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: Symbol,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order or duplicate dates.
    ///
    /// An empty bar list is accepted; it is simply never screenable.
    pub fn new(symbol: impl Into<Symbol>, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for pair in bars.windows(2) {
            let (prev, next) = (pair[0].date, pair[1].date);
            if prev == next {
                return Err(SeriesError::DuplicateDate { symbol, date: next });
            }
            if prev > next {
                return Err(SeriesError::UnsortedDates { symbol, prev, next });
            }
        }
        Ok(Self { symbol, bars })
    }

    /// Ticker this series belongs to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Bars in ascending date order.
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar, if any.
    pub fn latest(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Date of the most recent bar. Used as the "as of" component of cache keys.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Checks the series can feed the indicator calculators.
    pub fn check_usable(&self) -> Result<(), SeriesError> {
        if self.bars.is_empty() {
            return Err(SeriesError::Empty {
                symbol: self.symbol.clone(),
            });
        }
        if let Some(bad) = self.bars.iter().find(|b| !b.has_usable_close()) {
            return Err(SeriesError::NonFiniteClose {
                symbol: self.symbol.clone(),
                date: bad.date,
            });
        }
        Ok(())
    }
}

/// The set of symbols a screening request considers, in caller order.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    series: Vec<PriceSeries>,
}

impl Universe {
    /// Universe in the given iteration order.
    pub fn new(series: Vec<PriceSeries>) -> Self {
        Self { series }
    }

    /// Append a series; it is screened after every series already present.
    pub fn push(&mut self, series: PriceSeries) {
        self.series.push(series);
    }

    /// First series for `symbol`, matched exactly.
    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.iter().find(|s| s.symbol() == symbol)
    }

    /// Symbols in iteration order.
    pub fn symbols(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.symbol()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceSeries> {
        self.series.iter()
    }

    /// Series in iteration order, for parallel iteration.
    pub fn as_slice(&self) -> &[PriceSeries] {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<PriceSeries> for Universe {
    fn from_iter<I: IntoIterator<Item = PriceSeries>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Universe {
    type Item = &'a PriceSeries;
    type IntoIter = std::slice::Iter<'a, PriceSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}
