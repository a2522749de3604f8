//! Criteria evaluation against a snapshot.

use crate::criteria::Criteria;
use crate::snapshot::IndicatorSnapshot;

/// Decide whether a symbol's snapshot satisfies the criteria.
///
/// `show_all` matches unconditionally. Otherwise every present family must
/// hold, and criteria with no families match nothing. A family whose values
/// are missing from the snapshot does not hold.
pub fn evaluate(criteria: &Criteria, snapshot: &IndicatorSnapshot) -> bool {
    if criteria.show_all {
        return true;
    }
    if criteria.has_no_families() {
        return false;
    }

    let rsi_ok = match &criteria.rsi {
        Some(condition) => snapshot.rsi.is_some_and(|rsi| condition.matches(rsi)),
        None => true,
    };

    let macd_ok = match &criteria.macd {
        Some(condition) => snapshot
            .macd
            .is_some_and(|m| condition.matches(m.crossover, m.divergence)),
        None => true,
    };

    let ma_ok = match &criteria.ma {
        Some(check) => check.holds(snapshot.close, &snapshot.moving_averages),
        None => true,
    };

    rsi_ok && macd_ok && ma_ok
}
