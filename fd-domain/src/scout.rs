use crate::market::{MarketCache, FRESHNESS_THRESHOLD_MS};
use crate::model::{LocationSymbol, System};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A snapshot whose decayed value drops below this is worth a re-scout.
pub const SCOUT_DECAY_CUTOFF: f64 = 0.37;

/// How many ships one "unit" of re-scout pressure corresponds to. Bigger
/// fleets can afford to burn more legs on data refreshes.
pub const FLEET_SIZE_DECAY_DIVISOR: f64 = 35.0;

/// Remaining confidence in a snapshot of the given age: `e^(-k*t)` with `t`
/// in 10-minute units and `k` scaling with fleet size.
pub fn snapshot_value(age_ms: i64, fleet_size: usize) -> f64 {
    let t = age_ms as f64 / FRESHNESS_THRESHOLD_MS as f64;
    let k = fleet_size as f64 / FLEET_SIZE_DECAY_DIVISOR;
    (-k * t).exp()
}

/// Locations in `system` that need a data-refresh visit: everything never
/// observed, plus snapshots whose decayed value fell below the cutoff.
/// Wormholes and locations already targeted by a pending dispatch are
/// excluded from both sources.
pub fn scout_candidates(
    system: &System,
    cache: &MarketCache,
    fleet_size: usize,
    pending_targets: &HashSet<LocationSymbol>,
    now: DateTime<Utc>,
) -> Vec<LocationSymbol> {
    let never_seen = system
        .locations
        .iter()
        .filter(|location| !location.is_wormhole())
        .filter(|location| !pending_targets.contains(&location.symbol))
        .filter(|location| cache.get(&location.symbol).is_none())
        .map(|location| location.symbol.clone());

    let decayed = system
        .locations
        .iter()
        .filter(|location| !location.is_wormhole())
        .filter(|location| !pending_targets.contains(&location.symbol))
        .filter_map(|location| cache.get(&location.symbol))
        .filter(|snapshot| {
            snapshot_value(snapshot.age(now).num_milliseconds(), fleet_size) < SCOUT_DECAY_CUTOFF
        })
        .map(|snapshot| snapshot.location.clone());

    never_seen.chain(decayed).collect()
}
