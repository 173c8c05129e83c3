use crate::model::{LocationSymbol, MarketGood};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Market data older than this is stale and no longer trusted for trading
/// decisions.
pub const FRESHNESS_THRESHOLD_MS: i64 = 600_000;

pub fn freshness_threshold() -> Duration {
    Duration::milliseconds(FRESHNESS_THRESHOLD_MS)
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub location: LocationSymbol,
    pub updated_at: DateTime<Utc>,
    pub goods: Vec<MarketGood>,
}

impl MarketSnapshot {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.age(now) <= freshness_threshold()
    }

    pub fn good(&self, symbol: &crate::model::GoodSymbol) -> Option<&MarketGood> {
        self.goods.iter().find(|good| &good.symbol == symbol)
    }
}

/// Per-location cache of the latest observed prices. Entries are replaced
/// wholesale on refresh, never merged; staleness is evaluated lazily by
/// consumers.
#[derive(Debug, Clone, Default)]
pub struct MarketCache {
    snapshots: HashMap<LocationSymbol, MarketSnapshot>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = MarketSnapshot>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|snapshot| (snapshot.location.clone(), snapshot))
                .collect(),
        }
    }

    pub fn get(&self, location: &LocationSymbol) -> Option<&MarketSnapshot> {
        self.snapshots.get(location)
    }

    pub fn upsert(&mut self, location: LocationSymbol, goods: Vec<MarketGood>) -> &MarketSnapshot {
        self.upsert_at(location, goods, Utc::now())
    }

    pub fn upsert_at(
        &mut self,
        location: LocationSymbol,
        goods: Vec<MarketGood>,
        updated_at: DateTime<Utc>,
    ) -> &MarketSnapshot {
        let snapshot = MarketSnapshot {
            location: location.clone(),
            updated_at,
            goods,
        };
        self.snapshots.insert(location.clone(), snapshot);
        &self.snapshots[&location]
    }

    pub fn is_fresh(&self, location: &LocationSymbol, now: DateTime<Utc>) -> bool {
        self.get(location)
            .map(|snapshot| snapshot.is_fresh(now))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &MarketSnapshot> {
        self.snapshots.values()
    }
}
