use crate::model::{GoodSymbol, LocationSymbol, ShipId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a ship was committed to a flight plan. Matched exhaustively wherever
/// the kind matters; settlement only happens for trade legs.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum DispatchKind {
    /// Refresh market data at the target; nothing to settle on arrival.
    Scout,
    /// Sell `good` at the target on arrival.
    Trade { good: GoodSymbol },
}

/// An in-flight assignment. At most one per ship at any time; created when
/// the flight plan is issued, removed on arrival once settlement (if any)
/// completes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub ship_id: ShipId,
    pub target: LocationSymbol,
    pub kind: DispatchKind,
    pub arrives_at: DateTime<Utc>,
}

impl Dispatch {
    pub fn is_scout(&self) -> bool {
        matches!(self.kind, DispatchKind::Scout)
    }

    pub fn has_arrived(&self, now: DateTime<Utc>) -> bool {
        now >= self.arrives_at
    }
}
