use crate::market::MarketSnapshot;
use crate::model::{Ship, ShipId};
use serde::{Deserialize, Serialize};

/// Incremental state changes the dispatcher reports to its host for
/// persistence and display.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum StateUpdate {
    ShipUpdated(Ship),
    CreditsChanged(i64),
    MarketUpdated(MarketSnapshot),
}

/// Terminal error event: the run is disabled and will not restart itself.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RunHalted {
    /// The last ship the tick was working on when the failure surfaced.
    pub ship_id: Option<ShipId>,
    pub message: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum DispatcherEvent {
    Update(StateUpdate),
    Halted(RunHalted),
}
