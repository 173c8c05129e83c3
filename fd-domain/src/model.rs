use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ShipId(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct SystemSymbol(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LocationSymbol(pub String);

impl LocationSymbol {
    pub fn system_symbol(&self) -> SystemSymbol {
        SystemSymbol(self.0.split('-').next().unwrap_or(&self.0).to_string())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum LocationType {
    PLANET,
    MOON,
    GAS_GIANT,
    ASTEROID,
    WORMHOLE,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum GoodSymbol {
    FUEL,
    CHEMICALS,
    CONSTRUCTION_MATERIALS,
    CONSUMER_GOODS,
    DRONES,
    ELECTRONICS,
    FOOD,
    MACHINERY,
    METALS,
    RARE_METALS,
    RESEARCH,
    SHIP_PARTS,
    SHIP_PLATING,
    TEXTILES,
    NARCOTICS,
    NANOBOTS,
    BIOMETRIC_FIREARMS,
    EXOTIC_PLASMA,
    FUSION_REACTORS,
    PRECISION_INSTRUMENTS,
    PROTEIN_SYNTHESIZERS,
    UNSTABLE_COMPOUNDS,
    ZUCO_CRYSTALS,
}

impl GoodSymbol {
    /// Fuel is bought for travel and research never moves at a profit, so
    /// neither participates in route evaluation.
    pub fn is_tradable(&self) -> bool {
        !matches!(self, GoodSymbol::FUEL | GoodSymbol::RESEARCH)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub symbol: LocationSymbol,
    #[serde(rename = "type")]
    pub r#type: LocationType,
    pub name: String,
    pub x: i64,
    pub y: i64,
}

impl Location {
    pub fn distance_to(&self, other: &Location) -> u32 {
        distance(self.x, self.y, other.x, other.y)
    }

    pub fn is_wormhole(&self) -> bool {
        self.r#type == LocationType::WORMHOLE
    }
}

pub fn distance(from_x: i64, from_y: i64, to_x: i64, to_y: i64) -> u32 {
    let dx = (to_x - from_x) as f64;
    let dy = (to_y - from_y) as f64;
    (dx * dx + dy * dy).sqrt().ceil() as u32
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub symbol: SystemSymbol,
    pub name: String,
    pub locations: Vec<Location>,
}

impl System {
    pub fn location(&self, symbol: &LocationSymbol) -> Option<&Location> {
        self.locations.iter().find(|loc| &loc.symbol == symbol)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "camelCase")]
pub struct ShipCargo {
    pub good: GoodSymbol,
    pub quantity: u32,
    pub total_volume: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub id: ShipId,
    /// None while the ship is in flight.
    pub location: Option<LocationSymbol>,
    #[serde(rename = "type")]
    pub r#type: String,
    pub class: String,
    pub speed: u32,
    pub max_cargo: u32,
    pub space_available: u32,
    pub cargo: Vec<ShipCargo>,
}

impl Ship {
    pub fn good_quantity(&self, good: &GoodSymbol) -> u32 {
        self.cargo
            .iter()
            .filter(|entry| &entry.good == good)
            .map(|entry| entry.quantity)
            .sum()
    }

    pub fn fuel_in_cargo(&self) -> u32 {
        self.good_quantity(&GoodSymbol::FUEL)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "camelCase")]
pub struct MarketGood {
    pub symbol: GoodSymbol,
    pub purchase_price_per_unit: i64,
    pub sell_price_per_unit: i64,
    pub volume_per_unit: u32,
    pub quantity_available: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetMarketplaceResponse {
    pub marketplace: Vec<MarketGood>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub good: GoodSymbol,
    pub quantity: u32,
    pub price_per_unit: i64,
    pub total: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub credits: i64,
    pub order: Order,
    pub ship: Ship,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlightPlan {
    pub id: String,
    pub ship_id: ShipId,
    pub destination: LocationSymbol,
    pub departure: LocationSymbol,
    pub distance: u32,
    pub fuel_consumed: u32,
    pub fuel_remaining: u32,
    pub time_remaining_in_seconds: u32,
    pub arrives_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlightPlanResponse {
    pub flight_plan: FlightPlan,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub ships: Vec<Ship>,
    pub systems: Vec<System>,
    pub credits: i64,
    pub cached_markets: Vec<crate::market::MarketSnapshot>,
}
