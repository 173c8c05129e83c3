use crate::client::ApiClient;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fd_domain::{
    fuel, distance, FleetSnapshot, FlightPlan, GetMarketplaceResponse, GoodSymbol, Location,
    LocationSymbol, MarketGood, Order, OrderResponse, Ship, ShipCargo, ShipId, System,
    SystemSymbol,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Deterministic world model for exercising the dispatcher without a live
/// server. Flight plans move the ship instantly unless a travel override
/// says otherwise; prices never move on their own.
#[derive(Debug, Clone)]
pub struct InMemoryUniverse {
    pub systems: HashMap<SystemSymbol, System>,
    pub markets: HashMap<LocationSymbol, Vec<MarketGood>>,
    pub ships: HashMap<ShipId, Ship>,
    pub credits: i64,
    /// Fixed travel time in seconds for every flight plan, regardless of
    /// distance. Defaults to zero so tests settle on the next tick.
    pub travel_seconds_override: Option<u32>,
}

impl InMemoryUniverse {
    pub fn new(systems: Vec<System>, ships: Vec<Ship>, credits: i64) -> Self {
        Self {
            systems: systems
                .into_iter()
                .map(|system| (system.symbol.clone(), system))
                .collect(),
            markets: HashMap::new(),
            ships: ships
                .into_iter()
                .map(|ship| (ship.id.clone(), ship))
                .collect(),
            credits,
            travel_seconds_override: Some(0),
        }
    }

    pub fn with_market(mut self, location: LocationSymbol, goods: Vec<MarketGood>) -> Self {
        self.markets.insert(location, goods);
        self
    }

    fn location(&self, symbol: &LocationSymbol) -> Result<&Location> {
        self.systems
            .get(&symbol.system_symbol())
            .and_then(|system| system.location(symbol))
            .with_context(|| format!("unknown location {}", symbol.0))
    }

    fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            ships: self.ships.values().cloned().collect(),
            systems: self.systems.values().cloned().collect(),
            credits: self.credits,
            cached_markets: vec![],
        }
    }
}

/// `ApiClient` over a shared [`InMemoryUniverse`]. Tests keep a second
/// handle to the universe to inspect or mutate the world between ticks.
#[derive(Debug, Clone)]
pub struct InMemoryUniverseClient {
    pub universe: Arc<Mutex<InMemoryUniverse>>,
}

impl InMemoryUniverseClient {
    pub fn new(universe: InMemoryUniverse) -> Self {
        Self {
            universe: Arc::new(Mutex::new(universe)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryUniverse>> {
        self.universe
            .lock()
            .map_err(|_| anyhow!("universe lock poisoned"))
    }
}

#[async_trait]
impl ApiClient for InMemoryUniverseClient {
    async fn fetch_market(&self, location: &LocationSymbol) -> Result<GetMarketplaceResponse> {
        let universe = self.lock()?;
        let marketplace = universe
            .markets
            .get(location)
            .cloned()
            .with_context(|| format!("no marketplace at {}", location.0))?;
        Ok(GetMarketplaceResponse { marketplace })
    }

    async fn buy_good(&self, ship_id: &ShipId, good: GoodSymbol, units: u32) -> Result<OrderResponse> {
        let mut universe = self.lock()?;

        let ship_location = universe
            .ships
            .get(ship_id)
            .with_context(|| format!("unknown ship {}", ship_id.0))?
            .location
            .clone()
            .context("ship is in transit")?;
        let entry = universe
            .markets
            .get(&ship_location)
            .and_then(|goods| goods.iter().find(|entry| entry.symbol == good))
            .cloned()
            .with_context(|| format!("{good} not sold at {}", ship_location.0))?;

        let total = entry.purchase_price_per_unit * units as i64;
        if total > universe.credits {
            return Err(anyhow!(
                "insufficient credits: order costs {total}, have {}",
                universe.credits
            ));
        }
        let volume = units * entry.volume_per_unit.max(1);
        let free = universe
            .ships
            .get(ship_id)
            .map(|ship| ship.space_available)
            .unwrap_or(0);
        if volume > free {
            return Err(anyhow!("cargo overflow: {volume} units of volume into {free} free"));
        }

        universe.credits -= total;
        let credits = universe.credits;
        let ship = universe
            .ships
            .get_mut(ship_id)
            .with_context(|| format!("unknown ship {}", ship_id.0))?;
        ship.space_available -= volume;
        ship.cargo.push(ShipCargo {
            good,
            quantity: units,
            total_volume: volume,
        });

        Ok(OrderResponse {
            credits,
            order: Order {
                good,
                quantity: units,
                price_per_unit: entry.purchase_price_per_unit,
                total,
            },
            ship: ship.clone(),
        })
    }

    async fn sell_good(&self, ship_id: &ShipId, good: GoodSymbol, units: u32) -> Result<OrderResponse> {
        let mut universe = self.lock()?;

        let ship_location = universe
            .ships
            .get(ship_id)
            .with_context(|| format!("unknown ship {}", ship_id.0))?
            .location
            .clone()
            .context("ship is in transit")?;
        let entry = universe
            .markets
            .get(&ship_location)
            .and_then(|goods| goods.iter().find(|entry| entry.symbol == good))
            .cloned()
            .with_context(|| format!("{good} not bought at {}", ship_location.0))?;

        let held = universe
            .ships
            .get(ship_id)
            .map(|ship| ship.good_quantity(&good))
            .unwrap_or(0);
        if held < units {
            return Err(anyhow!("selling {units} units of {good} but holding {held}"));
        }

        let total = entry.sell_price_per_unit * units as i64;
        universe.credits += total;
        let credits = universe.credits;

        let ship = universe
            .ships
            .get_mut(ship_id)
            .with_context(|| format!("unknown ship {}", ship_id.0))?;
        let freed = units * entry.volume_per_unit.max(1);
        ship.space_available += freed;
        ship.cargo.retain(|cargo| cargo.good != good);
        if held > units {
            ship.cargo.push(ShipCargo {
                good,
                quantity: held - units,
                total_volume: (held - units) * entry.volume_per_unit.max(1),
            });
        }

        Ok(OrderResponse {
            credits,
            order: Order {
                good,
                quantity: units,
                price_per_unit: entry.sell_price_per_unit,
                total,
            },
            ship: ship.clone(),
        })
    }

    async fn create_flight_plan(
        &self,
        ship_id: &ShipId,
        destination: &LocationSymbol,
    ) -> Result<FlightPlan> {
        let mut universe = self.lock()?;

        let ship = universe
            .ships
            .get(ship_id)
            .cloned()
            .with_context(|| format!("unknown ship {}", ship_id.0))?;
        let origin_symbol = ship.location.clone().context("ship is in transit")?;
        let origin = universe.location(&origin_symbol)?.clone();
        let target = universe.location(destination)?.clone();

        let leg_distance = distance(origin.x, origin.y, target.x, target.y);
        let fuel_needed = fuel::fuel_required(&origin, &target) + fuel::fuel_penalty(&ship, &origin);
        let held = ship.fuel_in_cargo();
        if held < fuel_needed {
            return Err(anyhow!(
                "not enough fuel for flight: need {fuel_needed}, have {held}"
            ));
        }
        let fuel_remaining = held - fuel_needed;

        let travel_seconds = universe
            .travel_seconds_override
            .unwrap_or_else(|| leg_distance / ship.speed.max(1) + 1);

        let ship = universe
            .ships
            .get_mut(ship_id)
            .with_context(|| format!("unknown ship {}", ship_id.0))?;
        ship.location = Some(destination.clone());
        ship.space_available += fuel_needed;
        ship.cargo.retain(|cargo| cargo.good != GoodSymbol::FUEL);
        if fuel_remaining > 0 {
            ship.cargo.push(ShipCargo {
                good: GoodSymbol::FUEL,
                quantity: fuel_remaining,
                total_volume: fuel_remaining,
            });
        }

        Ok(FlightPlan {
            id: Uuid::new_v4().to_string(),
            ship_id: ship_id.clone(),
            destination: destination.clone(),
            departure: origin_symbol,
            distance: leg_distance,
            fuel_consumed: fuel_needed,
            fuel_remaining,
            time_remaining_in_seconds: travel_seconds,
            arrives_at: chrono::Utc::now() + chrono::Duration::seconds(travel_seconds as i64),
        })
    }

    async fn get_fleet_snapshot(&self) -> Result<FleetSnapshot> {
        Ok(self.lock()?.snapshot())
    }
}
