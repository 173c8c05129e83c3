use crate::client::ApiClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fd_domain::{
    fuel, quantity, scout, trading, Dispatch, DispatchKind, DispatcherEvent, DirectTrade,
    FleetSnapshot, GoodSymbol, Location, LocationSymbol, MarketCache, OrderResponse, RunHalted,
    Ship, ShipId, StateUpdate, System, SystemSymbol, TradeRoute,
};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, event, warn, Level};

pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// The private world copy one dispatcher run operates on. Seeded once from
/// the fleet snapshot; every mutation during a run flows through the tick.
#[derive(Debug, Clone)]
pub struct DispatcherState {
    pub ships: HashMap<ShipId, Ship>,
    /// Snapshot order of the fleet; the idle sort tie-breaks by it.
    pub ship_order: Vec<ShipId>,
    pub systems: HashMap<SystemSymbol, System>,
    pub credits: i64,
    pub markets: MarketCache,
    pub dispatched: HashMap<ShipId, Dispatch>,
    pub home_system: SystemSymbol,
}

impl DispatcherState {
    pub fn from_snapshot(snapshot: FleetSnapshot, home_system: SystemSymbol) -> Self {
        let ship_order = snapshot.ships.iter().map(|ship| ship.id.clone()).collect();
        Self {
            ships: snapshot
                .ships
                .into_iter()
                .map(|ship| (ship.id.clone(), ship))
                .collect(),
            ship_order,
            systems: snapshot
                .systems
                .into_iter()
                .map(|system| (system.symbol.clone(), system))
                .collect(),
            credits: snapshot.credits,
            markets: MarketCache::from_snapshots(snapshot.cached_markets),
            dispatched: HashMap::new(),
            home_system,
        }
    }

    fn pending_scout_targets(&self) -> HashSet<LocationSymbol> {
        self.dispatched
            .values()
            .filter(|dispatch| dispatch.is_scout())
            .map(|dispatch| dispatch.target.clone())
            .collect()
    }

    fn is_occupied(&self, location: &LocationSymbol) -> bool {
        self.ships
            .values()
            .any(|ship| ship.location.as_ref() == Some(location))
    }
}

pub struct Dispatcher {
    client: Arc<dyn ApiClient>,
    state: DispatcherState,
    events_tx: Sender<DispatcherEvent>,
    /// The ship a failing tick gets attributed to in the terminal event.
    last_ship: Option<ShipId>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn ApiClient>,
        state: DispatcherState,
        events_tx: Sender<DispatcherEvent>,
    ) -> Self {
        Self {
            client,
            state,
            events_tx,
            last_ship: None,
        }
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    /// Tick until cancelled or a tick fails. A failure disables the run
    /// entirely and surfaces as a terminal `Halted` event; the host has to
    /// restart explicitly.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    event!(Level::INFO, "Stop requested, dispatcher run ends");
                    return;
                }
                _ = interval.tick() => {}
            }

            if let Err(error) = self.tick().await {
                let halted = RunHalted {
                    ship_id: self.last_ship.clone(),
                    message: format!("{error:#}"),
                };
                event!(
                    Level::ERROR,
                    message = "Dispatcher run halted",
                    ship = halted.ship_id.as_ref().map(|s| s.0.as_str()).unwrap_or("-"),
                    error = %halted.message,
                );
                let _ = self.events_tx.send(DispatcherEvent::Halted(halted)).await;
                return;
            }
        }
    }

    /// One pass of the per-tick state machine: refresh snapshots under the
    /// fleet, dispatch every idle ship, then settle arrivals. Dispatch
    /// decisions always complete before settlement checks run.
    pub async fn tick(&mut self) -> Result<()> {
        let now = Utc::now();
        self.refresh_fleet_markets(now).await?;
        self.dispatch_idle_ships(now).await?;
        self.settle_arrivals(Utc::now()).await?;
        Ok(())
    }

    /// Refresh the snapshot at every distinct location a ship is parked at,
    /// if stale.
    async fn refresh_fleet_markets(&mut self, now: DateTime<Utc>) -> Result<()> {
        let parked: Vec<(LocationSymbol, ShipId)> = self
            .state
            .ships
            .values()
            .filter_map(|ship| ship.location.clone().map(|loc| (loc, ship.id.clone())))
            .unique_by(|(loc, _)| loc.clone())
            .collect();

        for (location, ship_id) in parked {
            if !self.state.markets.is_fresh(&location, now) {
                self.last_ship = Some(ship_id);
                self.refresh_market(&location).await?;
            }
        }
        Ok(())
    }

    async fn refresh_market(&mut self, location: &LocationSymbol) -> Result<()> {
        let response = self
            .client
            .fetch_market(location)
            .await
            .with_context(|| format!("fetching market at {}", location.0))?;

        let snapshot = self
            .state
            .markets
            .upsert(location.clone(), response.marketplace)
            .clone();
        debug!(location = %location.0, goods = snapshot.goods.len(), "market snapshot refreshed");
        self.emit(StateUpdate::MarketUpdated(snapshot)).await;
        Ok(())
    }

    async fn dispatch_idle_ships(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(system) = self.state.systems.get(&self.state.home_system).cloned() else {
            return Ok(());
        };

        let routes = trading::best_routes_for_system(&system, &self.state.markets);

        let idle: Vec<ShipId> = self
            .state
            .ship_order
            .iter()
            .filter_map(|ship_id| self.state.ships.get(ship_id))
            .filter(|ship| !self.state.dispatched.contains_key(&ship.id))
            .filter(|ship| {
                ship.location
                    .as_ref()
                    .and_then(|loc| system.location(loc))
                    .is_some_and(|loc| !loc.is_wormhole())
            })
            .sorted_by_key(|ship| std::cmp::Reverse(ship.speed))
            .map(|ship| ship.id.clone())
            .collect();

        for ship_id in idle {
            self.last_ship = Some(ship_id.clone());
            self.dispatch_ship(&ship_id, &system, &routes, now).await?;
        }
        Ok(())
    }

    async fn dispatch_ship(
        &mut self,
        ship_id: &ShipId,
        system: &System,
        routes: &[TradeRoute],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ship = self
            .state
            .ships
            .get(ship_id)
            .cloned()
            .with_context(|| format!("unknown ship {}", ship_id.0))?;
        let current_symbol = ship
            .location
            .clone()
            .with_context(|| format!("idle ship {} without a location", ship_id.0))?;
        let current = system
            .location(&current_symbol)
            .cloned()
            .with_context(|| format!("location {} not in system", current_symbol.0))?;

        // exploration first: a fleet trading on bad data loses money faster
        // than one spending a leg on a refresh
        let pending = self.state.pending_scout_targets();
        let candidates = scout::scout_candidates(
            system,
            &self.state.markets,
            self.state.ships.len(),
            &pending,
            now,
        );

        if let Some(top_candidate) = candidates.first().cloned() {
            if top_candidate == current_symbol {
                self.refresh_market(&current_symbol).await?;
            } else if !self.state.is_occupied(&top_candidate) {
                let target = system
                    .location(&top_candidate)
                    .cloned()
                    .with_context(|| format!("location {} not in system", top_candidate.0))?;
                event!(
                    Level::INFO,
                    ship = %ship_id.0,
                    target = %target.symbol.0,
                    "dispatching scout",
                );
                self.dispatch_leg(ship_id, &current, &target, DispatchKind::Scout, now)
                    .await?;
                return Ok(());
            }
        }

        let Some(route) = trading::select_route(routes, system, &self.state.markets).cloned()
        else {
            debug!(ship = %ship_id.0, "no profitable route, idling this tick");
            return Ok(());
        };

        let origin = system
            .location(&route.from)
            .cloned()
            .with_context(|| format!("route origin {} not in system", route.from.0))?;

        if route.is_stale(now) {
            if !pending.contains(&route.from) {
                event!(
                    Level::INFO,
                    ship = %ship_id.0,
                    target = %origin.symbol.0,
                    good = %route.good,
                    "best route is stale, scouting its origin",
                );
                self.dispatch_leg(ship_id, &current, &origin, DispatchKind::Scout, now)
                    .await?;
            } else if let Some(direct) = self.fresh_direct_trade(&current, &origin, now) {
                self.execute_trade_leg(ship_id, &current, &origin, &direct, now)
                    .await?;
            }
            return Ok(());
        }

        if current_symbol != route.from {
            match self.fresh_direct_trade(&current, &origin, now) {
                Some(direct) => {
                    self.execute_trade_leg(ship_id, &current, &origin, &direct, now)
                        .await?
                }
                None => {
                    debug!(ship = %ship_id.0, target = %origin.symbol.0, "repositioning to route origin");
                    self.dispatch_leg(ship_id, &current, &origin, DispatchKind::Scout, now)
                        .await?
                }
            }
            return Ok(());
        }

        // at the route origin: load up and go
        let destination = system
            .location(&route.to)
            .cloned()
            .with_context(|| format!("route destination {} not in system", route.to.0))?;
        let Some(entry) = self
            .state
            .markets
            .get(&route.from)
            .and_then(|snapshot| snapshot.good(&route.good))
            .cloned()
        else {
            return Ok(());
        };

        self.buy_fuel(ship_id, &current, &destination).await?;
        let ship = self.state.ships.get(ship_id).cloned().unwrap_or(ship);
        let units = quantity::max_purchase_quantity(&entry, ship.space_available, self.state.credits);

        if units == 0 {
            debug!(ship = %ship_id.0, good = %route.good, "route affordable quantity is zero, idling");
            return Ok(());
        }

        event!(
            Level::INFO,
            ship = %ship_id.0,
            good = %route.good,
            units,
            from = %route.from.0,
            to = %route.to.0,
            cpdv = route.cpdv.0,
            "executing trade route",
        );

        let response = self.client.buy_good(ship_id, route.good, units).await?;
        self.apply_order(&response).await;
        self.create_flight(ship_id, &destination, DispatchKind::Trade { good: route.good }, now)
            .await?;
        Ok(())
    }

    /// Point-to-point opportunity for a leg the ship flies anyway; only
    /// accepted on fresh data.
    fn fresh_direct_trade(
        &self,
        from: &Location,
        to: &Location,
        now: DateTime<Utc>,
    ) -> Option<DirectTrade> {
        trading::best_direct_trade(from, to, &self.state.markets)
            .filter(|trade| now - trade.last_updated <= fd_domain::market::freshness_threshold())
    }

    async fn execute_trade_leg(
        &mut self,
        ship_id: &ShipId,
        from: &Location,
        to: &Location,
        trade: &DirectTrade,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.buy_fuel(ship_id, from, to).await?;
        let ship = self
            .state
            .ships
            .get(ship_id)
            .cloned()
            .with_context(|| format!("unknown ship {}", ship_id.0))?;
        let units =
            quantity::max_purchase_quantity(&trade.purchase, ship.space_available, self.state.credits);

        if units == 0 {
            debug!(ship = %ship_id.0, target = %to.symbol.0, "nothing affordable to haul, repositioning empty");
            self.dispatch_leg(ship_id, from, to, DispatchKind::Scout, now)
                .await?;
            return Ok(());
        }

        event!(
            Level::INFO,
            ship = %ship_id.0,
            good = %trade.good,
            units,
            from = %from.symbol.0,
            to = %to.symbol.0,
            "trading along the way",
        );

        let response = self.client.buy_good(ship_id, trade.good, units).await?;
        self.apply_order(&response).await;
        self.create_flight(ship_id, to, DispatchKind::Trade { good: trade.good }, now)
            .await?;
        Ok(())
    }

    /// Buy fuel for the leg and create the flight plan in one go.
    async fn dispatch_leg(
        &mut self,
        ship_id: &ShipId,
        from: &Location,
        to: &Location,
        kind: DispatchKind,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.buy_fuel(ship_id, from, to).await?;
        self.create_flight(ship_id, to, kind, now).await?;
        Ok(())
    }

    /// Buys exactly the fuel deficit for the leg, if any. The order response
    /// carries the ship back with the fuel already aboard, so the cargo
    /// space seen by a follow-up goods purchase is already discounted.
    async fn buy_fuel(&mut self, ship_id: &ShipId, from: &Location, to: &Location) -> Result<()> {
        let ship = self
            .state
            .ships
            .get(ship_id)
            .with_context(|| format!("unknown ship {}", ship_id.0))?;

        let deficit = fuel::fuel_deficit(ship, from, to);
        if deficit == 0 {
            return Ok(());
        }

        debug!(ship = %ship_id.0, units = deficit, "buying fuel for leg");
        let response = self.client.buy_good(ship_id, GoodSymbol::FUEL, deficit).await?;
        self.apply_order(&response).await;
        Ok(())
    }

    async fn create_flight(
        &mut self,
        ship_id: &ShipId,
        destination: &Location,
        kind: DispatchKind,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let plan = self
            .client
            .create_flight_plan(ship_id, &destination.symbol)
            .await?;

        if let Some(ship) = self.state.ships.get_mut(ship_id) {
            apply_flight_plan(ship, plan.fuel_remaining);
            let updated = ship.clone();
            self.emit(StateUpdate::ShipUpdated(updated)).await;
        }

        let arrives_at = now + ChronoDuration::seconds(plan.time_remaining_in_seconds as i64);
        self.state.dispatched.insert(
            ship_id.clone(),
            Dispatch {
                ship_id: ship_id.clone(),
                target: destination.symbol.clone(),
                kind,
                arrives_at,
            },
        );
        Ok(())
    }

    /// Settle every dispatch whose ship has arrived. Scout legs just drop
    /// their record; trade legs sell the full held quantity first. A trade
    /// arrival with none of the expected good aboard is an anomaly we
    /// recover from locally instead of failing the run.
    async fn settle_arrivals(&mut self, now: DateTime<Utc>) -> Result<()> {
        for dispatch in self.state.dispatched.values() {
            if dispatch.has_arrived(now) {
                if let Some(ship) = self.state.ships.get_mut(&dispatch.ship_id) {
                    if ship.location.is_none() {
                        ship.location = Some(dispatch.target.clone());
                    }
                }
            }
        }

        let due: Vec<Dispatch> = self
            .state
            .dispatched
            .values()
            .filter(|dispatch| {
                self.state
                    .ships
                    .get(&dispatch.ship_id)
                    .and_then(|ship| ship.location.as_ref())
                    == Some(&dispatch.target)
            })
            .cloned()
            .collect();

        for dispatch in due {
            self.last_ship = Some(dispatch.ship_id.clone());
            match dispatch.kind {
                DispatchKind::Scout => {
                    debug!(ship = %dispatch.ship_id.0, target = %dispatch.target.0, "scout leg complete");
                }
                DispatchKind::Trade { good } => {
                    let held = self
                        .state
                        .ships
                        .get(&dispatch.ship_id)
                        .map(|ship| ship.good_quantity(&good))
                        .unwrap_or(0);

                    if held == 0 {
                        warn!(
                            ship = %dispatch.ship_id.0,
                            good = %good,
                            target = %dispatch.target.0,
                            "trade leg arrived with empty hold, dropping dispatch",
                        );
                    } else {
                        let response = self
                            .client
                            .sell_good(&dispatch.ship_id, good, held)
                            .await?;
                        event!(
                            Level::INFO,
                            ship = %dispatch.ship_id.0,
                            good = %good,
                            units = held,
                            total = response.order.total,
                            credits = response.credits,
                            "trade leg settled",
                        );
                        self.fold_sell_price(&dispatch.target, &response);
                        self.apply_order(&response).await;
                    }
                }
            }
            self.state.dispatched.remove(&dispatch.ship_id);
        }
        Ok(())
    }

    /// The executed order price is newer than the cached snapshot; fold it
    /// back in so the next tick ranks with it.
    fn fold_sell_price(&mut self, location: &LocationSymbol, response: &OrderResponse) {
        let Some(snapshot) = self.state.markets.get(location).cloned() else {
            return;
        };
        let mut goods = snapshot.goods;
        if let Some(entry) = goods
            .iter_mut()
            .find(|entry| entry.symbol == response.order.good)
        {
            entry.sell_price_per_unit = response.order.price_per_unit;
            self.state
                .markets
                .upsert_at(location.clone(), goods, snapshot.updated_at);
        }
    }

    async fn apply_order(&mut self, response: &OrderResponse) {
        if self.state.credits != response.credits {
            self.state.credits = response.credits;
            self.emit(StateUpdate::CreditsChanged(response.credits)).await;
        }
        self.state
            .ships
            .insert(response.ship.id.clone(), response.ship.clone());
        self.emit(StateUpdate::ShipUpdated(response.ship.clone())).await;
    }

    async fn emit(&self, update: StateUpdate) {
        if self
            .events_tx
            .send(DispatcherEvent::Update(update))
            .await
            .is_err()
        {
            debug!("event receiver dropped, update discarded");
        }
    }
}

/// In-flight bookkeeping: the ship has no location until arrival and its
/// fuel cargo drops to what the flight plan left over.
fn apply_flight_plan(ship: &mut Ship, fuel_remaining: u32) {
    ship.location = None;
    let held = ship.fuel_in_cargo();
    let burned = held.saturating_sub(fuel_remaining);
    ship.space_available += burned;
    ship.cargo.retain(|entry| entry.good != GoodSymbol::FUEL);
    if fuel_remaining > 0 {
        ship.cargo.push(fd_domain::ShipCargo {
            good: GoodSymbol::FUEL,
            quantity: fuel_remaining,
            total_volume: fuel_remaining,
        });
    }
}
