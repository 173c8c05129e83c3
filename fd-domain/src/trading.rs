use crate::fuel;
use crate::market::{freshness_threshold, MarketCache, MarketSnapshot};
use crate::model::{GoodSymbol, Location, LocationSymbol, MarketGood, System};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A scored point-to-point trade for one good. Recomputed every tick from
/// the market cache; never persisted.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TradeRoute {
    pub good: GoodSymbol,
    pub from: LocationSymbol,
    pub to: LocationSymbol,
    pub fuel_required: u32,
    /// Credits per distance unit per cargo volume unit.
    pub cpdv: OrderedFloat<f64>,
    /// Timestamp of the older of the two snapshots backing this route.
    pub last_updated: DateTime<Utc>,
}

impl TradeRoute {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.last_updated > freshness_threshold()
    }
}

/// Best good to haul on one specific leg, with the purchase-side market
/// entry needed to size the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectTrade {
    pub good: GoodSymbol,
    pub purchase: MarketGood,
    pub cpdv: OrderedFloat<f64>,
    pub last_updated: DateTime<Utc>,
}

fn score(credit_diff: i64, distance: u32, volume_per_unit: u32) -> f64 {
    credit_diff as f64 / distance.max(1) as f64 / volume_per_unit.max(1) as f64
}

/// For every tradable good in the system, keep the single highest-scoring
/// (from, to) pair with a positive cpdv. Result is sorted descending by cpdv.
pub fn best_routes_for_system(system: &System, cache: &MarketCache) -> Vec<TradeRoute> {
    let locations_with_data: Vec<(&Location, &MarketSnapshot)> = system
        .locations
        .iter()
        .filter_map(|location| cache.get(&location.symbol).map(|snapshot| (location, snapshot)))
        .collect_vec();

    let goods: HashSet<GoodSymbol> = locations_with_data
        .iter()
        .flat_map(|(_, snapshot)| snapshot.goods.iter().map(|entry| entry.symbol))
        .filter(GoodSymbol::is_tradable)
        .collect();

    goods
        .into_iter()
        .filter_map(|good| {
            locations_with_data
                .iter()
                .cartesian_product(locations_with_data.iter())
                .filter(|((from, _), (to, _))| from.symbol != to.symbol)
                .filter_map(|((from, from_snapshot), (to, to_snapshot))| {
                    let purchase = from_snapshot.good(&good)?;
                    let sell = to_snapshot.good(&good)?;
                    let credit_diff = sell.sell_price_per_unit - purchase.purchase_price_per_unit;
                    let cpdv = score(credit_diff, from.distance_to(to), purchase.volume_per_unit);
                    (cpdv > 0.0).then(|| TradeRoute {
                        good,
                        from: from.symbol.clone(),
                        to: to.symbol.clone(),
                        fuel_required: fuel::fuel_required(from, to),
                        cpdv: OrderedFloat(cpdv),
                        last_updated: from_snapshot.updated_at.min(to_snapshot.updated_at),
                    })
                })
                .max_by_key(|route| route.cpdv)
        })
        .sorted_by_key(|route| std::cmp::Reverse(route.cpdv))
        .collect_vec()
}

/// Point-to-point variant: the best good carried by both endpoints that can
/// be bought at `from` and sold at `to` for a positive score. Used to answer
/// "can I profit on a leg I must fly anyway".
pub fn best_direct_trade(from: &Location, to: &Location, cache: &MarketCache) -> Option<DirectTrade> {
    let from_snapshot = cache.get(&from.symbol)?;
    let to_snapshot = cache.get(&to.symbol)?;
    let distance = from.distance_to(to);

    from_snapshot
        .goods
        .iter()
        .filter(|purchase| purchase.symbol.is_tradable())
        .filter_map(|purchase| {
            let sell = to_snapshot.good(&purchase.symbol)?;
            let credit_diff = sell.sell_price_per_unit - purchase.purchase_price_per_unit;
            let cpdv = score(credit_diff, distance, purchase.volume_per_unit);
            (cpdv > 0.0).then(|| DirectTrade {
                good: purchase.symbol,
                purchase: purchase.clone(),
                cpdv: OrderedFloat(cpdv),
                last_updated: from_snapshot.updated_at.min(to_snapshot.updated_at),
            })
        })
        .max_by_key(|trade| trade.cpdv)
}

/// Pick the route a ship should commit to. The top route wins outright when
/// any listed route starts where it ends (a return leg exists, profitability
/// of that leg deliberately unverified). Otherwise prefer the first
/// alternative whose outbound score plus its own computed return-leg score
/// beats the top route alone.
pub fn select_route<'a>(
    routes: &'a [TradeRoute],
    system: &System,
    cache: &MarketCache,
) -> Option<&'a TradeRoute> {
    let top = routes.first()?;

    if routes.iter().any(|route| route.from == top.to) {
        return Some(top);
    }

    for candidate in routes.iter().skip(1) {
        let (Some(from), Some(to)) = (
            system.location(&candidate.from),
            system.location(&candidate.to),
        ) else {
            continue;
        };
        if let Some(return_leg) = best_direct_trade(to, from, cache) {
            if candidate.cpdv.0 + return_leg.cpdv.0 > top.cpdv.0 {
                return Some(candidate);
            }
        }
    }

    Some(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationType;
    use chrono::Duration;

    fn location(symbol: &str, x: i64, y: i64) -> Location {
        Location {
            symbol: LocationSymbol(symbol.to_string()),
            r#type: LocationType::PLANET,
            name: symbol.to_string(),
            x,
            y,
        }
    }

    fn entry(good: GoodSymbol, purchase: i64, sell: i64, volume: u32) -> MarketGood {
        MarketGood {
            symbol: good,
            purchase_price_per_unit: purchase,
            sell_price_per_unit: sell,
            volume_per_unit: volume,
            quantity_available: 1_000,
        }
    }

    fn system(locations: Vec<Location>) -> System {
        System {
            symbol: crate::model::SystemSymbol("OE".to_string()),
            name: "Omega".to_string(),
            locations,
        }
    }

    #[test]
    fn electronics_route_scores_ten_and_wins() {
        let a = location("OE-A", 0, 0);
        let b = location("OE-B", 4, 0);
        let system = system(vec![a.clone(), b.clone()]);

        let now = Utc::now();
        let mut cache = MarketCache::new();
        cache.upsert_at(
            a.symbol.clone(),
            vec![
                entry(GoodSymbol::ELECTRONICS, 10, 8, 1),
                entry(GoodSymbol::METALS, 5, 4, 1),
            ],
            now,
        );
        cache.upsert_at(
            b.symbol.clone(),
            vec![
                entry(GoodSymbol::ELECTRONICS, 55, 50, 1),
                entry(GoodSymbol::METALS, 7, 6, 1),
            ],
            now,
        );

        let routes = best_routes_for_system(&system, &cache);

        let top = &routes[0];
        assert_eq!(top.good, GoodSymbol::ELECTRONICS);
        assert_eq!(top.from, a.symbol);
        assert_eq!(top.to, b.symbol);
        assert_eq!(top.cpdv, OrderedFloat(10.0));
        assert_eq!(top.fuel_required, 2);

        // one retained route per good, descending by cpdv
        assert_eq!(routes.len(), 2);
        assert!(routes[0].cpdv >= routes[1].cpdv);
        assert_eq!(routes[1].good, GoodSymbol::METALS);
    }

    #[test]
    fn unprofitable_pairs_are_discarded() {
        let a = location("OE-A", 0, 0);
        let b = location("OE-B", 4, 0);
        let system = system(vec![a.clone(), b.clone()]);

        let now = Utc::now();
        let mut cache = MarketCache::new();
        cache.upsert_at(a.symbol.clone(), vec![entry(GoodSymbol::FOOD, 50, 45, 1)], now);
        cache.upsert_at(b.symbol.clone(), vec![entry(GoodSymbol::FOOD, 52, 50, 1)], now);

        assert!(best_routes_for_system(&system, &cache).is_empty());
    }

    #[test]
    fn fuel_and_research_never_form_routes() {
        let a = location("OE-A", 0, 0);
        let b = location("OE-B", 4, 0);
        let system = system(vec![a.clone(), b.clone()]);

        let now = Utc::now();
        let mut cache = MarketCache::new();
        cache.upsert_at(
            a.symbol.clone(),
            vec![entry(GoodSymbol::FUEL, 1, 1, 1), entry(GoodSymbol::RESEARCH, 10, 9, 1)],
            now,
        );
        cache.upsert_at(
            b.symbol.clone(),
            vec![entry(GoodSymbol::FUEL, 9, 8, 1), entry(GoodSymbol::RESEARCH, 90, 80, 1)],
            now,
        );

        assert!(best_routes_for_system(&system, &cache).is_empty());
    }

    #[test]
    fn route_freshness_tracks_the_older_snapshot() {
        let a = location("OE-A", 0, 0);
        let b = location("OE-B", 4, 0);
        let system = system(vec![a.clone(), b.clone()]);

        let now = Utc::now();
        let old = now - Duration::minutes(11);
        let mut cache = MarketCache::new();
        cache.upsert_at(a.symbol.clone(), vec![entry(GoodSymbol::FOOD, 10, 8, 1)], old);
        cache.upsert_at(b.symbol.clone(), vec![entry(GoodSymbol::FOOD, 50, 45, 1)], now);

        let routes = best_routes_for_system(&system, &cache);
        assert_eq!(routes[0].last_updated, old);
        assert!(routes[0].is_stale(now));
    }

    #[test]
    fn direct_trade_only_considers_shared_goods() {
        let a = location("OE-A", 0, 0);
        let b = location("OE-B", 4, 0);

        let now = Utc::now();
        let mut cache = MarketCache::new();
        cache.upsert_at(
            a.symbol.clone(),
            vec![
                entry(GoodSymbol::ELECTRONICS, 10, 8, 1),
                // huge margin but B does not carry it
                entry(GoodSymbol::NANOBOTS, 1, 1, 1),
            ],
            now,
        );
        cache.upsert_at(b.symbol.clone(), vec![entry(GoodSymbol::ELECTRONICS, 55, 50, 1)], now);

        let trade = best_direct_trade(&a, &b, &cache).unwrap();
        assert_eq!(trade.good, GoodSymbol::ELECTRONICS);
        assert_eq!(trade.cpdv, OrderedFloat(10.0));

        // no overlap at all -> no trade
        let c = location("OE-C", 8, 0);
        cache.upsert_at(c.symbol.clone(), vec![entry(GoodSymbol::METALS, 5, 4, 1)], now);
        assert!(best_direct_trade(&a, &c, &cache).is_none());
    }

    #[test]
    fn top_route_wins_when_a_return_leg_exists() {
        let now = Utc::now();
        let route = |good, from: &str, to: &str, cpdv: f64| TradeRoute {
            good,
            from: LocationSymbol(from.to_string()),
            to: LocationSymbol(to.to_string()),
            fuel_required: 2,
            cpdv: OrderedFloat(cpdv),
            last_updated: now,
        };

        let routes = vec![
            route(GoodSymbol::ELECTRONICS, "OE-A", "OE-B", 10.0),
            route(GoodSymbol::METALS, "OE-B", "OE-A", 3.0),
        ];

        let system = system(vec![location("OE-A", 0, 0), location("OE-B", 4, 0)]);
        let cache = MarketCache::new();

        let selected = select_route(&routes, &system, &cache).unwrap();
        assert_eq!(selected.good, GoodSymbol::ELECTRONICS);
    }

    #[test]
    fn alternative_with_profitable_return_beats_dead_end_top() {
        let a = location("OE-A", 0, 0);
        let b = location("OE-B", 4, 0);
        let c = location("OE-C", 0, 4);
        let d = location("OE-D", 4, 4);
        let system = system(vec![a.clone(), b.clone(), c.clone(), d.clone()]);

        let now = Utc::now();
        let mut cache = MarketCache::new();
        // C -> D leg is moderately profitable both ways
        cache.upsert_at(
            c.symbol.clone(),
            vec![entry(GoodSymbol::METALS, 10, 8, 1), entry(GoodSymbol::FOOD, 60, 58, 1)],
            now,
        );
        cache.upsert_at(
            d.symbol.clone(),
            vec![entry(GoodSymbol::METALS, 60, 42, 1), entry(GoodSymbol::FOOD, 20, 18, 1)],
            now,
        );

        let route = |good, from: &Location, to: &Location, cpdv: f64| TradeRoute {
            good,
            from: from.symbol.clone(),
            to: to.symbol.clone(),
            fuel_required: 2,
            cpdv: OrderedFloat(cpdv),
            last_updated: now,
        };

        // top route ends at B and nothing starts there; C->D has a computed
        // return leg D->C (FOOD, cpdv 9.5 = (58-20)/4) so 8.0 + 9.5 > 10.0
        let routes = vec![
            route(GoodSymbol::ELECTRONICS, &a, &b, 10.0),
            route(GoodSymbol::METALS, &c, &d, 8.0),
        ];

        let selected = select_route(&routes, &system, &cache).unwrap();
        assert_eq!(selected.good, GoodSymbol::METALS);

        // drop the return-leg data -> fallback to the top route
        let empty_cache = MarketCache::new();
        let selected = select_route(&routes, &system, &empty_cache).unwrap();
        assert_eq!(selected.good, GoodSymbol::ELECTRONICS);
    }
}
