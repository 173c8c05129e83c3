use crate::model::{Location, LocationType, Ship};

/// Fuel needed for a direct leg, before any departure penalty. Always >= 1.
pub fn fuel_required(from: &Location, to: &Location) -> u32 {
    (from.distance_to(to) as f64 / 4.0).round() as u32 + 1
}

/// Climbing out of a planet's gravity well costs extra fuel, scaled by hull.
/// Other location types launch for free.
pub fn fuel_penalty(ship: &Ship, current: &Location) -> u32 {
    if current.r#type != LocationType::PLANET {
        return 0;
    }
    planet_penalty_for_type(&ship.r#type)
}

fn planet_penalty_for_type(ship_type: &str) -> u32 {
    match ship_type {
        "JW-MK-I" => 1,
        "JW-MK-II" => 2,
        "JW-MK-III" => 2,
        "GR-MK-I" => 1,
        "GR-MK-II" => 1,
        "GR-MK-III" => 1,
        "EM-MK-I" => 2,
        "EM-MK-II" => 2,
        "HM-MK-I" => 2,
        "HM-MK-II" => 2,
        "HM-MK-III" => 1,
        "ZA-MK-I" => 1,
        "ZA-MK-II" => 2,
        "ZA-MK-III" => 3,
        "DR-MK-I" => 4,
        "TD-MK-I" => 2,
        _ => 2,
    }
}

/// Fuel that still has to be bought for the leg, net of fuel already held
/// in cargo. Zero when the tank covers the trip.
pub fn fuel_deficit(ship: &Ship, from: &Location, to: &Location) -> u32 {
    let needed = fuel_required(from, to) + fuel_penalty(ship, from);
    needed.saturating_sub(ship.fuel_in_cargo())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoodSymbol, LocationSymbol, ShipCargo, ShipId};

    fn location(symbol: &str, r#type: LocationType, x: i64, y: i64) -> Location {
        Location {
            symbol: LocationSymbol(symbol.to_string()),
            r#type,
            name: symbol.to_string(),
            x,
            y,
        }
    }

    fn ship(ship_type: &str, fuel: u32) -> Ship {
        let cargo = if fuel > 0 {
            vec![ShipCargo {
                good: GoodSymbol::FUEL,
                quantity: fuel,
                total_volume: fuel,
            }]
        } else {
            vec![]
        };
        Ship {
            id: ShipId("ship-1".to_string()),
            location: Some(LocationSymbol("OE-PM".to_string())),
            r#type: ship_type.to_string(),
            class: "MK-I".to_string(),
            speed: 1,
            max_cargo: 50,
            space_available: 50,
            cargo,
        }
    }

    #[test]
    fn fuel_required_follows_distance_over_four_plus_one() {
        let a = location("OE-PM", LocationType::PLANET, 0, 0);
        let b = location("OE-CR", LocationType::PLANET, 8, 0);
        let c = location("OE-KO", LocationType::MOON, 10, 0);

        assert_eq!(fuel_required(&a, &b), 3);
        assert_eq!(fuel_required(&a, &c), 4);
        // zero distance still burns the launch unit
        assert_eq!(fuel_required(&a, &a), 1);
    }

    #[test]
    fn penalty_applies_only_when_departing_a_planet() {
        let planet = location("OE-PM", LocationType::PLANET, 0, 0);
        let moon = location("OE-PM-TR", LocationType::MOON, 3, 4);

        let freighter = ship("HM-MK-II", 0);
        assert_eq!(fuel_penalty(&freighter, &planet), 2);
        assert_eq!(fuel_penalty(&freighter, &moon), 0);
    }

    #[test]
    fn deficit_is_net_of_fuel_in_cargo() {
        let a = location("OE-PM", LocationType::MOON, 0, 0);
        let b = location("OE-CR", LocationType::PLANET, 8, 0);

        // fuel_required = 3, no penalty from a moon
        assert_eq!(fuel_deficit(&ship("JW-MK-I", 0), &a, &b), 3);
        assert_eq!(fuel_deficit(&ship("JW-MK-I", 2), &a, &b), 1);
        assert_eq!(fuel_deficit(&ship("JW-MK-I", 10), &a, &b), 0);
    }
}
