use fd_domain::{
    GoodSymbol, Location, LocationSymbol, MarketGood, Ship, ShipCargo, ShipId, System, SystemSymbol,
};

pub struct TestObjects;

impl TestObjects {
    pub(crate) fn system_symbol() -> SystemSymbol {
        SystemSymbol("OE".to_string())
    }

    pub(crate) fn location(symbol: &str, kind: fd_domain::LocationType, x: i64, y: i64) -> Location {
        Location {
            symbol: LocationSymbol(symbol.to_string()),
            r#type: kind,
            name: symbol.to_string(),
            x,
            y,
        }
    }

    pub(crate) fn system(locations: Vec<Location>) -> System {
        System {
            symbol: Self::system_symbol(),
            name: "Omicron Eridani".to_string(),
            locations,
        }
    }

    pub(crate) fn ship(id: &str, location: &str, speed: u32, max_cargo: u32) -> Ship {
        Ship {
            id: ShipId(id.to_string()),
            location: Some(LocationSymbol(location.to_string())),
            r#type: "GR-MK-II".to_string(),
            class: "MK-II".to_string(),
            speed,
            max_cargo,
            space_available: max_cargo,
            cargo: vec![],
        }
    }

    pub(crate) fn fueled_ship(id: &str, location: &str, speed: u32, max_cargo: u32, fuel: u32) -> Ship {
        let mut ship = Self::ship(id, location, speed, max_cargo);
        ship.space_available -= fuel;
        ship.cargo.push(ShipCargo {
            good: GoodSymbol::FUEL,
            quantity: fuel,
            total_volume: fuel,
        });
        ship
    }

    pub(crate) fn market_good(
        symbol: GoodSymbol,
        purchase: i64,
        sell: i64,
        volume_per_unit: u32,
        quantity_available: u32,
    ) -> MarketGood {
        MarketGood {
            symbol,
            purchase_price_per_unit: purchase,
            sell_price_per_unit: sell,
            volume_per_unit,
            quantity_available,
        }
    }
}
