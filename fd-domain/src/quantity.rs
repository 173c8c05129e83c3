use crate::model::MarketGood;

/// Hard cap on a single purchase order, regardless of credits or cargo room.
pub const MAX_ORDER_UNITS: u32 = 300;

/// Largest sensible purchase of `entry`, bounded by cargo space, credits,
/// market liquidity and the per-order cap. The branches are ordered; the
/// first one that applies wins.
pub fn max_purchase_quantity(entry: &MarketGood, space_available: u32, credits: i64) -> u32 {
    if entry.purchase_price_per_unit <= 0 {
        return 0;
    }
    let volume_per_unit = entry.volume_per_unit.max(1);
    let max_cargo = space_available / volume_per_unit;
    let affordable = (credits / entry.purchase_price_per_unit).max(0) as u32;

    if max_cargo as i64 * entry.purchase_price_per_unit <= credits
        && max_cargo <= entry.quantity_available
        && max_cargo <= MAX_ORDER_UNITS
    {
        max_cargo
    } else if max_cargo > entry.quantity_available && entry.quantity_available <= MAX_ORDER_UNITS {
        entry.quantity_available.min(affordable)
    } else if affordable > MAX_ORDER_UNITS {
        MAX_ORDER_UNITS
    } else {
        affordable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GoodSymbol;

    fn entry(price: i64, volume_per_unit: u32, quantity_available: u32) -> MarketGood {
        MarketGood {
            symbol: GoodSymbol::ELECTRONICS,
            purchase_price_per_unit: price,
            sell_price_per_unit: price + 5,
            volume_per_unit,
            quantity_available,
        }
    }

    #[test]
    fn full_hold_when_everything_fits() {
        // 80 units fit, cost 800 <= 1000 credits, market has plenty
        assert_eq!(max_purchase_quantity(&entry(10, 1, 500), 80, 1_000), 80);
    }

    #[test]
    fn thin_market_caps_at_quantity_available() {
        // maxCargo = 500 > 50 available, 50 <= 300
        assert_eq!(max_purchase_quantity(&entry(10, 1, 50), 500, 1_000), 50);
    }

    #[test]
    fn deep_pockets_hit_the_per_order_cap() {
        // affordable = 10_000, liquid market, but orders stop at 300
        assert_eq!(
            max_purchase_quantity(&entry(10, 1, 100_000), 100_000, 100_000),
            300
        );
    }

    #[test]
    fn low_credits_fall_through_to_affordability() {
        // maxCargo = 500 costs 5000 > 120 credits, market deep, 12 affordable
        assert_eq!(max_purchase_quantity(&entry(10, 1, 400), 500, 120), 12);
    }

    #[test]
    fn volume_per_unit_shrinks_the_hold() {
        // 80 space / 2 volume = 40 units
        assert_eq!(max_purchase_quantity(&entry(10, 2, 500), 80, 10_000), 40);
    }

    #[test]
    fn result_never_exceeds_credits_cap_or_liquidity() {
        for (space, credits, available) in [
            (500u32, 1_000i64, 50u32),
            (80, 120, 400),
            (1_000, 1_000_000, 1_000),
            (10, 5, 10),
            (0, 1_000, 10),
        ] {
            let market_entry = entry(10, 1, available);
            let quantity = max_purchase_quantity(&market_entry, space, credits);
            assert!(quantity as i64 * market_entry.purchase_price_per_unit <= credits);
            assert!(quantity <= MAX_ORDER_UNITS);
            assert!(quantity <= available);
        }
    }
}
