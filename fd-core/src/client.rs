use anyhow::{Context, Result};
use async_trait::async_trait;
use fd_domain::{
    CreateFlightPlanResponse, FleetSnapshot, FlightPlan, GetMarketplaceResponse, GoodSymbol,
    LocationSymbol, Ship, ShipId, System,
};
#[cfg(test)]
use mockall::automock;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Debug;

/// The remote operations the dispatcher consumes. Transport-agnostic; the
/// in-memory universe implements the same contract for tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiClient: Send + Sync + Debug {
    async fn fetch_market(&self, location: &LocationSymbol) -> Result<GetMarketplaceResponse>;

    async fn buy_good(
        &self,
        ship_id: &ShipId,
        good: GoodSymbol,
        quantity: u32,
    ) -> Result<fd_domain::OrderResponse>;

    async fn sell_good(
        &self,
        ship_id: &ShipId,
        good: GoodSymbol,
        quantity: u32,
    ) -> Result<fd_domain::OrderResponse>;

    async fn create_flight_plan(
        &self,
        ship_id: &ShipId,
        destination: &LocationSymbol,
    ) -> Result<FlightPlan>;

    /// Initial seed only; the dispatcher never re-reads the full fleet.
    async fn get_fleet_snapshot(&self) -> Result<FleetSnapshot>;
}

#[derive(Deserialize, Debug, Clone)]
struct ListShipsResponse {
    ships: Vec<Ship>,
}

#[derive(Deserialize, Debug, Clone)]
struct ListSystemsResponse {
    systems: Vec<System>,
}

#[derive(Deserialize, Debug, Clone)]
struct AccountResponse {
    account: AccountInfo,
}

#[derive(Deserialize, Debug, Clone)]
struct AccountInfo {
    credits: i64,
}

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn make_api_call<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let resp = request.send().await.context("Failed to send request")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to get response body")?;

        if !status.is_success() {
            anyhow::bail!("API request failed. Status: {}, Body: {}", status, body);
        }

        serde_json::from_str(&body).map_err(|e| {
            anyhow::anyhow!(
                "Error decoding response: '{:?}'. Response body was: '{}'",
                e,
                body
            )
        })
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch_market(&self, location: &LocationSymbol) -> Result<GetMarketplaceResponse> {
        let request = self
            .client
            .get(self.url(&format!("/locations/{}/marketplace", location.0)));

        Self::make_api_call(request).await
    }

    async fn buy_good(
        &self,
        ship_id: &ShipId,
        good: GoodSymbol,
        quantity: u32,
    ) -> Result<fd_domain::OrderResponse> {
        let query_param_list = [
            ("shipId", ship_id.0.clone()),
            ("good", good.to_string()),
            ("quantity", quantity.to_string()),
        ];

        let request = self
            .client
            .post(self.url("/my/purchase-orders"))
            .query(&query_param_list);

        Self::make_api_call(request).await
    }

    async fn sell_good(
        &self,
        ship_id: &ShipId,
        good: GoodSymbol,
        quantity: u32,
    ) -> Result<fd_domain::OrderResponse> {
        let query_param_list = [
            ("shipId", ship_id.0.clone()),
            ("good", good.to_string()),
            ("quantity", quantity.to_string()),
        ];

        let request = self
            .client
            .post(self.url("/my/sell-orders"))
            .query(&query_param_list);

        Self::make_api_call(request).await
    }

    async fn create_flight_plan(
        &self,
        ship_id: &ShipId,
        destination: &LocationSymbol,
    ) -> Result<FlightPlan> {
        let query_param_list = [
            ("shipId", ship_id.0.clone()),
            ("destination", destination.0.clone()),
        ];

        let request = self
            .client
            .post(self.url("/my/flight-plans"))
            .query(&query_param_list);

        let response: CreateFlightPlanResponse = Self::make_api_call(request).await?;
        Ok(response.flight_plan)
    }

    async fn get_fleet_snapshot(&self) -> Result<FleetSnapshot> {
        let ships: ListShipsResponse =
            Self::make_api_call(self.client.get(self.url("/my/ships"))).await?;
        let systems: ListSystemsResponse =
            Self::make_api_call(self.client.get(self.url("/game/systems"))).await?;
        let account: AccountResponse =
            Self::make_api_call(self.client.get(self.url("/my/account"))).await?;

        Ok(FleetSnapshot {
            ships: ships.ships,
            systems: systems.systems,
            credits: account.account.credits,
            cached_markets: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_domain::OrderResponse;

    #[test]
    fn test_decode_marketplace_response() {
        let marketplace_json = r#"{"marketplace":[{"symbol":"ELECTRONICS","volumePerUnit":1,"purchasePricePerUnit":120,"sellPricePerUnit":114,"quantityAvailable":87218},{"symbol":"FUEL","volumePerUnit":1,"purchasePricePerUnit":3,"sellPricePerUnit":1,"quantityAvailable":84286}]}"#;

        let response: GetMarketplaceResponse = serde_json::from_str(marketplace_json).unwrap();

        assert_eq!(response.marketplace.len(), 2);
        assert_eq!(response.marketplace[0].symbol, GoodSymbol::ELECTRONICS);
        assert_eq!(response.marketplace[0].purchase_price_per_unit, 120);
        assert_eq!(response.marketplace[1].symbol, GoodSymbol::FUEL);
        assert_eq!(response.marketplace[1].quantity_available, 84_286);
    }

    #[test]
    fn test_decode_order_response() {
        let order_json = r#"{"credits":48287,"order":{"good":"FUEL","quantity":3,"pricePerUnit":3,"total":9},"ship":{"id":"ckz0i4","location":"OE-PM","x":20,"y":-25,"cargo":[{"good":"FUEL","quantity":3,"totalVolume":3}],"spaceAvailable":47,"type":"JW-MK-I","class":"MK-I","maxCargo":50,"loadingSpeed":25,"speed":1,"manufacturer":"Jackshaw","plating":5,"weapons":5}}"#;

        let response: OrderResponse = serde_json::from_str(order_json).unwrap();

        assert_eq!(response.credits, 48_287);
        assert_eq!(response.order.good, GoodSymbol::FUEL);
        assert_eq!(response.order.total, 9);
        assert_eq!(response.ship.id, ShipId("ckz0i4".to_string()));
        assert_eq!(response.ship.fuel_in_cargo(), 3);
        assert_eq!(response.ship.space_available, 47);
    }

    #[test]
    fn test_decode_flight_plan_response() {
        let flight_plan_json = r#"{"flightPlan":{"id":"ckz0j9","shipId":"ckz0i4","createdAt":"2026-08-30T12:00:00.000Z","arrivesAt":"2026-08-30T12:01:12.000Z","destination":"OE-CR","departure":"OE-PM","distance":60,"fuelConsumed":16,"fuelRemaining":3,"terminatedAt":null,"timeRemainingInSeconds":72}}"#;

        let response: CreateFlightPlanResponse = serde_json::from_str(flight_plan_json).unwrap();

        let plan = response.flight_plan;
        assert_eq!(plan.ship_id, ShipId("ckz0i4".to_string()));
        assert_eq!(plan.destination, LocationSymbol("OE-CR".to_string()));
        assert_eq!(plan.fuel_consumed, 16);
        assert_eq!(plan.time_remaining_in_seconds, 72);
    }
}
