//! Trade-route queries.
//!
//! [`TradingProvider`] is what the trade division's functions call.
//! [`PriceTable`] is an in-memory implementation over a TOML price list:
//! tradeports with the prices they buy and sell commodities at, grouped by
//! planet, moon and city.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WingmanError};

/// Maximum routes returned by one query.
pub const MAX_ROUTES: usize = 5;

/// One leg of a trade, or just the selling side of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRoute {
    /// Commodity name.
    pub commodity: String,
    /// Where to buy, when the query involves buying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_at_tradeport_name: Option<String>,
    /// Planet of the buying tradeport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_planet: Option<String>,
    /// Moon of the buying tradeport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_satellite: Option<String>,
    /// Price per unit when buying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<f64>,
    /// Where to sell.
    pub sell_at_tradeport_name: String,
    /// Planet of the selling tradeport.
    pub sell_planet: String,
    /// Moon of the selling tradeport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_satellite: Option<String>,
    /// Price per unit when selling.
    pub sell_price: f64,
    /// Profit per unit, when buying is part of the route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
}

impl TradeRoute {
    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let sell_area = self.sell_satellite.as_deref().unwrap_or(&self.sell_planet);
        match (&self.buy_at_tradeport_name, self.profit) {
            (Some(buy_at), Some(profit)) => {
                let buy_area = self
                    .buy_satellite
                    .as_deref()
                    .or(self.buy_planet.as_deref())
                    .unwrap_or_default();
                format!(
                    "Buy {} at {buy_at} ({buy_area}). Sell at {} ({sell_area}). Profit: {profit} aUEC.",
                    self.commodity, self.sell_at_tradeport_name
                )
            }
            _ => format!(
                "Sell {} at {} ({sell_area}) for {} aUEC.",
                self.commodity, self.sell_at_tradeport_name, self.sell_price
            ),
        }
    }
}

/// Result of a trade query, serialized verbatim into the tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeQueryResult {
    /// Whether routes were found.
    pub success: bool,
    /// Ranked routes, best first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trade_routes: Vec<TradeRoute>,
    /// Explanation when nothing was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TradeQueryResult {
    /// Successful result with ranked routes.
    pub fn routes(trade_routes: Vec<TradeRoute>) -> Self {
        Self {
            success: true,
            trade_routes,
            message: None,
        }
    }

    /// Failed result with a human-readable message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            trade_routes: Vec::new(),
            message: Some(message.into()),
        }
    }

    /// The best route, if any.
    pub fn best(&self) -> Option<&TradeRoute> {
        self.trade_routes.first()
    }
}

/// Trading data source.
pub trait TradingProvider: Send + Sync {
    /// Planet, moon, city and tradeport names.
    fn location_names(&self) -> Vec<String>;

    /// Planet and moon names.
    fn area_names(&self) -> Vec<String>;

    /// Commodity names.
    fn commodity_names(&self) -> Vec<String>;

    /// Most profitable trades starting at `location`.
    fn best_trade_from_location(&self, location: &str, include_illegal: bool) -> TradeQueryResult;

    /// Most profitable trades from `from` to `to`.
    fn best_trade_between_locations(
        &self,
        from: &str,
        to: &str,
        include_illegal: bool,
    ) -> TradeQueryResult;

    /// Best tradeports at `location` to sell `commodity`.
    fn best_sell_price_at_location(&self, location: &str, commodity: &str) -> TradeQueryResult;

    /// Most profitable trades of `commodity` anywhere.
    fn best_trade_for_commodity(&self, commodity: &str) -> TradeQueryResult;

    /// Best places anywhere to sell `commodity`.
    fn best_selling_location_for_commodity(&self, commodity: &str) -> TradeQueryResult;
}

// ── Price table ─────────────────────────────────────────────

/// A tradeable commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    /// Display name.
    pub name: String,
    /// Short code used in tradeport price lists.
    pub code: String,
    /// Restricted goods are skipped unless asked for.
    #[serde(default)]
    pub illegal: bool,
}

/// A tradeport and its prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tradeport {
    /// Display name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// Planet the port belongs to.
    pub planet: String,
    /// Moon, for ports on a moon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite: Option<String>,
    /// City, for ports inside a landing zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Commodity code → price the player pays.
    #[serde(default)]
    pub buy: BTreeMap<String, f64>,
    /// Commodity code → price the player receives.
    #[serde(default)]
    pub sell: BTreeMap<String, f64>,
}

impl Tradeport {
    fn is_in(&self, location: &str) -> bool {
        let eq = |s: &str| s.eq_ignore_ascii_case(location);
        eq(&self.planet)
            || self.satellite.as_deref().is_some_and(eq)
            || self.city.as_deref().is_some_and(eq)
    }

    fn is_named(&self, location: &str) -> bool {
        self.name.eq_ignore_ascii_case(location) || self.code.eq_ignore_ascii_case(location)
    }
}

/// In-memory price list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTable {
    /// Known commodities.
    pub commodities: Vec<Commodity>,
    /// Known tradeports.
    pub tradeports: Vec<Tradeport>,
}

impl PriceTable {
    /// Load a price table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a price table from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`WingmanError::Trading`] when the text is not a valid table.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| WingmanError::Trading(e.to_string()))
    }

    fn commodity(&self, name: &str) -> Option<&Commodity> {
        self.commodities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name) || c.code.eq_ignore_ascii_case(name))
    }

    fn commodity_by_code(&self, code: &str) -> Option<&Commodity> {
        self.commodities.iter().find(|c| c.code == code)
    }

    /// Ports matching `location`: the named port itself, or every port on
    /// that planet, moon or city. `None` when nothing matches.
    fn ports_at(&self, location: &str) -> Option<Vec<&Tradeport>> {
        let location = location.trim();
        if let Some(port) = self.tradeports.iter().find(|p| p.is_named(location)) {
            return Some(vec![port]);
        }
        let ports: Vec<&Tradeport> = self.tradeports.iter().filter(|p| p.is_in(location)).collect();
        (!ports.is_empty()).then_some(ports)
    }

    fn routes(
        &self,
        buy_ports: &[&Tradeport],
        sell_ports: &[&Tradeport],
        only: Option<&Commodity>,
        include_illegal: bool,
    ) -> Vec<TradeRoute> {
        let mut routes = Vec::new();
        for buy_port in buy_ports {
            for (code, buy_price) in &buy_port.buy {
                let Some(commodity) = self.commodity_by_code(code) else {
                    continue;
                };
                if only.is_some_and(|c| c.code != commodity.code)
                    || (commodity.illegal && !include_illegal)
                {
                    continue;
                }
                for sell_port in sell_ports {
                    if sell_port.code == buy_port.code {
                        continue;
                    }
                    let Some(sell_price) = sell_port.sell.get(code) else {
                        continue;
                    };
                    let profit = sell_price - buy_price;
                    if profit <= 0.0 {
                        continue;
                    }
                    routes.push(TradeRoute {
                        commodity: commodity.name.clone(),
                        buy_at_tradeport_name: Some(buy_port.name.clone()),
                        buy_planet: Some(buy_port.planet.clone()),
                        buy_satellite: buy_port.satellite.clone(),
                        buy_price: Some(*buy_price),
                        sell_at_tradeport_name: sell_port.name.clone(),
                        sell_planet: sell_port.planet.clone(),
                        sell_satellite: sell_port.satellite.clone(),
                        sell_price: *sell_price,
                        profit: Some(profit),
                    });
                }
            }
        }
        routes.sort_by(|a, b| {
            b.profit
                .unwrap_or_default()
                .total_cmp(&a.profit.unwrap_or_default())
        });
        routes.truncate(MAX_ROUTES);
        routes
    }

    fn sell_offers(&self, ports: &[&Tradeport], commodity: &Commodity) -> Vec<TradeRoute> {
        let mut offers: Vec<TradeRoute> = ports
            .iter()
            .filter_map(|port| {
                port.sell.get(&commodity.code).map(|price| TradeRoute {
                    commodity: commodity.name.clone(),
                    buy_at_tradeport_name: None,
                    buy_planet: None,
                    buy_satellite: None,
                    buy_price: None,
                    sell_at_tradeport_name: port.name.clone(),
                    sell_planet: port.planet.clone(),
                    sell_satellite: port.satellite.clone(),
                    sell_price: *price,
                    profit: None,
                })
            })
            .collect();
        offers.sort_by(|a, b| b.sell_price.total_cmp(&a.sell_price));
        offers.truncate(MAX_ROUTES);
        offers
    }

    fn unavailable(&self) -> Option<TradeQueryResult> {
        self.tradeports
            .is_empty()
            .then(|| TradeQueryResult::failure("Trading data is not available right now."))
    }

    fn all_ports(&self) -> Vec<&Tradeport> {
        self.tradeports.iter().collect()
    }
}

fn unknown_commodity(name: &str) -> TradeQueryResult {
    TradeQueryResult::failure(format!(
        "The commodity {name} could not be identified. Ask the player to repeat the name clearly."
    ))
}

impl TradingProvider for PriceTable {
    fn location_names(&self) -> Vec<String> {
        let mut names = self.area_names();
        for port in &self.tradeports {
            if let Some(city) = &port.city
                && !names.contains(city)
            {
                names.push(city.clone());
            }
        }
        names.extend(self.tradeports.iter().map(|p| p.name.clone()));
        names
    }

    fn area_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for port in &self.tradeports {
            if !names.contains(&port.planet) {
                names.push(port.planet.clone());
            }
        }
        for port in &self.tradeports {
            if let Some(moon) = &port.satellite
                && !names.contains(moon)
            {
                names.push(moon.clone());
            }
        }
        names
    }

    fn commodity_names(&self) -> Vec<String> {
        self.commodities.iter().map(|c| c.name.clone()).collect()
    }

    fn best_trade_from_location(&self, location: &str, include_illegal: bool) -> TradeQueryResult {
        if let Some(unavailable) = self.unavailable() {
            return unavailable;
        }
        let Some(from) = self.ports_at(location) else {
            return TradeQueryResult::failure(format!("Location not recognised: {location}"));
        };
        let routes = self.routes(&from, &self.all_ports(), None, include_illegal);
        if routes.is_empty() {
            return TradeQueryResult::failure(format!(
                "No profitable trade route found starting at {location}."
            ));
        }
        TradeQueryResult::routes(routes)
    }

    fn best_trade_between_locations(
        &self,
        from: &str,
        to: &str,
        include_illegal: bool,
    ) -> TradeQueryResult {
        if let Some(unavailable) = self.unavailable() {
            return unavailable;
        }
        let Some(from_ports) = self.ports_at(from) else {
            return TradeQueryResult::failure(format!("Start location not recognised: {from}"));
        };
        let Some(to_ports) = self.ports_at(to) else {
            return TradeQueryResult::failure(format!("Target location not recognised: {to}"));
        };
        let routes = self.routes(&from_ports, &to_ports, None, include_illegal);
        if routes.is_empty() {
            return TradeQueryResult::failure(format!(
                "No profitable trade route found between {from} and {to}."
            ));
        }
        TradeQueryResult::routes(routes)
    }

    fn best_sell_price_at_location(&self, location: &str, commodity: &str) -> TradeQueryResult {
        if let Some(unavailable) = self.unavailable() {
            return unavailable;
        }
        let Some(ports) = self.ports_at(location) else {
            return TradeQueryResult::failure(format!(
                "The location {location} could not be found. The player should try again speaking clearly."
            ));
        };
        let Some(commodity_entry) = self.commodity(commodity) else {
            return unknown_commodity(commodity);
        };
        let offers = self.sell_offers(&ports, commodity_entry);
        if offers.is_empty() {
            return TradeQueryResult::failure(format!(
                "No tradeport at {location} buys {}.",
                commodity_entry.name
            ));
        }
        TradeQueryResult::routes(offers)
    }

    fn best_trade_for_commodity(&self, commodity: &str) -> TradeQueryResult {
        if let Some(unavailable) = self.unavailable() {
            return unavailable;
        }
        let Some(commodity_entry) = self.commodity(commodity) else {
            return unknown_commodity(commodity);
        };
        let ports = self.all_ports();
        let routes = self.routes(&ports, &ports, Some(commodity_entry), true);
        if routes.is_empty() {
            return TradeQueryResult::failure(format!(
                "No profitable trade route found for {}.",
                commodity_entry.name
            ));
        }
        TradeQueryResult::routes(routes)
    }

    fn best_selling_location_for_commodity(&self, commodity: &str) -> TradeQueryResult {
        if let Some(unavailable) = self.unavailable() {
            return unavailable;
        }
        let Some(commodity_entry) = self.commodity(commodity) else {
            return unknown_commodity(commodity);
        };
        let offers = self.sell_offers(&self.all_ports(), commodity_entry);
        if offers.is_empty() {
            return TradeQueryResult::failure(format!(
                "No tradeport buys {} at the moment.",
                commodity_entry.name
            ));
        }
        TradeQueryResult::routes(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
[[commodities]]
name = "Laranite"
code = "LARA"

[[commodities]]
name = "Medical Supplies"
code = "MEDS"

[[commodities]]
name = "WiDoW"
code = "WIDO"
illegal = true

[[tradeports]]
name = "Lorville Central Business District"
code = "LOCBD"
planet = "Hurston"
city = "Lorville"
buy = { MEDS = 17.0 }
sell = { LARA = 31.0 }

[[tradeports]]
name = "HDMS-Edmond"
code = "HDMSED"
planet = "Hurston"
satellite = "Ita"
buy = { LARA = 27.5, WIDO = 50.0 }

[[tradeports]]
name = "Port Olisar"
code = "PORO"
planet = "Crusader"
sell = { MEDS = 19.5, LARA = 29.0, WIDO = 80.0 }

[[tradeports]]
name = "Grim HEX"
code = "GRIM"
planet = "Crusader"
satellite = "Yela"
sell = { WIDO = 95.0, MEDS = 18.0 }
"#;

    fn table() -> PriceTable {
        match PriceTable::from_toml_str(TABLE) {
            Ok(t) => t,
            Err(e) => unreachable!("test table parses: {e}"),
        }
    }

    #[test]
    fn name_listings() {
        let table = table();
        assert_eq!(table.area_names(), vec!["Hurston", "Crusader", "Ita", "Yela"]);
        let locations = table.location_names();
        assert!(locations.contains(&"Lorville".to_string()));
        assert!(locations.contains(&"Port Olisar".to_string()));
        assert_eq!(table.commodity_names().len(), 3);
    }

    #[test]
    fn best_trade_from_planet_ranks_by_profit() {
        let result = table().best_trade_from_location("hurston", false);
        assert!(result.success);
        let best = result.best().cloned();
        let best = match best {
            Some(b) => b,
            None => unreachable!("a route exists"),
        };
        assert_eq!(best.commodity, "Laranite");
        assert_eq!(best.sell_at_tradeport_name, "Lorville Central Business District");
        assert_eq!(best.profit, Some(3.5));
        let profits: Vec<f64> = result.trade_routes.iter().filter_map(|r| r.profit).collect();
        assert!(profits.windows(2).all(|w| w[0] >= w[1]));
        assert!(result.trade_routes.iter().all(|r| r.commodity != "WiDoW"));
    }

    #[test]
    fn illegal_goods_only_on_request() {
        let result = table().best_trade_from_location("Ita", true);
        assert_eq!(result.best().map(|r| r.commodity.as_str()), Some("WiDoW"));
        assert_eq!(
            result.best().map(|r| r.sell_at_tradeport_name.as_str()),
            Some("Grim HEX")
        );
    }

    #[test]
    fn between_locations_respects_destination() {
        let result = table().best_trade_between_locations("Lorville", "Crusader", false);
        assert!(result.success);
        assert!(result.trade_routes.iter().all(|r| r.sell_planet == "Crusader"));
        assert_eq!(result.best().map(|r| r.profit), Some(Some(2.5)));

        let unknown = table().best_trade_between_locations("Lorville", "Pyro", false);
        assert!(!unknown.success);
        assert_eq!(
            unknown.message.as_deref(),
            Some("Target location not recognised: Pyro")
        );
    }

    #[test]
    fn sell_price_at_location() {
        let result = table().best_sell_price_at_location("Crusader", "medical supplies");
        assert!(result.success);
        assert_eq!(result.trade_routes.len(), 2);
        assert_eq!(result.trade_routes[0].sell_at_tradeport_name, "Port Olisar");
        assert!(result.trade_routes[0].profit.is_none());

        let none = table().best_sell_price_at_location("Ita", "Laranite");
        assert!(!none.success);
    }

    #[test]
    fn commodity_queries() {
        let route = table().best_trade_for_commodity("LARA");
        assert_eq!(route.best().map(|r| r.buy_at_tradeport_name.as_deref()), Some(Some("HDMS-Edmond")));

        let selling = table().best_selling_location_for_commodity("WiDoW");
        assert_eq!(selling.best().map(|r| r.sell_price), Some(95.0));

        let unknown = table().best_trade_for_commodity("Unobtainium");
        assert!(!unknown.success);
        assert!(unknown.message.is_some_and(|m| m.contains("Unobtainium")));
    }

    #[test]
    fn empty_table_reports_unavailable() {
        let result = PriceTable::default().best_trade_for_commodity("Laranite");
        assert!(!result.success);
        assert_eq!(
            result.message.as_deref(),
            Some("Trading data is not available right now.")
        );
    }

    #[test]
    fn summaries_and_json_shape() {
        let result = table().best_trade_from_location("HDMS-Edmond", false);
        let summary = result.best().map(TradeRoute::summary).unwrap_or_default();
        assert_eq!(
            summary,
            "Buy Laranite at HDMS-Edmond (Ita). Sell at Lorville Central Business District (Hurston). Profit: 3.5 aUEC."
        );

        let json = serde_json::to_value(TradeQueryResult::failure("nope")).unwrap_or_default();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "nope");
        assert!(json.get("trade_routes").is_none());
    }
}
