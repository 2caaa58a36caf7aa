//! Function schemas offered to the model, per persona.
//!
//! The set of callable functions is closed; [`ToolFunction`] is the routing
//! table the dispatcher matches on. Enum values inside the schemas (command
//! names, locations, commodities, employee voices) are snapshotted when the
//! [`ToolCatalog`] is built.

use serde_json::json;

use crate::llm::provider::ToolDefinition;
use crate::persona::Persona;

/// Function names.
pub mod names {
    /// Persona switch.
    pub const SWITCH_CONTEXT: &str = "switch_context";
    /// Configured command or game keybinding.
    pub const EXECUTE_COMMAND: &str = "execute_command";
    /// Trade division employee change.
    pub const SWITCH_TDD_EMPLOYEE: &str = "switch_tdd_employee";
    /// Trades starting at a location.
    pub const TRADE_FROM_LOCATION: &str = "find_best_trade_route_from_location";
    /// Trades between two locations.
    pub const TRADE_BETWEEN_LOCATIONS: &str = "find_best_trade_route_between_locations";
    /// Selling a commodity at a location.
    pub const SELL_PRICE_AT_LOCATION: &str = "find_best_sell_price_for_commodity_at_location";
    /// Trades of one commodity.
    pub const TRADE_FOR_COMMODITY: &str = "find_best_trade_route_for_commodity";
    /// Selling a commodity anywhere.
    pub const SELLING_LOCATION_FOR_COMMODITY: &str = "find_best_selling_location_for_commodity";
}

/// Trading query kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeQuery {
    /// `find_best_trade_route_from_location`
    FromLocation,
    /// `find_best_trade_route_between_locations`
    BetweenLocations,
    /// `find_best_sell_price_for_commodity_at_location`
    SellPriceAtLocation,
    /// `find_best_trade_route_for_commodity`
    ForCommodity,
    /// `find_best_selling_location_for_commodity`
    SellingLocationForCommodity,
}

/// Every function the model can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFunction {
    /// Switch persona context.
    SwitchContext,
    /// Change the trade division's employee voice.
    SwitchSubRole,
    /// Run a configured command or keybinding.
    ExecuteCommand,
    /// Trading lookup.
    Trade(TradeQuery),
}

impl ToolFunction {
    /// Resolve a function name from a tool call.
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            names::SWITCH_CONTEXT => Self::SwitchContext,
            names::SWITCH_TDD_EMPLOYEE => Self::SwitchSubRole,
            names::EXECUTE_COMMAND => Self::ExecuteCommand,
            names::TRADE_FROM_LOCATION => Self::Trade(TradeQuery::FromLocation),
            names::TRADE_BETWEEN_LOCATIONS => Self::Trade(TradeQuery::BetweenLocations),
            names::SELL_PRICE_AT_LOCATION => Self::Trade(TradeQuery::SellPriceAtLocation),
            names::TRADE_FOR_COMMODITY => Self::Trade(TradeQuery::ForCommodity),
            names::SELLING_LOCATION_FOR_COMMODITY => {
                Self::Trade(TradeQuery::SellingLocationForCommodity)
            }
            _ => return None,
        };
        Some(function)
    }

    /// Function name as sent to the model.
    pub fn name(self) -> &'static str {
        match self {
            Self::SwitchContext => names::SWITCH_CONTEXT,
            Self::SwitchSubRole => names::SWITCH_TDD_EMPLOYEE,
            Self::ExecuteCommand => names::EXECUTE_COMMAND,
            Self::Trade(TradeQuery::FromLocation) => names::TRADE_FROM_LOCATION,
            Self::Trade(TradeQuery::BetweenLocations) => names::TRADE_BETWEEN_LOCATIONS,
            Self::Trade(TradeQuery::SellPriceAtLocation) => names::SELL_PRICE_AT_LOCATION,
            Self::Trade(TradeQuery::ForCommodity) => names::TRADE_FOR_COMMODITY,
            Self::Trade(TradeQuery::SellingLocationForCommodity) => {
                names::SELLING_LOCATION_FOR_COMMODITY
            }
        }
    }
}

/// Names used inside the function schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCatalog {
    /// Commands the model may execute (configured + keybindings).
    pub command_names: Vec<String>,
    /// Planets, moons, cities and tradeports.
    pub location_names: Vec<String>,
    /// Planets and moons.
    pub area_names: Vec<String>,
    /// Commodities.
    pub commodity_names: Vec<String>,
    /// Trade division employee voices.
    pub employee_ids: Vec<String>,
}

impl ToolCatalog {
    /// Function schemas for `persona`.
    pub fn for_persona(&self, persona: Persona) -> Vec<ToolDefinition> {
        let mut tools = match persona {
            Persona::Companion => vec![self.execute_command()],
            Persona::TradeDivision => {
                let mut tools = self.trade_tools();
                tools.push(self.switch_employee());
                tools
            }
        };
        tools.push(switch_context(persona));
        tools
    }

    fn execute_command(&self) -> ToolDefinition {
        ToolDefinition::new(
            names::EXECUTE_COMMAND,
            "Executes a player command. On a successful response, follow the instructions in the response.",
            json!({
                "type": "object",
                "properties": {
                    "command_name": {
                        "type": "string",
                        "description": "The command to execute",
                        "enum": self.command_names,
                    }
                },
                "required": ["command_name"]
            }),
        )
    }

    fn switch_employee(&self) -> ToolDefinition {
        ToolDefinition::new(
            names::SWITCH_TDD_EMPLOYEE,
            "Whenever the player addresses a new trading division location, make this function call.",
            json!({
                "type": "object",
                "properties": {
                    "employee_id": {
                        "type": "string",
                        "description": "The id of the employee that will respond to the player request",
                        "enum": self.employee_ids,
                    }
                },
                "required": ["employee_id"]
            }),
        )
    }

    fn trade_tools(&self) -> Vec<ToolDefinition> {
        let include_illegal = json!({
            "type": "boolean",
            "description": "Indicates if illegal or restricted commodities should be searched as well. Only true if the player explicitly asks for it."
        });
        vec![
            ToolDefinition::new(
                names::TRADE_FROM_LOCATION,
                "Identifies the best trade route from a given tradeport, moon / satellite or planetary system.",
                json!({
                    "type": "object",
                    "properties": {
                        "location_name": {
                            "type": "string",
                            "description": "The location where the trade route starts. Can be a planet, a moon / satellite, a city or a specific tradeport.",
                            "enum": self.location_names,
                        },
                        "include_illegal_commodities": include_illegal,
                    },
                    "required": ["location_name"]
                }),
            ),
            ToolDefinition::new(
                names::TRADE_BETWEEN_LOCATIONS,
                "Identifies the best trade route from one location to another. Locations are usually planetary systems but can be moons, cities or tradeports.",
                json!({
                    "type": "object",
                    "properties": {
                        "location_name_from": {
                            "type": "string",
                            "description": "The location where the trade route starts.",
                            "enum": self.location_names,
                        },
                        "location_name_to": {
                            "type": "string",
                            "description": "The location the player is heading to.",
                            "enum": self.location_names,
                        },
                        "include_illegal_commodities": include_illegal,
                    },
                    "required": ["location_name_from", "location_name_to"]
                }),
            ),
            ToolDefinition::new(
                names::SELL_PRICE_AT_LOCATION,
                "For a given commodity, identifies the best tradeport to sell it at the location the player wants to go to.",
                json!({
                    "type": "object",
                    "properties": {
                        "location_name_to": {
                            "type": "string",
                            "description": "The planet or moon where a tradeport should buy the commodity.",
                            "enum": self.area_names,
                        },
                        "commodity_name": {
                            "type": "string",
                            "description": "The commodity that should be sold.",
                            "enum": self.commodity_names,
                        }
                    },
                    "required": ["location_name_to", "commodity_name"]
                }),
            ),
            ToolDefinition::new(
                names::TRADE_FOR_COMMODITY,
                "For a given commodity, finds the most profitable existing trade route.",
                json!({
                    "type": "object",
                    "properties": {
                        "commodity_name": {
                            "type": "string",
                            "description": "The commodity that should be traded.",
                            "enum": self.commodity_names,
                        }
                    },
                    "required": ["commodity_name"]
                }),
            ),
            ToolDefinition::new(
                names::SELLING_LOCATION_FOR_COMMODITY,
                "For a given commodity, finds the location with the highest sell price.",
                json!({
                    "type": "object",
                    "properties": {
                        "commodity_name": {
                            "type": "string",
                            "description": "The commodity that should be sold.",
                            "enum": self.commodity_names,
                        }
                    },
                    "required": ["commodity_name"]
                }),
            ),
        ]
    }
}

fn switch_context(current: Persona) -> ToolDefinition {
    let targets: Vec<&str> = current.others().map(Persona::context_name).collect();
    ToolDefinition::new(
        names::SWITCH_CONTEXT,
        "The context of the player request",
        json!({
            "type": "object",
            "properties": {
                "context_name": {
                    "type": "string",
                    "description": "The available context the player conversation can be switched to",
                    "enum": targets,
                }
            },
            "required": ["context_name"]
        }),
    )
}
