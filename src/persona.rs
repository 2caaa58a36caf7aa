//! Persona contexts and their static profiles.
//!
//! The set of personas is closed: the ship companion handles player and ship
//! actions, the trade and development division handles trading. Each persona
//! owns a [`PersonaProfile`] with the parts of its behaviour that are not
//! user-configurable (retention, audio effects, where its voice comes from,
//! how it decides to hand over to the other persona).
//!
//! The system prompt is assembled from three layers:
//!
//! 1. **Persona prompt** from `[personas.<key>]` in the config.
//! 2. **Player details** (companion only) from `[player]`.
//! 3. **Context directory**: which contexts exist, which one is current, and
//!    the persona's switching guidance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{PersonaConfig, WingmanConfig};

/// A persona context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    /// The onboard AI companion ("Cora").
    #[serde(rename = "CoraInteractionRequests")]
    Companion,
    /// The trade and development division.
    #[serde(rename = "TradeAndDevelopmentDivisionRequests")]
    TradeDivision,
}

/// Audio post-processing toggles applied to a persona's playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioEffects {
    /// Short beep before the reply.
    pub beep_on_receiving: bool,
    /// Radio-transmission filter.
    pub radio: bool,
    /// Robotic voice filter.
    pub robot: bool,
}

/// Where a persona's playback voice comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSource {
    /// Always `personas.<key>.voice`.
    Fixed,
    /// The currently selected sub-role voice, defaulting to `personas.<key>.voice`.
    SubRole,
}

/// Static, per-persona behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaProfile {
    /// Exchange pairs remembered before eviction.
    pub retention: Option<usize>,
    /// Audio effects while the persona is active.
    pub effects: AudioEffects,
    /// Voice selection.
    pub voice_source: VoiceSource,
    /// When to switch away, appended to the system prompt.
    pub switch_guidance: &'static str,
}

const COMPANION_PROFILE: PersonaProfile = PersonaProfile {
    retention: Some(10),
    effects: AudioEffects {
        beep_on_receiving: false,
        radio: false,
        robot: true,
    },
    voice_source: VoiceSource::Fixed,
    switch_guidance: "If the current user request does not fit the current context, switch to \
        an appropriate context by calling the switch_context function. Do not switch if the \
        player addresses you by 'Cora'. Only switch context if the request is trading related.",
};

const TRADE_DIVISION_PROFILE: PersonaProfile = PersonaProfile {
    retention: Some(20),
    effects: AudioEffects {
        beep_on_receiving: true,
        radio: true,
        robot: false,
    },
    voice_source: VoiceSource::SubRole,
    switch_guidance: "Whenever the player addresses a new trading division location, switch the \
        employee by calling the switch_tdd_employee function and select a different employee_id. \
        If the current user request does not fit the current context, switch to an appropriate \
        context by calling the switch_context function. Do switch if the request addresses \
        'Cora', uses words like 'computer' or demands an action.",
};

impl Persona {
    /// All personas, in declaration order.
    pub const ALL: [Persona; 2] = [Persona::Companion, Persona::TradeDivision];

    /// Name used in the `switch_context` function.
    pub fn context_name(self) -> &'static str {
        match self {
            Self::Companion => "CoraInteractionRequests",
            Self::TradeDivision => "TradeAndDevelopmentDivisionRequests",
        }
    }

    /// Resolve a `switch_context` name.
    pub fn from_context_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.context_name() == name)
    }

    /// Static profile.
    pub fn profile(self) -> &'static PersonaProfile {
        match self {
            Self::Companion => &COMPANION_PROFILE,
            Self::TradeDivision => &TRADE_DIVISION_PROFILE,
        }
    }

    /// Configured side of this persona.
    pub fn config(self, config: &WingmanConfig) -> &PersonaConfig {
        match self {
            Self::Companion => &config.personas.companion,
            Self::TradeDivision => &config.personas.trade_division,
        }
    }

    /// Every other persona, the targets offered by `switch_context`.
    pub fn others(self) -> impl Iterator<Item = Persona> {
        Self::ALL.into_iter().filter(move |p| *p != self)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.context_name())
    }
}

/// Assemble the system prompt for `persona`.
pub fn build_system_prompt(persona: Persona, config: &WingmanConfig) -> String {
    let mut prompt = persona.config(config).prompt.trim().to_string();

    if persona == Persona::Companion {
        let player = &config.player;
        prompt.push_str(&format!(
            " The character you are supporting is named \"{}\". Their title is {}. Their ship \
             call id is {}. They want you to respond in {}.",
            player.name, player.title, player.ship_name, player.language
        ));
    }

    prompt.push_str(&format!(
        " On a request of the player you will identify the context of the request. Valid \
         contexts are: player or ship actions executed by the AI companion ({}), for all \
         requests related to player actions. Trade and Development Division ({}) personnel, for \
         all requests related to trading. The current context is: {}. {}",
        Persona::Companion.context_name(),
        Persona::TradeDivision.context_name(),
        persona.context_name(),
        persona.profile().switch_guidance
    ));

    prompt
}
