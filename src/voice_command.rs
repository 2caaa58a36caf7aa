//! Instant command matching.
//!
//! Some commands carry `instant_activation` phrases. When a transcript is close
//! enough to one of them the command runs straight away, without asking the
//! model. Closeness is the character-level similarity ratio `2M / T` (matched
//! characters over total length) on lower-cased text. Matched characters come
//! from a Myers diff, which on reordered characters can count more matches
//! than a longest-matching-block comparison would, so near-threshold phrases
//! lean towards acceptance.
//!
//! # Matching rules
//!
//! | Rule | Behaviour |
//! |------|-----------|
//! | candidates | commands with at least one instant phrase |
//! | score | best ratio over the command's phrases |
//! | threshold | score must be strictly above [`ACCEPTANCE_THRESHOLD`] |
//! | winner | strictly highest score; ties keep the earlier command |

use similar::TextDiff;

use crate::config::CommandConfig;

/// Minimum ratio (exclusive) for a phrase to count as a match.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.8;

/// Case-insensitive similarity ratio between two strings, in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

/// A command selected by an instant phrase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstantMatch<'a> {
    /// The matched command.
    pub command: &'a CommandConfig,
    /// The phrase that scored best.
    pub phrase: &'a str,
    /// Its similarity ratio.
    pub ratio: f32,
}

/// Find the instant command that best matches `transcript`.
///
/// Returns `None` when no phrase scores above [`ACCEPTANCE_THRESHOLD`].
pub fn match_instant<'a>(transcript: &str, commands: &'a [CommandConfig]) -> Option<InstantMatch<'a>> {
    let mut best: Option<InstantMatch<'a>> = None;

    for command in commands.iter().filter(|c| c.is_instant()) {
        let Some((phrase, ratio)) = command
            .instant_activation
            .iter()
            .map(|p| (p.as_str(), similarity(transcript, p)))
            .fold(None, |acc: Option<(&str, f32)>, (p, r)| match acc {
                Some((_, best_r)) if best_r >= r => acc,
                _ => Some((p, r)),
            })
        else {
            continue;
        };

        if ratio <= ACCEPTANCE_THRESHOLD {
            continue;
        }
        if best.is_none_or(|b| ratio > b.ratio) {
            best = Some(InstantMatch {
                command,
                phrase,
                ratio,
            });
        }
    }

    if let Some(m) = &best {
        tracing::debug!(command = %m.command.name, phrase = %m.phrase, ratio = m.ratio, "instant command matched");
    }
    best
}
