//! Bounded history for persona contexts.
//!
//! A context with retention `R` keeps its system message plus at most `R`
//! exchange pairs (`2R + 1` messages). Older pairs are evicted from the front,
//! two messages at a time. `R == 0` clears everything but the system message
//! in one step.

use crate::llm::message::{Message, Role};

/// What [`trim_history`] removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrimReport {
    /// Exchange pairs evicted.
    pub evicted_pairs: usize,
    /// Eviction steps taken (one per pair, or one for a full reset).
    pub batches: usize,
    /// Tool results dropped because their assistant message was evicted.
    pub orphaned_tool_results: usize,
}

impl TrimReport {
    /// Whether anything was removed.
    pub fn is_empty(&self) -> bool {
        self.evicted_pairs == 0 && self.orphaned_tool_results == 0
    }
}

/// Maximum history length for a retention size.
pub fn max_len(retention: usize) -> usize {
    retention.saturating_mul(2).saturating_add(1)
}

/// Trim `messages` to the retention bound. Position 0 is never touched.
pub fn trim_history(messages: &mut Vec<Message>, retention: Option<usize>) -> TrimReport {
    let mut report = TrimReport::default();
    let Some(retention) = retention else {
        return report;
    };
    let max = max_len(retention);

    while messages.len() > max {
        if retention == 0 {
            report.evicted_pairs += (messages.len() - 1) / 2;
            report.batches += 1;
            messages.truncate(1);
        } else {
            messages.drain(1..3);
            report.evicted_pairs += 1;
            report.batches += 1;
        }
    }

    if report.evicted_pairs > 0 {
        let orphans = messages
            .iter()
            .skip(1)
            .take_while(|m| m.role == Role::Tool)
            .count();
        if orphans > 0 {
            messages.drain(1..1 + orphans);
            report.orphaned_tool_results = orphans;
        }
        tracing::debug!(
            evicted_pairs = report.evicted_pairs,
            orphaned = report.orphaned_tool_results,
            remaining = messages.len(),
            "trimmed conversation history"
        );
    }

    report
}
