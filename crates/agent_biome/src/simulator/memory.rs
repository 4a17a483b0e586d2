//! Organism working memory: a bounded ring of recent experiences.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::agent::{ActionOutcome, Decision};
use super::types::Pulse;

pub const DEFAULT_MEMORY_CAPACITY: usize = 64;

// ============================================================================
// Memory Entry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Pulse during which the entry was recorded.
    pub pulse: Pulse,
    pub kind: MemoryEntryKind,
    /// Importance score (0.0 to 1.0).
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MemoryEntryKind {
    Observation { summary: String },
    Decision { summary: String },
    Outcome { action: String, success: bool },
    Reflection { content: String },
}

impl MemoryEntry {
    pub fn observation(pulse: Pulse, summary: impl Into<String>) -> Self {
        Self {
            pulse,
            kind: MemoryEntryKind::Observation {
                summary: summary.into(),
            },
            importance: 0.4,
        }
    }

    pub fn decision(pulse: Pulse, decision: &Decision) -> Self {
        let summary = if decision.stop {
            "halt".to_string()
        } else if decision.actions.is_empty() {
            "idle".to_string()
        } else {
            decision
                .actions
                .iter()
                .map(|action| action.kind())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            pulse,
            kind: MemoryEntryKind::Decision { summary },
            importance: 0.6,
        }
    }

    pub fn outcome(pulse: Pulse, outcome: &ActionOutcome) -> Self {
        // Failures are more memorable.
        let importance = if outcome.success { 0.5 } else { 0.8 };
        Self {
            pulse,
            kind: MemoryEntryKind::Outcome {
                action: outcome.action.kind().to_string(),
                success: outcome.success,
            },
            importance,
        }
    }

    pub fn reflection(pulse: Pulse, content: impl Into<String>) -> Self {
        Self {
            pulse,
            kind: MemoryEntryKind::Reflection {
                content: content.into(),
            },
            importance: 0.7,
        }
    }
}

// ============================================================================
// Organism Memory
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismMemory {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
    total_added: u64,
}

impl Default for OrganismMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl OrganismMemory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_added: 0,
        }
    }

    pub fn add(&mut self, entry: MemoryEntry) {
        self.total_added += 1;
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Most recent first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter().rev().take(n)
    }

    pub fn important(&self, threshold: f64) -> impl Iterator<Item = &MemoryEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.importance >= threshold)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_added(&self) -> u64 {
        self.total_added
    }

    /// Chronological one-line-per-entry summary of the last `max_entries`.
    pub fn summarize(&self, max_entries: usize) -> String {
        let recent: Vec<_> = self.recent(max_entries).collect();
        if recent.is_empty() {
            return "No recent memories.".to_string();
        }

        let mut lines = Vec::with_capacity(recent.len());
        for entry in recent.iter().rev() {
            let line = match &entry.kind {
                MemoryEntryKind::Observation { summary } => {
                    format!("[P{}] Observed: {}", entry.pulse, summary)
                }
                MemoryEntryKind::Decision { summary } => {
                    format!("[P{}] Decided: {}", entry.pulse, summary)
                }
                MemoryEntryKind::Outcome { action, success } => {
                    let status = if *success { "succeeded" } else { "failed" };
                    format!("[P{}] Action {} {}", entry.pulse, action, status)
                }
                MemoryEntryKind::Reflection { content } => {
                    format!("[P{}] Reflected: {}", entry.pulse, content)
                }
            };
            lines.push(line);
        }
        lines.join("\n")
    }
}
