//! Short per-agent memory of decisions and notable events.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::action::Decision;
use crate::agent::AgentId;
use crate::hex_grid::ResourceType;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Upper bound on remembered events regardless of age.
const MAX_EVENTS: usize = 50;

/// Something worth remembering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryEvent {
    /// Got hit.
    TookDamage {
        /// Who hit.
        attacker: AgentId,
        /// Mitigated damage.
        #[serde(with = "fixed_serde")]
        amount: Fixed,
    },
    /// Picked up a resource.
    Collected {
        /// Kind.
        resource_type: ResourceType,
        /// Units.
        amount: u32,
    },
    /// Delivered a load at the base.
    Delivered {
        /// Kind.
        resource_type: ResourceType,
        /// Units.
        amount: u32,
    },
    /// Saw an enemy.
    SpottedEnemy {
        /// Enemy id.
        enemy: AgentId,
        /// Where.
        position: Vec2Fixed,
    },
}

/// A remembered item with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryEntry<T> {
    /// Simulation time of the recording.
    #[serde(with = "fixed_serde")]
    pub at: Fixed,
    /// The item.
    pub entry: T,
}

/// Memory of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentMemory {
    decisions: VecDeque<MemoryEntry<Decision>>,
    events: VecDeque<MemoryEntry<MemoryEvent>>,
    capacity: usize,
    #[serde(with = "fixed_serde")]
    ttl: Fixed,
}

impl AgentMemory {
    /// Keep at most `capacity` decisions, each for `ttl` seconds.
    #[must_use]
    pub fn new(capacity: usize, ttl: Fixed) -> Self {
        Self {
            decisions: VecDeque::with_capacity(capacity),
            events: VecDeque::new(),
            capacity,
            ttl,
        }
    }

    /// Remember a decision, forgetting the oldest beyond capacity.
    pub fn record_decision(&mut self, now: Fixed, decision: Decision) {
        self.decisions.push_back(MemoryEntry { at: now, entry: decision });
        while self.decisions.len() > self.capacity {
            self.decisions.pop_front();
        }
    }

    /// Remember an event.
    pub fn record_event(&mut self, now: Fixed, event: MemoryEvent) {
        self.events.push_back(MemoryEntry { at: now, entry: event });
        while self.events.len() > MAX_EVENTS {
            self.events.pop_front();
        }
    }

    /// Forget everything older than the time-to-live.
    pub fn expire(&mut self, now: Fixed) {
        let ttl = self.ttl;
        self.decisions.retain(|d| now - d.at <= ttl);
        self.events.retain(|e| now - e.at <= ttl);
    }

    /// Most recent decision.
    #[must_use]
    pub fn last_decision(&self) -> Option<&Decision> {
        self.decisions.back().map(|d| &d.entry)
    }

    /// Time of the most recent decision.
    #[must_use]
    pub fn last_decision_at(&self) -> Option<Fixed> {
        self.decisions.back().map(|d| d.at)
    }

    /// Decisions, oldest first.
    pub fn decisions(&self) -> impl Iterator<Item = &MemoryEntry<Decision>> + '_ {
        self.decisions.iter()
    }

    /// Events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &MemoryEntry<MemoryEvent>> + '_ {
        self.events.iter()
    }

    /// Whether the agent was hit within the last `window` seconds.
    #[must_use]
    pub fn recently_damaged(&self, now: Fixed, window: Fixed) -> bool {
        self.events
            .iter()
            .rev()
            .take_while(|e| now - e.at <= window)
            .any(|e| matches!(e.entry, MemoryEvent::TookDamage { .. }))
    }
}
