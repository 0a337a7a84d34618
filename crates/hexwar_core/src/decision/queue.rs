//! Rate-limited FIFO between agents and a decision provider.
//!
//! Requests wait in arrival order and are released one token at a time.
//! Tokens refill continuously at `requests_per_minute / 60` per second up
//! to a bucket of `requests_per_minute`. A released request is answered
//! immediately but the answer is held back for the provider's latency.
//! Anything that would take longer than the timeout, counted from
//! enqueueing, resolves as [`DecisionError::Timeout`] instead.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::perception::Perception;
use super::provider::{DecisionProvider, RawDecision};
use super::DecisionError;
use crate::agent::AgentId;
use crate::config::DecisionConfig;
use crate::math::{fixed_serde, Fixed};

/// A request waiting for a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Asking agent.
    pub agent: AgentId,
    /// Simulation time of enqueueing.
    #[serde(with = "fixed_serde")]
    pub enqueued_at: Fixed,
    /// Snapshot taken at enqueueing.
    pub perception: Perception,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InFlight {
    agent: AgentId,
    #[serde(with = "fixed_serde")]
    ready_at: Fixed,
    result: Result<RawDecision, DecisionError>,
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The provider answered.
    Answered {
        /// Asking agent.
        agent: AgentId,
        /// The answer, still unvalidated.
        raw: RawDecision,
    },
    /// No usable answer.
    Failed {
        /// Asking agent.
        agent: AgentId,
        /// Why.
        error: DecisionError,
    },
}

impl Resolution {
    /// Agent the resolution belongs to.
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        match self {
            Resolution::Answered { agent, .. } | Resolution::Failed { agent, .. } => *agent,
        }
    }
}

/// FIFO with a token bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionQueue {
    waiting: VecDeque<DecisionRequest>,
    in_flight: Vec<InFlight>,
    #[serde(with = "fixed_serde")]
    tokens: Fixed,
    #[serde(with = "fixed_serde")]
    capacity: Fixed,
    #[serde(with = "fixed_serde")]
    refill_per_sec: Fixed,
    #[serde(with = "fixed_serde")]
    timeout: Fixed,
}

impl DecisionQueue {
    /// Queue with limits from `config`. The bucket starts full.
    #[must_use]
    pub fn new(config: &DecisionConfig) -> Self {
        Self::with_limits(config.requests_per_minute, Fixed::from_num(config.timeout_secs))
    }

    /// Queue allowing `requests_per_minute` with the given timeout.
    #[must_use]
    pub fn with_limits(requests_per_minute: u32, timeout: Fixed) -> Self {
        let capacity = Fixed::from_num(requests_per_minute);
        Self {
            waiting: VecDeque::new(),
            in_flight: Vec::new(),
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / 60,
            timeout,
        }
    }

    /// Whether `agent` has a request waiting or in flight.
    #[must_use]
    pub fn is_pending(&self, agent: AgentId) -> bool {
        self.waiting.iter().any(|r| r.agent == agent) || self.in_flight.iter().any(|r| r.agent == agent)
    }

    /// Append a request. Refused while the agent already has one pending.
    pub fn enqueue(&mut self, request: DecisionRequest) -> bool {
        if self.is_pending(request.agent) {
            return false;
        }
        self.waiting.push_back(request);
        true
    }

    /// Drop anything pending for `agent`. Returns whether something was
    /// dropped.
    pub fn cancel(&mut self, agent: AgentId) -> bool {
        let before = self.waiting.len() + self.in_flight.len();
        self.waiting.retain(|r| r.agent != agent);
        self.in_flight.retain(|r| r.agent != agent);
        before != self.waiting.len() + self.in_flight.len()
    }

    /// Add `dt` seconds worth of tokens.
    pub fn refill(&mut self, dt: Fixed) {
        self.tokens = (self.tokens + self.refill_per_sec * dt).min(self.capacity);
    }

    /// Tokens currently available.
    #[must_use]
    pub const fn tokens(&self) -> Fixed {
        self.tokens
    }

    /// Requests waiting for a token.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Requests answered but not yet delivered.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Time out stale waiting requests, then release as many as the bucket
    /// allows. Returns the timeouts; released answers come out of
    /// [`Self::take_ready`].
    pub fn pump(&mut self, now: Fixed, provider: &mut dyn DecisionProvider) -> Vec<Resolution> {
        let timeout = self.timeout;
        let mut expired = Vec::new();
        self.waiting.retain(|r| {
            if now - r.enqueued_at >= timeout {
                expired.push(Resolution::Failed {
                    agent: r.agent,
                    error: DecisionError::Timeout,
                });
                false
            } else {
                true
            }
        });

        while self.tokens >= Fixed::ONE {
            let Some(request) = self.waiting.pop_front() else {
                break;
            };
            self.tokens -= Fixed::ONE;
            let deadline = request.enqueued_at + timeout;
            let ready_at = now + provider.latency();
            let (ready_at, result) = if ready_at > deadline {
                (deadline, Err(DecisionError::Timeout))
            } else {
                (ready_at, provider.decide(&request.perception))
            };
            self.in_flight.push(InFlight {
                agent: request.agent,
                ready_at,
                result,
            });
        }
        expired
    }

    /// Deliver every answer whose latency has elapsed, in release order.
    pub fn take_ready(&mut self, now: Fixed) -> Vec<Resolution> {
        let mut ready = Vec::new();
        let mut i = 0;
        while i < self.in_flight.len() {
            if self.in_flight[i].ready_at <= now {
                let item = self.in_flight.remove(i);
                ready.push(match item.result {
                    Ok(raw) => Resolution::Answered { agent: item.agent, raw },
                    Err(error) => Resolution::Failed {
                        agent: item.agent,
                        error,
                    },
                });
            } else {
                i += 1;
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::decision::knowledge::TeamKnowledge;
    use crate::decision::perception::{SelfState, TerritoryView};
    use crate::decision::provider::{RuleBasedProvider, ScriptedProvider};
    use crate::math::Vec2Fixed;
    use crate::team::TeamId;

    fn request(agent: AgentId, at: Fixed) -> DecisionRequest {
        DecisionRequest {
            agent,
            enqueued_at: at,
            perception: Perception {
                time: at,
                agent: SelfState {
                    id: agent,
                    team: TeamId::One,
                    role: Role::Collector,
                    position: Vec2Fixed::from_num(100, 100),
                    health_fraction: Fixed::ONE,
                    carrying: None,
                    resource_amount: 0,
                    capacity: 5,
                    is_attacking: false,
                    is_healing: false,
                },
                own_base: Vec2Fixed::from_num(30, 30),
                world: Vec2Fixed::from_num(800, 600),
                allies: Vec::new(),
                enemies: Vec::new(),
                resources: Vec::new(),
                obstacles: Vec::new(),
                territory: TerritoryView::default(),
                enemy_base_seen: None,
                knowledge: TeamKnowledge::new(),
            },
        }
    }

    fn secs(n: f64) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn test_one_pending_request_per_agent() {
        let mut queue = DecisionQueue::with_limits(30, secs(5.0));
        assert!(queue.enqueue(request(1, secs(0.0))));
        assert!(!queue.enqueue(request(1, secs(0.5))));
        assert!(queue.enqueue(request(2, secs(0.5))));
        assert_eq!(queue.waiting_len(), 2);

        let mut provider = RuleBasedProvider::new(secs(1.0));
        queue.pump(secs(1.0), &mut provider);
        assert!(queue.is_pending(1));
        assert!(!queue.enqueue(request(1, secs(1.0))));
    }

    #[test]
    fn test_bucket_limits_release_rate() {
        let mut queue = DecisionQueue::with_limits(2, secs(100.0));
        for agent in 1..=3 {
            queue.enqueue(request(agent, Fixed::ZERO));
        }
        let mut provider = RuleBasedProvider::new(Fixed::ZERO);
        queue.pump(Fixed::ZERO, &mut provider);
        assert_eq!(queue.in_flight_len(), 2);
        assert_eq!(queue.waiting_len(), 1);

        // 2 per minute refills one token every 30 s
        queue.refill(secs(29.0));
        queue.pump(secs(29.0), &mut provider);
        assert_eq!(queue.waiting_len(), 1);
        queue.refill(secs(2.0));
        queue.pump(secs(31.0), &mut provider);
        assert_eq!(queue.waiting_len(), 0);
    }

    #[test]
    fn test_answers_wait_for_latency_in_fifo_order() {
        let mut queue = DecisionQueue::with_limits(30, secs(5.0));
        queue.enqueue(request(7, Fixed::ZERO));
        queue.enqueue(request(3, Fixed::ZERO));
        let mut provider = RuleBasedProvider::new(secs(0.5));
        queue.pump(Fixed::ZERO, &mut provider);

        assert!(queue.take_ready(secs(0.25)).is_empty());
        let ready = queue.take_ready(secs(0.5));
        let agents: Vec<_> = ready.iter().map(Resolution::agent).collect();
        assert_eq!(agents, vec![7, 3]);
        assert!(matches!(ready[0], Resolution::Answered { .. }));
    }

    #[test]
    fn test_waiting_request_times_out() {
        let mut queue = DecisionQueue::with_limits(1, secs(5.0));
        queue.enqueue(request(1, Fixed::ZERO));
        queue.enqueue(request(2, Fixed::ZERO));
        let mut provider = RuleBasedProvider::new(Fixed::ZERO);
        assert!(queue.pump(Fixed::ZERO, &mut provider).is_empty());

        let expired = queue.pump(secs(5.0), &mut provider);
        assert_eq!(
            expired,
            vec![Resolution::Failed {
                agent: 2,
                error: DecisionError::Timeout
            }]
        );
        assert!(!queue.is_pending(2));
    }

    #[test]
    fn test_slow_provider_times_out_at_deadline() {
        let mut queue = DecisionQueue::with_limits(30, secs(5.0));
        queue.enqueue(request(1, Fixed::ZERO));
        let mut provider = ScriptedProvider::new(["ACTION: EXPLORE"], secs(8.0));
        queue.pump(secs(1.0), &mut provider);
        // Not consulted at all
        assert_eq!(provider.remaining(), 1);
        assert!(queue.take_ready(secs(4.9)).is_empty());
        let ready = queue.take_ready(secs(5.0));
        assert!(matches!(ready[0], Resolution::Failed { error: DecisionError::Timeout, .. }));
    }

    #[test]
    fn test_cancel_drops_waiting_and_in_flight() {
        let mut queue = DecisionQueue::with_limits(1, secs(5.0));
        queue.enqueue(request(1, Fixed::ZERO));
        queue.enqueue(request(2, Fixed::ZERO));
        let mut provider = RuleBasedProvider::new(secs(1.0));
        queue.pump(Fixed::ZERO, &mut provider);

        assert!(queue.cancel(1));
        assert!(queue.cancel(2));
        assert!(!queue.cancel(3));
        assert!(queue.take_ready(secs(10.0)).is_empty());
        assert_eq!(queue.waiting_len(), 0);
    }
}
