//! Decision providers and their wire format.
//!
//! A provider answers a [`Perception`] with a [`RawDecision`]: three
//! strings, exactly what a remote model would send back. Text answers are
//! turned into a `RawDecision` by [`parse_response`], which accepts JSON or
//! loose `ACTION: X / TARGET: Y / REASONING: ...` lines.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::action::{ActionKind, Decision, TargetDescriptor};
use super::perception::Perception;
use super::DecisionError;
use crate::agent::Role;
use crate::math::Fixed;

/// Health fraction below which agents go home to heal.
const LOW_HEALTH: f64 = 0.4;

/// Wire shape of a provider answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDecision {
    /// Action verb.
    pub action: String,
    /// Target descriptor.
    #[serde(default)]
    pub target: String,
    /// Free text.
    #[serde(default)]
    pub reasoning: String,
}

/// Maps perception to an answer.
///
/// `decide` runs synchronously when the queue releases a request; the
/// answer only reaches the agent [`DecisionProvider::latency`] seconds
/// later.
pub trait DecisionProvider: Send {
    /// Answer one request.
    fn decide(&mut self, perception: &Perception) -> Result<RawDecision, DecisionError>;

    /// Simulated seconds between the request and the answer.
    fn latency(&self) -> Fixed {
        Fixed::ZERO
    }

    /// Short name for logs.
    fn name(&self) -> &str {
        "provider"
    }
}

/// Value following `key` on its line, after an optional colon.
fn loose_field<'a>(text: &'a str, lower: &str, key: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(found) = lower[from..].find(key) {
        let start = from + found;
        let at_word_start = lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        from = start + key.len();
        if !at_word_start {
            continue;
        }
        let rest = &text[from..];
        let rest = rest.trim_start_matches(&[' ', '\t'][..]);
        let rest = rest.strip_prefix(':').unwrap_or(rest);
        let line = rest.lines().next().unwrap_or("").trim();
        if !line.is_empty() {
            return Some(line);
        }
    }
    None
}

/// Parse a provider's text answer.
///
/// JSON objects are tried first (surrounding prose is ignored). Otherwise
/// the `action`, `target` and `reasoning` keys are looked up
/// case-insensitively, one per line. Only a missing action is an error.
pub fn parse_response(text: &str) -> Result<RawDecision, DecisionError> {
    if let (Some(open), Some(close)) = (text.find('{'), text.rfind('}')) {
        if open < close {
            if let Ok(raw) = serde_json::from_str::<RawDecision>(&text[open..=close]) {
                return Ok(raw);
            }
        }
    }

    let lower = text.to_ascii_lowercase();
    let Some(action_line) = loose_field(text, &lower, "action") else {
        return Err(DecisionError::Malformed(text.chars().take(80).collect()));
    };
    // The verb is a single token; anything after it is noise
    let action: String = action_line
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if action.is_empty() {
        return Err(DecisionError::Malformed(action_line.to_string()));
    }
    Ok(RawDecision {
        action,
        target: loose_field(text, &lower, "target").unwrap_or("").to_string(),
        reasoning: loose_field(text, &lower, "reasoning").unwrap_or("").to_string(),
    })
}

/// Deterministic action used whenever a provider cannot be used.
#[must_use]
pub fn fallback_decision(is_carrying: bool, health_fraction: Fixed, reason: &DecisionError) -> Decision {
    if is_carrying {
        return Decision::new(
            ActionKind::ReturnToBase,
            TargetDescriptor::None,
            format!("{reason}. Fallback: returning to base with resources"),
        );
    }
    if health_fraction < Fixed::from_num(LOW_HEALTH) {
        return Decision::new(
            ActionKind::Heal,
            TargetDescriptor::None,
            format!("{reason}. Fallback: health low, retreating to heal"),
        );
    }
    Decision::new(
        ActionKind::Explore,
        TargetDescriptor::Random,
        format!("{reason}. Fallback: exploring"),
    )
}

/// Built-in provider: a fixed rule table over the perception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBasedProvider {
    latency: Fixed,
}

impl Default for RuleBasedProvider {
    fn default() -> Self {
        Self::new(Fixed::from_num(0.25))
    }
}

impl RuleBasedProvider {
    /// Provider that answers after `latency` seconds.
    #[must_use]
    pub const fn new(latency: Fixed) -> Self {
        Self { latency }
    }

    /// The rule table.
    #[must_use]
    pub fn choose(perception: &Perception) -> Decision {
        let me = &perception.agent;
        if me.resource_amount > 0 {
            return Decision::new(ActionKind::ReturnToBase, TargetDescriptor::None, "Carrying resources home");
        }
        if me.health_fraction < Fixed::from_num(LOW_HEALTH) {
            return Decision::new(ActionKind::Heal, TargetDescriptor::None, "Health is low");
        }

        if let Some(nearest) = perception.enemies.first() {
            let outnumbered = perception.enemies.len() > perception.allies.len() + 1;
            return match me.role {
                Role::Collector => Decision::new(ActionKind::Flee, TargetDescriptor::FromEnemies, "Avoiding combat"),
                Role::Explorer if outnumbered => {
                    Decision::new(ActionKind::Flee, TargetDescriptor::FromEnemies, "Outnumbered")
                }
                Role::Explorer => Decision::new(ActionKind::Attack, TargetDescriptor::NearestEnemy, "Enemy nearby"),
                Role::Attacker if perception.enemies.iter().any(|e| e.is_carrying) => Decision::new(
                    ActionKind::Attack,
                    TargetDescriptor::ResourceCarrier,
                    "Intercepting a carrier",
                ),
                Role::Attacker => Decision::new(ActionKind::Attack, TargetDescriptor::WeakestEnemy, "Picking off the weakest"),
                Role::Defender if nearest.distance < Fixed::from_num(100) => {
                    Decision::new(ActionKind::Attack, TargetDescriptor::NearestEnemy, "Intruder in range")
                }
                Role::Defender => Decision::new(ActionKind::Defend, TargetDescriptor::Base, "Enemies approaching"),
            };
        }

        if matches!(me.role, Role::Collector | Role::Explorer) && !perception.resources.is_empty() {
            let rich = perception.resources.iter().any(|r| r.amount >= 4);
            let target = if rich {
                TargetDescriptor::MostValuable
            } else {
                TargetDescriptor::NearestResource
            };
            return Decision::new(ActionKind::Collect, target, "Resources in sight");
        }

        match me.role {
            Role::Collector => Decision::new(ActionKind::Explore, TargetDescriptor::ResourceRich, "Looking for resources"),
            Role::Explorer if perception.knowledge.enemy_base().is_none() => {
                Decision::new(ActionKind::ScoutEnemy, TargetDescriptor::EnemyTerritory, "Enemy base unknown")
            }
            Role::Explorer => Decision::new(ActionKind::Explore, TargetDescriptor::Unexplored, "Mapping the world"),
            Role::Defender if perception.territory.own < Fixed::from_num(0.5) => {
                Decision::new(ActionKind::ClaimTerritory, TargetDescriptor::Frontier, "Holding the frontier")
            }
            Role::Defender => Decision::new(ActionKind::Defend, TargetDescriptor::Territory, "Guarding territory"),
            Role::Attacker if perception.territory.enemy > Fixed::from_num(0.3) => {
                Decision::new(ActionKind::ClaimTerritory, TargetDescriptor::Enemy, "Taking enemy ground")
            }
            Role::Attacker if !perception.knowledge.danger_zones().is_empty() => {
                Decision::new(ActionKind::ScoutEnemy, TargetDescriptor::DangerZone, "Hunting")
            }
            Role::Attacker => Decision::new(ActionKind::ScoutEnemy, TargetDescriptor::EnemyTerritory, "Pushing forward"),
        }
    }
}

impl DecisionProvider for RuleBasedProvider {
    fn decide(&mut self, perception: &Perception) -> Result<RawDecision, DecisionError> {
        Ok(Self::choose(perception).to_raw())
    }

    fn latency(&self) -> Fixed {
        self.latency
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}

/// Provider replaying canned text answers through [`parse_response`].
/// Once the script runs out it reports a provider failure.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    responses: VecDeque<String>,
    latency: Fixed,
}

impl ScriptedProvider {
    /// Provider answering with `responses` in order.
    pub fn new<I, S>(responses: I, latency: Fixed) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            latency,
        }
    }

    /// Answers not yet used.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl DecisionProvider for ScriptedProvider {
    fn decide(&mut self, _perception: &Perception) -> Result<RawDecision, DecisionError> {
        let text = self
            .responses
            .pop_front()
            .ok_or_else(|| DecisionError::Provider("script exhausted".to_string()))?;
        parse_response(&text)
    }

    fn latency(&self) -> Fixed {
        self.latency
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::knowledge::TeamKnowledge;
    use crate::decision::perception::{SeenAgent, SeenResource, SelfState, TerritoryView};
    use crate::hex_grid::{CellCoord, ResourceType};
    use crate::math::Vec2Fixed;
    use crate::team::TeamId;

    fn perception(role: Role) -> Perception {
        Perception {
            time: Fixed::ZERO,
            agent: SelfState {
                id: 1,
                team: TeamId::One,
                role,
                position: Vec2Fixed::from_num(400, 300),
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
        }
    }

    fn enemy(id: u32, distance: i32) -> SeenAgent {
        SeenAgent {
            id,
            role: Role::Attacker,
            position: Vec2Fixed::from_num(400 + distance, 300),
            distance: Fixed::from_num(distance),
            health_fraction: Fixed::ONE,
            is_carrying: false,
        }
    }

    #[test]
    fn test_parse_json_response() {
        let text = r#"Sure. {"action": "COLLECT", "target": "NEAREST_RESOURCE", "reasoning": "close by"} done"#;
        let raw = parse_response(text).unwrap();
        assert_eq!(raw.action, "COLLECT");
        assert_eq!(raw.target, "NEAREST_RESOURCE");
        assert_eq!(raw.reasoning, "close by");
    }

    #[test]
    fn test_parse_loose_response() {
        let text = "ACTION: RETURN\nTARGET: base\nREASONING: I'm carrying resources.";
        let raw = parse_response(text).unwrap();
        assert_eq!(raw.action, "RETURN");
        assert_eq!(raw.target, "base");
        assert_eq!(raw.reasoning, "I'm carrying resources.");
        let decision = Decision::from_raw(&raw).unwrap();
        assert_eq!(decision.action, ActionKind::ReturnToBase);
    }

    #[test]
    fn test_parse_loose_without_colons() {
        let raw = parse_response("action collect\ntarget nearest resource").unwrap();
        let decision = Decision::from_raw(&raw).unwrap();
        assert_eq!(decision.action, ActionKind::Collect);
        assert_eq!(decision.target, TargetDescriptor::NearestResource);
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_action() {
        assert!(matches!(
            parse_response("I would rather not say"),
            Err(DecisionError::Malformed(_))
        ));
        // "transaction" must not be read as the action key
        assert!(parse_response("transaction: none").is_err());
    }

    #[test]
    fn test_fallback_priorities() {
        let reason = DecisionError::Timeout;
        assert_eq!(
            fallback_decision(true, Fixed::from_num(0.1), &reason).action,
            ActionKind::ReturnToBase
        );
        assert_eq!(fallback_decision(false, Fixed::from_num(0.3), &reason).action, ActionKind::Heal);
        let explore = fallback_decision(false, Fixed::ONE, &reason);
        assert_eq!(explore.action, ActionKind::Explore);
        assert_eq!(explore.target, TargetDescriptor::Random);
        assert!(explore.reasoning.starts_with("Decision request timed out"));
    }

    #[test]
    fn test_rules_by_role() {
        let mut p = perception(Role::Collector);
        p.enemies.push(enemy(9, 80));
        assert_eq!(RuleBasedProvider::choose(&p).target, TargetDescriptor::FromEnemies);

        p.agent.role = Role::Defender;
        assert_eq!(RuleBasedProvider::choose(&p).action, ActionKind::Attack);
        p.enemies[0].distance = Fixed::from_num(150);
        assert_eq!(RuleBasedProvider::choose(&p).action, ActionKind::Defend);

        p.agent.role = Role::Attacker;
        p.enemies[0].is_carrying = true;
        assert_eq!(RuleBasedProvider::choose(&p).target, TargetDescriptor::ResourceCarrier);

        p.agent.role = Role::Explorer;
        p.enemies.push(enemy(10, 90));
        assert_eq!(RuleBasedProvider::choose(&p).action, ActionKind::Flee);
    }

    #[test]
    fn test_rules_prefer_rich_piles() {
        let mut p = perception(Role::Collector);
        p.resources.push(SeenResource {
            coord: CellCoord::new(3, 3),
            position: Vec2Fixed::from_num(420, 300),
            distance: Fixed::from_num(20),
            resource_type: ResourceType::Data,
            amount: 5,
        });
        let decision = RuleBasedProvider::choose(&p);
        assert_eq!(decision.action, ActionKind::Collect);
        assert_eq!(decision.target, TargetDescriptor::MostValuable);

        p.agent.resource_amount = 2;
        assert_eq!(RuleBasedProvider::choose(&p).action, ActionKind::ReturnToBase);
    }

    #[test]
    fn test_rule_based_answer_round_trips_the_wire() {
        let mut provider = RuleBasedProvider::default();
        let p = perception(Role::Attacker);
        let raw = provider.decide(&p).unwrap();
        let decision = Decision::from_raw(&raw).unwrap();
        assert_eq!(decision, RuleBasedProvider::choose(&p));
    }

    #[test]
    fn test_scripted_provider_runs_dry() {
        let mut provider = ScriptedProvider::new(["ACTION: HEAL"], Fixed::ONE);
        let p = perception(Role::Explorer);
        assert_eq!(provider.decide(&p).unwrap().action, "HEAL");
        assert_eq!(provider.remaining(), 0);
        assert!(matches!(provider.decide(&p), Err(DecisionError::Provider(_))));
    }
}
