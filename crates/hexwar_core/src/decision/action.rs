//! Action verbs and their target descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::provider::RawDecision;
use super::DecisionError;
use crate::hex_grid::ResourceType;

/// The ten verbs a provider may answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Wander somewhere new.
    Explore,
    /// Go for a visible resource.
    Collect,
    /// Head home.
    ReturnToBase,
    /// Engage a visible enemy.
    Attack,
    /// Get away from danger.
    Flee,
    /// Push control into some area.
    ClaimTerritory,
    /// Look for the enemy.
    ScoutEnemy,
    /// Hold a position.
    Defend,
    /// Go home to heal.
    Heal,
    /// Keep doing what you are doing.
    Continue,
}

impl ActionKind {
    /// Every verb.
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Explore,
        ActionKind::Collect,
        ActionKind::ReturnToBase,
        ActionKind::Attack,
        ActionKind::Flee,
        ActionKind::ClaimTerritory,
        ActionKind::ScoutEnemy,
        ActionKind::Defend,
        ActionKind::Heal,
        ActionKind::Continue,
    ];

    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::Explore => "EXPLORE",
            ActionKind::Collect => "COLLECT",
            ActionKind::ReturnToBase => "RETURN_TO_BASE",
            ActionKind::Attack => "ATTACK",
            ActionKind::Flee => "FLEE",
            ActionKind::ClaimTerritory => "CLAIM_TERRITORY",
            ActionKind::ScoutEnemy => "SCOUT_ENEMY",
            ActionKind::Defend => "DEFEND",
            ActionKind::Heal => "HEAL",
            ActionKind::Continue => "CONTINUE",
        }
    }

    /// Target used when the provider gives none or an invalid one.
    #[must_use]
    pub const fn default_target(self) -> TargetDescriptor {
        match self {
            ActionKind::Explore => TargetDescriptor::Random,
            ActionKind::Collect => TargetDescriptor::NearestResource,
            ActionKind::Attack => TargetDescriptor::NearestEnemy,
            ActionKind::Flee | ActionKind::Defend => TargetDescriptor::Base,
            ActionKind::ClaimTerritory => TargetDescriptor::Unclaimed,
            ActionKind::ScoutEnemy => TargetDescriptor::EnemyTerritory,
            ActionKind::ReturnToBase | ActionKind::Heal | ActionKind::Continue => TargetDescriptor::None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercase and turn spaces and dashes into underscores.
pub(crate) fn normalize_token(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

impl FromStr for ActionKind {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = normalize_token(s);
        let kind = match token.as_str() {
            "EXPLORE" => ActionKind::Explore,
            "COLLECT" => ActionKind::Collect,
            "RETURN_TO_BASE" | "RETURN" => ActionKind::ReturnToBase,
            "ATTACK" => ActionKind::Attack,
            "FLEE" => ActionKind::Flee,
            "CLAIM_TERRITORY" | "CLAIM" => ActionKind::ClaimTerritory,
            "SCOUT_ENEMY" | "SCOUT" => ActionKind::ScoutEnemy,
            "DEFEND" => ActionKind::Defend,
            "HEAL" => ActionKind::Heal,
            "CONTINUE" => ActionKind::Continue,
            _ => return Err(DecisionError::UnknownAction(s.trim().to_string())),
        };
        Ok(kind)
    }
}

/// What an action is aimed at.
///
/// `Base` and `Ally` are shared by FLEE and DEFEND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDescriptor {
    /// No target.
    None,
    /// EXPLORE: any direction.
    Random,
    /// EXPLORE: towards a known hotspot.
    ResourceRich,
    /// EXPLORE: far away.
    Unexplored,
    /// COLLECT: closest resource.
    NearestResource,
    /// COLLECT: largest pile in sight.
    MostValuable,
    /// COLLECT: closest resource of one type.
    Kind(ResourceType),
    /// ATTACK: closest enemy.
    NearestEnemy,
    /// ATTACK: enemy with the least health.
    WeakestEnemy,
    /// ATTACK: enemy carrying resources.
    ResourceCarrier,
    /// FLEE or DEFEND: own base.
    Base,
    /// FLEE: directly away from visible enemies.
    FromEnemies,
    /// FLEE or DEFEND: an ally.
    Ally,
    /// CLAIM_TERRITORY: neutral ground near home.
    Unclaimed,
    /// CLAIM_TERRITORY: enemy ground.
    Enemy,
    /// CLAIM_TERRITORY: the edge of own ground.
    Frontier,
    /// SCOUT_ENEMY: where the enemy base probably is.
    EnemyTerritory,
    /// SCOUT_ENEMY: a known danger zone.
    DangerZone,
    /// DEFEND: own territory.
    Territory,
}

impl TargetDescriptor {
    /// Parse a target for `action`. Anything unrecognised, or not valid for
    /// that action, becomes the action's default target.
    #[must_use]
    pub fn parse(action: ActionKind, text: &str) -> Self {
        use TargetDescriptor as T;
        let token = normalize_token(text);
        let parsed = match (action, token.as_str()) {
            (ActionKind::Explore, "RANDOM") => Some(T::Random),
            (ActionKind::Explore, "RESOURCE_RICH" | "RESOURCES") => Some(T::ResourceRich),
            (ActionKind::Explore, "UNEXPLORED") => Some(T::Unexplored),
            (ActionKind::Collect, "NEAREST_RESOURCE" | "NEAREST") => Some(T::NearestResource),
            (ActionKind::Collect, "MOST_VALUABLE" | "LARGEST") => Some(T::MostValuable),
            (ActionKind::Collect, "ENERGY") => Some(T::Kind(ResourceType::Energy)),
            (ActionKind::Collect, "MATERIALS") => Some(T::Kind(ResourceType::Materials)),
            (ActionKind::Collect, "DATA") => Some(T::Kind(ResourceType::Data)),
            (ActionKind::Attack, "NEAREST_ENEMY" | "NEAREST") => Some(T::NearestEnemy),
            (ActionKind::Attack, "WEAKEST_ENEMY" | "WEAKEST") => Some(T::WeakestEnemy),
            (ActionKind::Attack, "RESOURCE_CARRIER" | "CARRIER") => Some(T::ResourceCarrier),
            (ActionKind::Flee | ActionKind::Defend, "BASE") => Some(T::Base),
            (ActionKind::Flee | ActionKind::Defend, "ALLY" | "NEAREST_ALLY" | "WEAKEST_ALLY") => Some(T::Ally),
            (ActionKind::Flee, "FROM_ENEMIES" | "AWAY") => Some(T::FromEnemies),
            (ActionKind::ClaimTerritory, "UNCLAIMED" | "NEUTRAL") => Some(T::Unclaimed),
            (ActionKind::ClaimTerritory, "ENEMY" | "ENEMY_TERRITORY") => Some(T::Enemy),
            (ActionKind::ClaimTerritory, "FRONTIER") => Some(T::Frontier),
            (ActionKind::ScoutEnemy, "ENEMY_TERRITORY" | "ENEMY_BASE") => Some(T::EnemyTerritory),
            (ActionKind::ScoutEnemy, "DANGER_ZONE" | "DANGER") => Some(T::DangerZone),
            (ActionKind::Defend, "TERRITORY") => Some(T::Territory),
            _ => None,
        };
        parsed.unwrap_or_else(|| action.default_target())
    }

    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TargetDescriptor::None => "NONE",
            TargetDescriptor::Random => "RANDOM",
            TargetDescriptor::ResourceRich => "RESOURCE_RICH",
            TargetDescriptor::Unexplored => "UNEXPLORED",
            TargetDescriptor::NearestResource => "NEAREST_RESOURCE",
            TargetDescriptor::MostValuable => "MOST_VALUABLE",
            TargetDescriptor::Kind(ResourceType::Energy) => "ENERGY",
            TargetDescriptor::Kind(ResourceType::Materials) => "MATERIALS",
            TargetDescriptor::Kind(ResourceType::Data) => "DATA",
            TargetDescriptor::NearestEnemy => "NEAREST_ENEMY",
            TargetDescriptor::WeakestEnemy => "WEAKEST_ENEMY",
            TargetDescriptor::ResourceCarrier => "RESOURCE_CARRIER",
            TargetDescriptor::Base => "BASE",
            TargetDescriptor::FromEnemies => "FROM_ENEMIES",
            TargetDescriptor::Ally => "ALLY",
            TargetDescriptor::Unclaimed => "UNCLAIMED",
            TargetDescriptor::Enemy => "ENEMY",
            TargetDescriptor::Frontier => "FRONTIER",
            TargetDescriptor::EnemyTerritory => "ENEMY_TERRITORY",
            TargetDescriptor::DangerZone => "DANGER_ZONE",
            TargetDescriptor::Territory => "TERRITORY",
        }
    }
}

/// A validated provider answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    /// Verb.
    pub action: ActionKind,
    /// What the verb is aimed at.
    pub target: TargetDescriptor,
    /// Free text from the provider.
    pub reasoning: String,
}

impl Decision {
    /// Build a decision, target defaulted from the action.
    #[must_use]
    pub fn new(action: ActionKind, target: TargetDescriptor, reasoning: impl Into<String>) -> Self {
        Self {
            action,
            target,
            reasoning: reasoning.into(),
        }
    }

    /// Validate a wire answer. Only the verb can fail; a bad target is
    /// replaced by the verb's default.
    pub fn from_raw(raw: &RawDecision) -> Result<Self, DecisionError> {
        let action: ActionKind = raw.action.parse()?;
        Ok(Self {
            action,
            target: TargetDescriptor::parse(action, &raw.target),
            reasoning: raw.reasoning.clone(),
        })
    }

    /// Wire form.
    #[must_use]
    pub fn to_raw(&self) -> RawDecision {
        RawDecision {
            action: self.action.as_str().to_string(),
            target: self.target.as_str().to_string(),
            reasoning: self.reasoning.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_is_case_insensitive() {
        assert_eq!("explore".parse::<ActionKind>(), Ok(ActionKind::Explore));
        assert_eq!("Return To Base".parse::<ActionKind>(), Ok(ActionKind::ReturnToBase));
        assert_eq!("claim-territory".parse::<ActionKind>(), Ok(ActionKind::ClaimTerritory));
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().to_lowercase().parse::<ActionKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        assert_eq!(
            "DANCE".parse::<ActionKind>(),
            Err(DecisionError::UnknownAction("DANCE".to_string()))
        );
    }

    #[test]
    fn test_target_parse_is_action_aware() {
        assert_eq!(
            TargetDescriptor::parse(ActionKind::ClaimTerritory, "enemy territory"),
            TargetDescriptor::Enemy
        );
        assert_eq!(
            TargetDescriptor::parse(ActionKind::ScoutEnemy, "enemy_territory"),
            TargetDescriptor::EnemyTerritory
        );
        assert_eq!(
            TargetDescriptor::parse(ActionKind::Collect, "data"),
            TargetDescriptor::Kind(ResourceType::Data)
        );
        // Valid word, wrong verb
        assert_eq!(
            TargetDescriptor::parse(ActionKind::Attack, "BASE"),
            TargetDescriptor::NearestEnemy
        );
        assert_eq!(TargetDescriptor::parse(ActionKind::Heal, "BASE"), TargetDescriptor::None);
    }

    #[test]
    fn test_decision_from_raw() {
        let raw = RawDecision {
            action: "attack".into(),
            target: "weakest".into(),
            reasoning: "they are hurt".into(),
        };
        let decision = Decision::from_raw(&raw).unwrap();
        assert_eq!(decision.action, ActionKind::Attack);
        assert_eq!(decision.target, TargetDescriptor::WeakestEnemy);
        assert_eq!(decision.to_raw().target, "WEAKEST_ENEMY");
    }
}
