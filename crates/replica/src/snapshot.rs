use std::collections::{BTreeMap, HashMap};
use std::fmt;

use glam::Vec3;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::team::{Team, TeamTable};

pub const DEFAULT_HEALTH: i32 = 100;

const POSITION_INDEX: usize = 0;
const NAME_INDEX: usize = 1;
const TEAM_INDEX: usize = 2;
const HEALTH_INDEX: usize = 3;
const FORWARD_INDEX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// One entity as observed in one payload. Positions and facing are kept in
/// feed order (`x, z, y`) until mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub team: Team,
    pub health: i32,
    pub raw_position: Vec3,
    pub raw_forward: Vec3,
}

impl EntitySnapshot {
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotAnArray,
    MissingName,
    MissingTeam,
    UnknownTeam,
    MissingPosition,
    InvalidPosition,
    MissingForward,
    InvalidForward,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSnapshot {
    entities: HashMap<EntityId, EntitySnapshot>,
    rejected: HashMap<EntityId, RejectReason>,
}

impl ParsedSnapshot {
    pub fn from_entities(entities: impl IntoIterator<Item = EntitySnapshot>) -> Self {
        Self {
            entities: entities
                .into_iter()
                .map(|entity| (entity.id.clone(), entity))
                .collect(),
            rejected: HashMap::new(),
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn rejection(&self, id: &EntityId) -> Option<RejectReason> {
        self.rejected.get(id).copied()
    }

    pub fn is_rejected(&self, id: &EntityId) -> bool {
        self.rejected.contains_key(id)
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed snapshot payload: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed snapshot payload at {path}: {source}")]
    MalformedAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotParser {
    teams: TeamTable,
}

impl SnapshotParser {
    pub fn new(teams: TeamTable) -> Self {
        Self { teams }
    }

    pub fn teams(&self) -> &TeamTable {
        &self.teams
    }

    /// Decodes one payload. Only a payload that is not a JSON object fails;
    /// bad individual entries are recorded as rejected and left out.
    pub fn parse(&self, payload: &str) -> Result<ParsedSnapshot, ParseError> {
        let raw = decode_payload(payload)?;
        let mut parsed = ParsedSnapshot::default();
        for (key, value) in raw {
            let id = EntityId::new(key);
            match self.parse_entity(&id, &value) {
                Ok(entity) => {
                    parsed.entities.insert(id, entity);
                }
                Err(reason) => {
                    debug!(entity = %id, ?reason, "snapshot_entity_rejected");
                    parsed.rejected.insert(id, reason);
                }
            }
        }
        Ok(parsed)
    }

    fn parse_entity(&self, id: &EntityId, value: &Value) -> Result<EntitySnapshot, RejectReason> {
        let fields = value.as_array().ok_or(RejectReason::NotAnArray)?;

        let position_text =
            text_field(fields.get(POSITION_INDEX)).ok_or(RejectReason::MissingPosition)?;
        let name = text_field(fields.get(NAME_INDEX)).ok_or(RejectReason::MissingName)?;
        let team_code = text_field(fields.get(TEAM_INDEX)).ok_or(RejectReason::MissingTeam)?;
        let team = self
            .teams
            .resolve(&team_code)
            .ok_or(RejectReason::UnknownTeam)?;
        let raw_position = parse_triple(&position_text).ok_or(RejectReason::InvalidPosition)?;
        let forward_text =
            text_field(fields.get(FORWARD_INDEX)).ok_or(RejectReason::MissingForward)?;
        let raw_forward = parse_triple(&forward_text).ok_or(RejectReason::InvalidForward)?;

        Ok(EntitySnapshot {
            id: id.clone(),
            name,
            team,
            health: parse_health(fields.get(HEALTH_INDEX)),
            raw_position,
            raw_forward,
        })
    }
}

fn decode_payload(payload: &str) -> Result<BTreeMap<String, Value>, ParseError> {
    let mut deserializer = serde_json::Deserializer::from_str(payload);
    let raw = serde_path_to_error::deserialize::<_, BTreeMap<String, Value>>(&mut deserializer)
        .map_err(|error| {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                ParseError::Malformed { source }
            } else {
                ParseError::MalformedAt { path, source }
            }
        })?;
    deserializer
        .end()
        .map_err(|source| ParseError::Malformed { source })?;
    Ok(raw)
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_triple(text: &str) -> Option<Vec3> {
    let mut parts = text.split(',').map(str::trim);
    let a = parts.next()?.parse::<f32>().ok()?;
    let b = parts.next()?.parse::<f32>().ok()?;
    let c = parts.next()?.parse::<f32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let triple = Vec3::new(a, b, c);
    triple.is_finite().then_some(triple)
}

fn parse_health(value: Option<&Value>) -> i32 {
    let parsed = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .map(|whole| whole.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.is_finite())
                    .map(|float| float.trunc() as i32)
            }),
        Some(Value::String(text)) => text.trim().parse::<i32>().ok(),
        _ => None,
    };
    parsed.unwrap_or(DEFAULT_HEALTH)
}
