use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::RepresentationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn representation_kind(self) -> RepresentationKind {
        match self {
            Team::A => RepresentationKind::TeamA,
            Team::B => RepresentationKind::TeamB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamTable {
    codes: BTreeMap<String, Team>,
}

impl Default for TeamTable {
    fn default() -> Self {
        Self::new([("A", Team::A), ("B", Team::B), ("CT", Team::A), ("T", Team::B)])
    }
}

impl TeamTable {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = (S, Team)>,
        S: Into<String>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|(code, team)| (code.into(), team))
                .collect(),
        }
    }

    pub fn resolve(&self, code: &str) -> Option<Team> {
        self.codes.get(code.trim()).copied()
    }

    pub fn insert(&mut self, code: impl Into<String>, team: Team) -> Option<Team> {
        self.codes.insert(code.into(), team)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
