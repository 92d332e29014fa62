use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SortError;

/// One owner entity's view of its many-to-many collection of members.
///
/// The owner id is `None` when the owner has never been persisted; every
/// ordering operation refuses to run against such a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation<O> {
    name: String,
    owner_id: Option<O>,
}

impl<O> Relation<O> {
    pub fn new(name: impl Into<String>, owner_id: O) -> Self {
        Self {
            name: name.into(),
            owner_id: Some(owner_id),
        }
    }

    /// A relation whose owner has not been saved yet.
    pub fn unsaved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_id(&self) -> Option<&O> {
        self.owner_id.as_ref()
    }

    /// Owner id, or `SortError::UnsavedOwner` if the owner was never saved.
    pub fn require_owner(&self) -> Result<&O, SortError> {
        self.owner_id.as_ref().ok_or_else(|| SortError::UnsavedOwner {
            relation: self.name.clone(),
        })
    }
}

impl<O: fmt::Display> fmt::Display for Relation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_id {
            Some(owner) => write!(f, "{}({})", self.name, owner),
            None => write!(f, "{}(unsaved)", self.name),
        }
    }
}

/// Placement requested when attaching a new member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Beginning,
    #[default]
    End,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Beginning => f.write_str("beginning"),
            Position::End => f.write_str("end"),
        }
    }
}

/// How `attach` behaves when the member already has a pivot in the relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachMethod {
    /// Always insert a new pivot.
    Always,
    /// Skip members that are already attached.
    #[default]
    IfNotExists,
}
