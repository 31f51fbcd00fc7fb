//! Related entities (agents, portfolios, teams) denormalized into workspace views

use crate::models::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Agent,
    Portfolio,
    Team,
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ValidationError::MissingField("kind".to_string())),
            "agent" => Ok(EntityKind::Agent),
            "portfolio" => Ok(EntityKind::Portfolio),
            "team" => Ok(EntityKind::Team),
            other => Err(ValidationError::InvalidEntityKind(other.to_string())),
        }
    }
}

/// A stored agent, portfolio or team record.
///
/// System entities (`is_system = true`) are shared templates visible from every
/// workspace; all others belong to exactly one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,

    pub kind: EntityKind,

    #[serde(default)]
    pub workspace_id: Option<String>,

    #[serde(default)]
    pub is_system: bool,

    pub name: String,

    #[serde(default)]
    pub data: serde_json::Value,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(
        kind: EntityKind,
        workspace_id: Option<String>,
        name: String,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            is_system: workspace_id.is_none(),
            workspace_id,
            name,
            data,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> EntitySummary {
        EntitySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            is_system: self.is_system,
            data: self.data.clone(),
        }
    }
}

/// The plain shape the client expects for related entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
    pub is_system: bool,
    pub data: serde_json::Value,
}

/// Input for creating a workspace-scoped entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityParams {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl CreateEntityParams {
    pub fn validate(&self) -> Result<EntityKind, ValidationError> {
        let kind = self.kind.parse()?;
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        Ok(kind)
    }
}
