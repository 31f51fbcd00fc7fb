//! Configuration for the graph services

use crate::services::MissingNodePolicy;
use serde::{Deserialize, Serialize};

/// Upper bound for the domain event buffer; lagging subscribers drop events past it
const MAX_EVENT_CHANNEL_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// What Mutation Sync does with persisted nodes missing from a submission
    pub missing_node_policy: MissingNodePolicy,

    /// Capacity of the domain event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            missing_node_policy: MissingNodePolicy::Retain,
            event_channel_capacity: 128,
        }
    }
}

impl GraphConfig {
    pub fn with_missing_node_policy(mut self, policy: MissingNodePolicy) -> Self {
        self.missing_node_policy = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.event_channel_capacity > MAX_EVENT_CHANNEL_CAPACITY {
            return Err(format!(
                "event_channel_capacity cannot exceed {}",
                MAX_EVENT_CHANNEL_CAPACITY
            ));
        }

        Ok(())
    }
}
