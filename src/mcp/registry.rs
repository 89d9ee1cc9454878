// src/mcp/registry.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::protocol::ToolInfo;
use super::tool::ToolDescriptor;

/// What happens when a second tool arrives under a name already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// The later descriptor replaces the earlier one and keeps its slot in
    /// the listing order. Every replacement is logged.
    #[default]
    Override,
    /// The whole batch is refused and the registry is left unchanged.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
}

/// Name-keyed tool table. Built at startup, then shared read-only.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    policy: CollisionPolicy,
    order: Vec<String>,
    tools: HashMap<String, Arc<ToolDescriptor>>,
}

impl ToolRegistry {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn register<I>(&mut self, descriptors: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = ToolDescriptor>,
    {
        let batch: Vec<ToolDescriptor> = descriptors.into_iter().collect();

        if self.policy == CollisionPolicy::Reject {
            let mut seen = HashSet::new();
            for d in &batch {
                if self.tools.contains_key(&d.name) || !seen.insert(d.name.as_str()) {
                    return Err(RegistryError::Duplicate(d.name.clone()));
                }
            }
        }

        for d in batch {
            let name = d.name.clone();
            if self.tools.insert(name.clone(), Arc::new(d)).is_some() {
                warn!(tool = %name, "tool registered twice; later definition wins");
            } else {
                debug!(tool = %name, "registered tool");
                self.order.push(name);
            }
        }
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.tools.get(name).cloned()
    }

    /// Descriptors in insertion order.
    pub fn list_all(&self) -> Vec<Arc<ToolDescriptor>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .collect()
    }

    pub fn tool_infos(&self) -> Vec<ToolInfo> {
        self.list_all().iter().map(|d| d.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
