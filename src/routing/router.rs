//! Content routing: content type to destination labels

use crate::config::{ContentType, RoutingConfig};
use crate::error::{Error, Result};
use crate::routing::handlers::{HandlerOutcome, Priority};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A destination a processed page is filed under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub destination: String,
    pub content_type: ContentType,
    pub priority: Priority,
    pub actions: Vec<String>,
}

/// Static lookup from content type to destination labels
pub struct ContentRouter {
    destinations: HashMap<ContentType, Vec<String>>,
    fallback: String,
}

impl ContentRouter {
    /// Create a router from the routing configuration
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        if config.fallback_destination.trim().is_empty() {
            return Err(Error::Config(
                "routing.fallback_destination must not be empty".to_string(),
            ));
        }

        let destinations = config
            .rules
            .iter()
            .filter(|rule| !rule.destinations.is_empty())
            .map(|rule| (rule.content_type, rule.destinations.clone()))
            .collect();

        Ok(Self {
            destinations,
            fallback: config.fallback_destination.clone(),
        })
    }

    /// Destinations for a content type; never empty
    pub fn route(&self, content_type: ContentType) -> Vec<String> {
        self.destinations
            .get(&content_type)
            .cloned()
            .unwrap_or_else(|| vec![self.fallback.clone()])
    }

    /// Destinations for a raw content-type name; unknown names use the fallback
    pub fn route_by_name(&self, name: &str) -> Vec<String> {
        match name.parse::<ContentType>() {
            Ok(content_type) => self.route(content_type),
            Err(_) => vec![self.fallback.clone()],
        }
    }

    /// One route per destination, carrying the handler's priority and actions
    pub fn routes(&self, content_type: ContentType, outcome: &HandlerOutcome) -> Vec<Route> {
        self.route(content_type)
            .into_iter()
            .map(|destination| Route {
                destination,
                content_type,
                priority: outcome.priority,
                actions: outcome.suggested_actions.clone(),
            })
            .collect()
    }
}

impl Default for ContentRouter {
    fn default() -> Self {
        let config = RoutingConfig::default();
        Self {
            destinations: config
                .rules
                .into_iter()
                .map(|rule| (rule.content_type, rule.destinations))
                .collect(),
            fallback: config.fallback_destination,
        }
    }
}
