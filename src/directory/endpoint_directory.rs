use std::collections::HashMap;

use super::ConsumerConfig;
use super::ProviderConfig;
use super::RouteConfig;
use crate::ServiceInfo;

/// Instances and configuration objects of one service, keyed by URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDirectory {
    /// `{scheme}://{address}` → instance descriptor
    pub nodes: HashMap<String, ServiceInfo>,
    pub route_configs: HashMap<String, RouteConfig>,
    pub provider_configs: HashMap<String, ProviderConfig>,
    pub consumer_configs: HashMap<String, ConsumerConfig>,
}

impl EndpointDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across the four maps
    pub fn len(&self) -> usize {
        self.nodes.len() + self.route_configs.len() + self.provider_configs.len() + self.consumer_configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep copy sharing nothing with `self`
    pub fn clone_directory(&self) -> Self {
        Self {
            nodes: self
                .nodes
                .iter()
                .map(|(uri, info)| (uri.clone(), info.clone()))
                .collect(),
            route_configs: self
                .route_configs
                .iter()
                .map(|(uri, config)| (uri.clone(), config.clone()))
                .collect(),
            provider_configs: self
                .provider_configs
                .iter()
                .map(|(uri, config)| (uri.clone(), config.clone()))
                .collect(),
            consumer_configs: self
                .consumer_configs
                .iter()
                .map(|(uri, config)| (uri.clone(), config.clone()))
                .collect(),
        }
    }

    /// Instance descriptors sorted by URI
    pub fn sorted_nodes(&self) -> Vec<(&String, &ServiceInfo)> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| a.0.cmp(b.0));
        nodes
    }
}
