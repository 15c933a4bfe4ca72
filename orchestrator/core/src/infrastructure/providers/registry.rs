// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Registry - Name resolution for provider adapters
//
// Agents select a provider by name; the registry resolves that name to an
// adapter instance. Battles are only created for rosters whose providers
// all resolve here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::config::ProviderConfig;
use crate::domain::provider::ProviderAdapter;

use super::scripted::ScriptedProvider;

/// Registry for managing provider adapters by name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the `providers` configuration section
    pub fn from_config(configs: &[ProviderConfig]) -> Self {
        let mut registry = Self::new();

        info!("Initializing provider registry");

        for config in configs {
            if !config.enabled {
                info!("Provider '{}' disabled, skipping", config.name);
                continue;
            }

            match Self::create_provider(config) {
                Ok(provider) => {
                    info!("Registered provider '{}' ({})", config.name, config.provider_type);
                    registry.register(config.name.clone(), provider);
                }
                Err(e) => {
                    warn!("Failed to initialize provider '{}': {}", config.name, e);
                    // Continue with other providers
                }
            }
        }

        if registry.providers.is_empty() {
            warn!("No providers configured - battles cannot be created until one is registered");
        }

        registry
    }

    fn create_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn ProviderAdapter>> {
        match config.provider_type.as_str() {
            "scripted" => Ok(Arc::new(
                ScriptedProvider::new(config.replies.clone())
                    .with_latency(Duration::from_millis(config.latency_ms)),
            )),
            other => anyhow::bail!("Unsupported provider type: {}", other),
        }
    }

    /// Register (or replace) an adapter under `name`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.insert(name.into(), provider)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(name: &str, provider_type: &str, enabled: bool) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            provider_type: provider_type.to_string(),
            enabled,
            replies: vec!["hi".to_string()],
            latency_ms: 0,
        }
    }

    #[test]
    fn test_registry_from_config() {
        let registry = ProviderRegistry::from_config(&[
            provider_config("house", "scripted", true),
            provider_config("off", "scripted", false),
            provider_config("vendor", "carrier-pigeon", true),
        ]);

        assert!(registry.contains("house"));
        assert!(!registry.contains("off"));
        assert!(!registry.contains("vendor"));
        assert_eq!(registry.names(), vec!["house".to_string()]);
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.register("a", Arc::new(ScriptedProvider::new(vec![]))).is_none());
        assert!(registry.register("a", Arc::new(ScriptedProvider::new(vec![]))).is_some());
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_none());
    }
}
