//! Registry resolving a descriptor to its adapter.

use parking_lot::RwLock;
use std::sync::Arc;

use super::google::GoogleAdapter;
use super::topcoder::TopcoderAdapter;
use super::Adapter;
use crate::config::StandingsConfig;
use crate::errors::Result;
use crate::models::ContestDescriptor;
use crate::requester::{HttpRequester, Requester};

/// Registered adapters, consulted in registration order.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<Vec<Arc<dyn Adapter>>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in adapter sharing one requester.
    #[must_use]
    pub fn with_requester(requester: Arc<dyn Requester>, config: &StandingsConfig) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(TopcoderAdapter::new(requester.clone(), config.clone())));
        registry.register(Arc::new(GoogleAdapter::new(requester, config.clone())));
        registry
    }

    /// Registry with every built-in adapter over a fresh HTTP requester.
    pub fn from_config(config: &StandingsConfig) -> Result<Self> {
        let requester: Arc<dyn Requester> = Arc::new(HttpRequester::new(&config.fetch)?);
        Ok(Self::with_requester(requester, config))
    }

    /// Registers an adapter.
    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        self.adapters.write().push(adapter);
    }

    /// First adapter supporting `descriptor`.
    #[must_use]
    pub fn for_descriptor(&self, descriptor: &ContestDescriptor) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .read()
            .iter()
            .find(|a| a.supports(descriptor))
            .cloned()
    }

    /// Adapter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.read().iter().find(|a| a.name() == name).cloned()
    }

    /// Names of the registered adapters.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.read().iter().map(|a| a.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{google_round_descriptor, srm_descriptor, ScriptedRequester};

    #[test]
    fn test_resolves_by_descriptor() {
        let registry = AdapterRegistry::with_requester(Arc::new(ScriptedRequester::new()), &StandingsConfig::default());
        assert_eq!(registry.names(), vec!["topcoder", "google"]);

        let tc = registry.for_descriptor(&srm_descriptor(17427)).unwrap();
        assert_eq!(tc.name(), "topcoder");
        let g = registry
            .for_descriptor(&google_round_descriptor("Round 1A 2021", "000000000043585d"))
            .unwrap();
        assert_eq!(g.name(), "google");

        let unknown = ContestDescriptor::new("x", "https://example.com", chrono::Utc::now());
        assert!(registry.for_descriptor(&unknown).is_none());
        assert!(registry.get("google").is_some());
    }

    #[test]
    fn test_from_config_builds_http_requester() {
        let registry = AdapterRegistry::from_config(&StandingsConfig::default()).unwrap();
        assert_eq!(registry.names().len(), 2);
    }
}
