//! Circuit breaker registry for managing one breaker per dependency

use std::sync::Arc;

use dashmap::DashMap;

use super::breaker::CircuitBreaker;
use super::types::{CircuitBreakerConfig, CircuitBreakerStats};
use crate::resilience::DependencyName;

/// Collection of circuit breakers keyed by dependency name.
///
/// Breakers are created lazily on first use and never removed. Creation goes through
/// `DashMap::entry`, so concurrent first access yields exactly one instance per name.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<DependencyName, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    /// Create a new registry with default config
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a registry with custom default config
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config: config,
        }
    }

    /// Get or create the circuit breaker for a dependency
    pub fn get_or_create(&self, name: &DependencyName) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name.as_str()) {
            return Arc::clone(existing.value());
        }

        self.breakers
            .entry(name.clone())
            .or_insert_with(|| {
                tracing::debug!(circuit = %name, "Creating circuit breaker");
                Arc::new(CircuitBreaker::with_config(
                    name.as_str(),
                    self.default_config.clone(),
                ))
            })
            .clone()
    }

    /// Get or create with custom config; the config only applies on first creation
    pub fn get_or_create_with_config(
        &self,
        name: &DependencyName,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::with_config(name.as_str(), config)))
            .clone()
    }

    /// Look up an existing breaker without creating one
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Get all circuit breaker names
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Get stats for all circuit breakers
    pub fn all_stats(&self) -> Vec<(String, CircuitBreakerStats)> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().stats()))
            .collect()
    }

    /// Reset all circuit breakers
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
