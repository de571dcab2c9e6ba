//! Federation configuration.

/// Default slack of relation-first discovery iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Default cap on the relation fetch offset during discovery.
pub const DEFAULT_MAX_OFFSET: u64 = 10_000;

/// Default page size when the caller gives none.
pub const DEFAULT_LIMIT: u64 = 100;

/// Total reported for a root scope with no filters.
pub const UNCONSTRAINED_TOTAL: u64 = u64::MAX;

/// Federation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationConfig {
    /// Discovery windows allowed beyond those needed to reach the requested
    /// page.
    pub max_iterations: usize,

    /// Offset at which the buffer strategy stops widening.
    pub max_offset: u64,

    /// Page size used when a request carries no limit.
    pub default_limit: u64,

    /// Issue independent relation fetches concurrently.
    pub concurrent_fan_out: bool,
}

impl FederationConfig {
    /// Create a configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_offset: DEFAULT_MAX_OFFSET,
            default_limit: DEFAULT_LIMIT,
            concurrent_fan_out: true,
        }
    }

    /// Set the discovery iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Set the buffer offset cap.
    pub fn with_max_offset(mut self, max_offset: u64) -> Self {
        self.max_offset = max_offset;
        self
    }

    /// Set the default page size.
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Issue relation fetches one after another.
    pub fn sequential(mut self) -> Self {
        self.concurrent_fan_out = false;
        self
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FederationConfig::default();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.max_offset, DEFAULT_MAX_OFFSET);
        assert_eq!(config.default_limit, DEFAULT_LIMIT);
        assert!(config.concurrent_fan_out);
    }

    #[test]
    fn test_config_builder() {
        let config = FederationConfig::new()
            .with_max_iterations(0)
            .with_max_offset(500)
            .with_default_limit(0)
            .sequential();

        assert_eq!(config.max_iterations, 1);
        assert_eq!(config.max_offset, 500);
        assert_eq!(config.default_limit, 1);
        assert!(!config.concurrent_fan_out);
    }
}
