//! Subscriber installation for processes embedding the workspace libraries.
//!
//! Libraries only emit `tracing` events under their own targets. The
//! embedding process installs one subscriber, once, at startup.

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing_subscriber::util::TryInitError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name recorded when the subscriber is installed
    pub service_name: String,
    /// Level for targets without an override
    pub log_level: String,
    /// Per-target level overrides, e.g. `("vault_client", "debug")`
    pub target_levels: Vec<(String, String)>,
    /// Emit JSON lines instead of human-readable text
    pub json_output: bool,
    /// Write through the test harness so output is captured per test
    pub test_writer: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "vault-operator".to_string(),
            log_level: "info".to_string(),
            target_levels: Vec::new(),
            json_output: false,
            test_writer: false,
        }
    }
}

impl TracingConfig {
    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the default level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Override the level of one target.
    #[must_use]
    pub fn with_target_level(
        mut self,
        target: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        self.target_levels.push((target.into(), level.into()));
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Route output through the test harness.
    #[must_use]
    pub const fn with_test_writer(mut self) -> Self {
        self.test_writer = true;
        self
    }

    /// Filter directives built from the configured levels.
    #[must_use]
    pub fn directives(&self) -> String {
        std::iter::once(self.log_level.clone())
            .chain(
                self.target_levels
                    .iter()
                    .map(|(target, level)| format!("{target}={level}")),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    fn layer(&self) -> BoxedLayer {
        match (self.json_output, self.test_writer) {
            (true, true) => fmt::layer().json().with_test_writer().boxed(),
            (true, false) => fmt::layer().json().boxed(),
            (false, true) => fmt::layer().with_test_writer().boxed(),
            (false, false) => fmt::layer().boxed(),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over the configured levels.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directives()));

    tracing_subscriber::registry()
        .with(config.layer())
        .with(filter)
        .try_init()?;

    tracing::debug!(
        service = %config.service_name,
        directives = %config.directives(),
        "Tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "vault-operator");
        assert_eq!(config.directives(), "info");
        assert!(!config.json_output);
    }

    #[test]
    fn test_target_overrides_follow_default_level() {
        let config = TracingConfig::default()
            .with_log_level("warn")
            .with_target_level("vault_client", "debug")
            .with_target_level("reqwest", "error");
        assert_eq!(config.directives(), "warn,vault_client=debug,reqwest=error");
    }

    #[test]
    fn test_second_init_fails() {
        let config = TracingConfig::default().with_test_writer();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
