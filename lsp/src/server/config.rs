use std::sync::PoisonError;
use std::time::Duration;

use serde::Deserialize;
use tower_lsp::lsp_types::ConfigurationItem;
use tracing::{debug, warn};

use super::state::MarkdocLanguageServer;

pub(crate) const CONFIG_SECTION: &str = "markdoc";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServerConfig {
    /// Command prefix used to compile schema modules; `None` runs node.
    pub(crate) compiler: Option<Vec<String>>,
    pub(crate) diagnostics_enabled: bool,
    pub(crate) readiness_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            compiler: None,
            diagnostics_enabled: true,
            readiness_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MarkdocConfigSection {
    #[serde(default)]
    schema: SchemaConfig,
    #[serde(default)]
    diagnostics: DiagnosticsConfig,
    #[serde(default)]
    readiness: ReadinessConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SchemaConfig {
    #[serde(default)]
    compiler: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DiagnosticsConfig {
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ReadinessConfig {
    #[serde(default)]
    timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Apply a `markdoc` configuration section. Returns whether the compiler
    /// command changed.
    pub(crate) fn apply(&mut self, value: serde_json::Value) -> bool {
        let section = match serde_json::from_value::<MarkdocConfigSection>(value) {
            Ok(section) => section,
            Err(e) => {
                warn!("ignoring invalid markdoc configuration: {}", e);
                return false;
            }
        };

        self.diagnostics_enabled = section.diagnostics.enabled.unwrap_or(true);
        if let Some(ms) = section.readiness.timeout_ms.filter(|ms| *ms > 0) {
            self.readiness_timeout = Duration::from_millis(ms);
        }

        let compiler = section.schema.compiler.filter(|argv| !argv.is_empty());
        let changed = compiler != self.compiler;
        self.compiler = compiler;
        changed
    }
}

impl MarkdocLanguageServer {
    /// Pull the `markdoc` section from the client. Returns whether the
    /// compiler command changed.
    pub(crate) async fn load_config(&self) -> bool {
        let items = vec![ConfigurationItem {
            scope_uri: None,
            section: Some(CONFIG_SECTION.to_string()),
        }];

        let value = match self.client.configuration(items).await {
            Ok(values) => values.into_iter().next(),
            Err(e) => {
                debug!("client configuration unavailable: {}", e);
                None
            }
        };
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return false;
        };
        self.config.lock().unwrap_or_else(PoisonError::into_inner).apply(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert!(config.diagnostics_enabled);
        assert_eq!(config.readiness_timeout, Duration::from_millis(5000));
        assert!(config.compiler.is_none());
    }

    #[test]
    fn test_apply_section() {
        let mut config = ServerConfig::default();
        let changed = config.apply(json!({
            "schema": {"compiler": ["bun", "run", "load.ts"]},
            "diagnostics": {"enabled": false},
            "readiness": {"timeoutMs": 250}
        }));
        assert!(changed);
        assert!(!config.diagnostics_enabled);
        assert_eq!(config.readiness_timeout, Duration::from_millis(250));
        assert_eq!(
            config.compiler.as_deref(),
            Some(&["bun".to_string(), "run".to_string(), "load.ts".to_string()][..])
        );

        assert!(!config.apply(json!({"schema": {"compiler": ["bun", "run", "load.ts"]}})));
        assert!(config.diagnostics_enabled, "omitted fields fall back to defaults");
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let mut config = ServerConfig::default();
        assert!(!config.apply(json!({"readiness": {"timeoutMs": "soon"}})));
        assert_eq!(config, ServerConfig::default());

        assert!(!config.apply(json!({"schema": {"compiler": []}, "readiness": {"timeoutMs": 0}})));
        assert_eq!(config, ServerConfig::default());
    }
}
