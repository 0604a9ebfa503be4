use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task;
use tokio::time::{sleep, Duration, Instant};
use tower_lsp::lsp_types::*;
use tracing::{debug, error};

use crate::analyzer::MarkdocAnalyzer;

use super::state::MarkdocLanguageServer;

pub(crate) const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll `ready` until it is set. Returns `false` once `timeout` has passed.
pub(crate) async fn wait_till_ready(ready: &AtomicBool, timeout: Duration) -> bool {
    let started = Instant::now();
    loop {
        if ready.load(Ordering::Acquire) {
            return true;
        }
        if started.elapsed() >= timeout {
            return false;
        }
        sleep(READY_POLL_INTERVAL).await;
    }
}

fn exit_not_ready(timeout: Duration) -> ! {
    error!("schema was not ready after {} ms, shutting down", timeout.as_millis());
    std::process::exit(1);
}

impl MarkdocLanguageServer {
    /// Analyzer over the project schema, held until the first load commits.
    pub(crate) async fn ready_analyzer(&self) -> MarkdocAnalyzer {
        let timeout = self.config().readiness_timeout;
        if !wait_till_ready(&self.ready, timeout).await {
            exit_not_ready(timeout);
        }
        self.analyzer()
    }

    /// Validate `uri` after `delay_ms` and publish the result, unless the
    /// document moved past `scheduled_version` in the meantime.
    pub(crate) async fn schedule_diagnostics(&self, uri: Url, scheduled_version: i32, delay_ms: u64) {
        let config = self.config();
        if !config.diagnostics_enabled {
            return;
        }

        let documents = self.documents.clone();
        let client = self.client.clone();
        let registry = self.registry();
        let ready = self.ready.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;

            if !wait_till_ready(&ready, config.readiness_timeout).await {
                exit_not_ready(config.readiness_timeout);
            }

            let parsed = match documents.get_mut(&uri) {
                Some(mut doc) if doc.version == scheduled_version => doc.parsed(),
                Some(_) => return,
                None => return,
            };

            let analyzer = MarkdocAnalyzer::new(registry.snapshot());
            let computed = task::spawn_blocking(move || analyzer.analyze_document(parsed)).await;
            let analysis = match computed {
                Ok(analysis) => analysis,
                Err(e) => {
                    error!("diagnostics task for {} failed: {}", uri, e);
                    return;
                }
            };

            let current = documents.get(&uri).map(|doc| doc.version);
            if current != Some(scheduled_version) {
                debug!("dropping stale diagnostics for {}", uri);
                return;
            }
            client
                .publish_diagnostics(uri, analysis.diagnostics, Some(scheduled_version))
                .await;
        });
    }

    /// Re-validate every open document, e.g. after the schema changed.
    pub(crate) async fn refresh_all_diagnostics(&self) {
        let open: Vec<(Url, i32)> = self
            .documents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().version))
            .collect();
        for (uri, version) in open {
            self.schedule_diagnostics(uri, version, 0).await;
        }
    }

    pub(crate) async fn clear_diagnostics(&self, uri: Url) {
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    /// Mark the server ready once `registry` finished its first load.
    pub(crate) fn spawn_initial_load(&self) {
        let registry = self.registry();
        let ready = self.ready.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            let loaded = registry.load().await;
            ready.store(true, Ordering::Release);
            let message = match (&loaded, registry.root()) {
                (Some(schema), Some(root)) => format!(
                    "Loaded Markdoc schema for {} ({} tags, {} functions)",
                    root.display(),
                    schema.tags.len(),
                    schema.functions.len()
                ),
                (_, None) => "No workspace folder; using built-in Markdoc schema".to_string(),
                (None, Some(_)) => return,
            };
            client.log_message(MessageType::INFO, message).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_till_ready_returns_once_set() {
        let ready = Arc::new(AtomicBool::new(false));
        let setter = ready.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            setter.store(true, Ordering::Release);
        });
        assert!(wait_till_ready(&ready, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_wait_till_ready_times_out() {
        let ready = AtomicBool::new(false);
        let started = Instant::now();
        assert!(!wait_till_ready(&ready, Duration::from_millis(250)).await);
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_wait_till_ready_when_already_ready() {
        let ready = AtomicBool::new(true);
        assert!(wait_till_ready(&ready, Duration::ZERO).await);
    }
}
