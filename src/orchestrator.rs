//! Fetch orchestration
//!
//! Resolves a target name to its adapter, runs it, and turns whatever the
//! adapter raised into a `FetchFailure`. This is the only place adapter errors
//! are translated; nothing downstream inspects `SourceError`.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::error::FetchFailure;
use crate::metrics;
use crate::registry::SourceRegistry;
use crate::schemas::Item;
use crate::sources::FetchParams;

pub struct FetchOrchestrator {
    registry: Arc<SourceRegistry>,
}

impl FetchOrchestrator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    pub fn supports(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn supported_names(&self) -> Vec<String> {
        self.registry.supported_names()
    }

    /// Runs the adapter registered under `name`. No retries.
    #[instrument(skip(self, params), fields(source = %name))]
    pub async fn execute(&self, name: &str, params: &FetchParams) -> Result<Vec<Item>, FetchFailure> {
        let Some(source) = self.registry.lookup(name) else {
            debug!("Unsupported target requested");
            return Err(FetchFailure::UnsupportedSource {
                name: name.to_string(),
                supported: self.registry.supported_names(),
            });
        };

        let start = Instant::now();
        let result = source.fetch(params).await;
        let elapsed = start.elapsed();

        metrics::record_fetch(name, result.is_ok(), elapsed.as_secs_f64());

        match result {
            Ok(items) => {
                info!(
                    items = items.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Fetch completed"
                );
                Ok(items)
            }
            Err(e) => {
                error!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Fetch failed");
                Err(FetchFailure::AdapterError {
                    source_id: name.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}
