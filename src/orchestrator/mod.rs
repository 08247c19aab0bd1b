//! Goal orchestration
//!
//! An [`Orchestrator`] bundles the collaborators shared by every session of
//! a server (model, site lookup, journal factory, metrics). Each connection
//! gets its own [`GoalSession`], the state machine that turns inbound
//! messages into outbound ones.
//!
//! ```text
//! init ──▶ intent gate ──▶ request_dom / goto
//! dom_with_image ──▶ summarize ──▶ page_analysis ──▶ login check
//!                                     │
//!            ┌────────────┬───────────┴──────────┐
//!            ▼            ▼                      ▼
//!        planning     evaluation      execution (direct or chunked)
//! ```

mod chunked;
mod evaluation;
pub mod intent;
mod session;
mod state;

pub use chunked::{analyze_chunks, ChunkJob, NO_ACTION_REASON};
pub use evaluation::EvaluationVerdict;
pub use intent::GoalIntent;
pub use session::GoalSession;
pub use state::OrchestrationState;

use crate::config::OrchestratorConfig;
use crate::error::ModelError;
use crate::journal::{FileJournalFactory, JournalFactory, NullJournal};
use crate::llm::{ModelClient, ModelRequest};
use crate::metrics::Metrics;
use crate::sites::{SiteLookup, StaticSiteLookup};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Model client with a deadline and metrics around every call
#[derive(Clone)]
pub struct TimedModel {
    model: Arc<dyn ModelClient>,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl TimedModel {
    /// Wrap `model`
    pub fn new(model: Arc<dyn ModelClient>, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            model,
            timeout,
            metrics,
        }
    }

    /// One round-trip. Expiry becomes [`ModelError::Timeout`], blank text
    /// becomes [`ModelError::EmptyResponse`].
    pub async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        let started = Instant::now();
        let with_image = request.image.is_some();

        let result = match tokio::time::timeout(self.timeout, self.model.complete(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(self.timeout.as_millis() as u64)),
        }
        .and_then(|text| {
            if text.trim().is_empty() {
                Err(ModelError::EmptyResponse)
            } else {
                Ok(text)
            }
        });

        let elapsed = started.elapsed();
        self.metrics.record_model_call(elapsed, result.is_ok());
        match &result {
            Ok(text) => debug!(
                with_image,
                elapsed_ms = elapsed.as_millis() as u64,
                "Model replied ({} chars)",
                text.len()
            ),
            Err(e) => warn!(with_image, "Model call failed: {}", e),
        }
        result
    }
}

/// Collaborators shared by all sessions of one server
#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    model: TimedModel,
    sites: Arc<dyn SiteLookup>,
    journals: Arc<dyn JournalFactory>,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    /// Orchestrator over `model` with the default site table.
    ///
    /// Journals go to `config.journal_dir` when set, nowhere otherwise.
    pub fn new(config: OrchestratorConfig, model: Arc<dyn ModelClient>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let journals: Arc<dyn JournalFactory> = match &config.journal_dir {
            Some(dir) => Arc::new(FileJournalFactory::new(dir.clone())),
            None => Arc::new(NullJournal),
        };
        Self {
            model: TimedModel::new(model, config.model_timeout(), metrics.clone()),
            config,
            sites: Arc::new(StaticSiteLookup::with_defaults()),
            journals,
            metrics,
        }
    }

    /// Replace the site lookup
    pub fn with_sites(mut self, sites: Arc<dyn SiteLookup>) -> Self {
        self.sites = sites;
        self
    }

    /// Replace the journal factory
    pub fn with_journals(mut self, journals: Arc<dyn JournalFactory>) -> Self {
        self.journals = journals;
        self
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.model.metrics = metrics.clone();
        self.metrics = metrics;
        self
    }

    /// Start an independent session
    pub fn session(&self) -> GoalSession {
        GoalSession::new(self.clone())
    }

    /// Loop configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
