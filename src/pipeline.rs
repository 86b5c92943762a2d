//! The scoring pipeline shared by external ingestion and the generator.
//!
//! One call runs score -> classify -> build -> persist -> notify. The store
//! append happens before notification for each incident; no ordering is
//! guaranteed between incidents from concurrent producers.

use thiserror::Error;
use uuid::Uuid;

use crate::detect::scorer::AnomalyScorer;
use crate::detect::{catalog, DataPoint, DetectError, Incident};
use crate::notify::NotificationRouter;
use crate::storage::{self, Pool};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("datapoint source must be a non-empty identifier")]
    EmptySource,

    #[error(transparent)]
    Invalid(#[from] DetectError),

    #[error("failed to persist incident: {0}")]
    Storage(#[source] anyhow::Error),
}

pub struct Pipeline {
    scorer: AnomalyScorer,
    pool: Pool,
    router: NotificationRouter,
}

impl Pipeline {
    pub fn new(pool: Pool, router: NotificationRouter) -> Self {
        Self {
            scorer: AnomalyScorer::new(),
            pool,
            router,
        }
    }

    /// Run one datapoint through the full pipeline and return the stored
    /// incident together with the id the store assigned.
    ///
    /// Notification failures never surface here; they are the router's
    /// concern and are only logged.
    pub async fn ingest(&self, datapoint: DataPoint) -> Result<(Uuid, Incident), PipelineError> {
        if datapoint.source.trim().is_empty() {
            return Err(PipelineError::EmptySource);
        }

        let result = self.scorer.score(&datapoint.values)?;
        let incident = catalog::build_incident(&datapoint, result);

        let id = storage::append_incident(&self.pool, &incident).map_err(PipelineError::Storage)?;
        self.router.route_if_needed(&incident).await;

        tracing::debug!(
            %id,
            source = %incident.source,
            severity = %incident.severity,
            score = incident.score,
            "incident recorded"
        );
        Ok((id, incident))
    }
}
