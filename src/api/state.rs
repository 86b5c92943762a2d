use std::sync::Arc;

use crate::generator::GeneratorController;
use crate::notify::policy::PolicyHandle;
use crate::pipeline::Pipeline;
use crate::storage::Pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub pipeline: Arc<Pipeline>,
    pub policy: PolicyHandle,
    pub generator: Arc<GeneratorController>,
}
