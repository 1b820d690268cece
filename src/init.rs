//! Module initialization barrier

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{AppError, Result};

/// A module that must be ready before the kiosk leaves `Initialize`
#[async_trait]
pub trait Initializable: Send + Sync {
    /// Name used in logs
    fn module_name(&self) -> &str;

    /// Prepare the module
    async fn initialize(&self) -> Result<()>;
}

/// Initialize every module concurrently and wait for all of them
///
/// Returns the names of the modules that failed, paired with their error.
pub async fn initialize_all(modules: &[Arc<dyn Initializable>]) -> Vec<(String, AppError)> {
    let results = join_all(modules.iter().map(|m| async move {
        (m.module_name().to_string(), m.initialize().await)
    }))
    .await;

    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(()) => info!(module = %name, "Module initialized"),
            Err(e) => {
                error!(module = %name, error = %e, "Module initialization failed");
                failures.push((name, e));
            }
        }
    }

    info!(
        total = modules.len(),
        failed = failures.len(),
        "All modules initialization completed"
    );
    failures
}
