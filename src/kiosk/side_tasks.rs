//! Supervised best-effort background tasks (photo persistence)

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::Result;

/// Recorded outcome of a finished side task
#[derive(Debug, Clone)]
pub struct SideTaskReport {
    pub name: String,
    pub session: Uuid,
    pub outcome: std::result::Result<(), String>,
}

impl SideTaskReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

struct Pending {
    name: String,
    session: Uuid,
    handle: JoinHandle<()>,
}

/// Tracks spawned side tasks; failures are logged and recorded, never propagated
#[derive(Clone, Default)]
pub struct SideTasks {
    pending: Arc<Mutex<Vec<Pending>>>,
    reports: Arc<Mutex<Vec<SideTaskReport>>>,
}

impl SideTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` in the background
    pub fn spawn<F>(&self, name: impl Into<String>, session: Uuid, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let reports = self.reports.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let outcome = task.await.map_err(|e| e.to_string());
            match &outcome {
                Ok(()) => info!(task = %task_name, session = %session, "Side task completed"),
                Err(e) => error!(task = %task_name, session = %session, error = %e, "Side task failed"),
            }
            reports.lock().push(SideTaskReport {
                name: task_name,
                session,
                outcome,
            });
        });

        let mut pending = self.pending.lock();
        pending.retain(|p| !p.handle.is_finished());
        pending.push(Pending {
            name,
            session,
            handle,
        });
    }

    /// Wait until every spawned task has finished
    pub async fn wait_idle(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for task in pending {
            if let Err(e) = task.handle.await {
                error!(task = %task.name, session = %task.session, error = %e, "Side task panicked");
                self.reports.lock().push(SideTaskReport {
                    name: task.name,
                    session: task.session,
                    outcome: Err(format!("task panicked: {}", e)),
                });
            }
        }
    }

    /// Outcomes recorded so far
    pub fn reports(&self) -> Vec<SideTaskReport> {
        self.reports.lock().clone()
    }
}
