//! The single-threaded event loop
//!
//! All inbound events (fired alarms, periodic sweep ticks) funnel
//! through one receiver and are processed one at a time, run to
//! completion, so no two reactions for the same work item ever
//! interleave. Failures are logged and never abort the loop.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::followup::FollowUpEngine;
use crate::scheduled::{Scheduler, TriggerEvent};

/// Drain trigger events until the channel closes
pub async fn run(
    mut events: mpsc::UnboundedReceiver<TriggerEvent>,
    scheduler: Arc<Scheduler>,
    engine: Arc<FollowUpEngine>,
) {
    info!("Worker loop started");

    while let Some(event) = events.recv().await {
        match event {
            TriggerEvent::Fired(id) => {
                if let Err(e) = scheduler.on_trigger_fired(id).await {
                    error!(%id, "Failed to process fired trigger: {}", e);
                }
            }
            TriggerEvent::Sweep(tag) => {
                if let Err(e) = engine.sweep().await {
                    error!(%tag, "Follow-up sweep failed: {}", e);
                }
            }
        }
    }

    info!("Worker loop stopped");
}
