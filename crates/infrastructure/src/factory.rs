use std::sync::Arc;

use tracing::info;

use taskline_core::config::QueueKind;
use taskline_core::errors::TasklineResult;
use taskline_core::traits::TaskQueue;

use crate::{LaneMapQueue, SimpleQueue, SqliteQueue};

/// Resolve a configured queue strategy to a concrete implementation.
pub async fn build_queue(kind: QueueKind) -> TasklineResult<Arc<dyn TaskQueue>> {
    info!(strategy = ?kind, "building task queue");
    Ok(match kind {
        QueueKind::Simple => Arc::new(SimpleQueue::new()),
        QueueKind::LaneMap => Arc::new(LaneMapQueue::new()),
        QueueKind::Sqlite => Arc::new(SqliteQueue::connect().await?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_every_strategy() {
        for kind in [QueueKind::Simple, QueueKind::LaneMap, QueueKind::Sqlite] {
            let queue = build_queue(kind).await.unwrap();
            assert_eq!(queue.total().await.unwrap(), 0);
        }
    }
}
