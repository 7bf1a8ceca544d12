//! Redis-backed job queues for async processing
//!
//! Two logical queues exist: `default` for reproduction jobs and `reviews`
//! for review pipelines. Work items carry only the entity UUID; workers
//! fetch full state from the database. Items are pushed with LPUSH and
//! consumed with BRPOP, giving at-most-one-consumer semantics per item.

use crate::errors::{AppError, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Key of the reproduction job queue
pub const JOBS_QUEUE: &str = "arandu:queue:default";

/// Key of the review queue
pub const REVIEWS_QUEUE: &str = "arandu:queue:reviews";

/// Work item envelope: the entity UUID only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
}

/// Redis queue client
#[derive(Clone)]
pub struct Queue {
    conn: ConnectionManager,
}

impl Queue {
    /// Connect to redis and build a managed connection
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| AppError::QueueError {
            message: format!("Invalid redis URL: {e}"),
        })?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to connect to redis: {e}"),
            })?;
        Ok(Self { conn })
    }

    /// Enqueue a reproduction job
    pub async fn enqueue_job(&self, job_id: Uuid) -> Result<()> {
        self.push(JOBS_QUEUE, job_id).await
    }

    /// Enqueue a review pipeline run
    pub async fn enqueue_review(&self, review_id: Uuid) -> Result<()> {
        self.push(REVIEWS_QUEUE, review_id).await
    }

    async fn push(&self, queue: &str, id: Uuid) -> Result<()> {
        let body = serde_json::to_string(&WorkItem { id }).map_err(|e| AppError::QueueError {
            message: format!("Failed to serialize work item: {e}"),
        })?;

        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(queue, body)
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to enqueue work item: {e}"),
            })?;

        debug!(queue, id = %id, "Work item enqueued");
        Ok(())
    }

    /// Block up to `poll_seconds` waiting for the next work item.
    ///
    /// Returns `None` when the wait times out with an empty queue.
    pub async fn pop(&self, queue: &str, poll_seconds: f64) -> Result<Option<WorkItem>> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> =
            conn.brpop(queue, poll_seconds)
                .await
                .map_err(|e| AppError::QueueError {
                    message: format!("Failed to receive work item: {e}"),
                })?;

        match popped {
            Some((_, body)) => {
                let item = Self::parse_item(&body)?;
                debug!(queue, id = %item.id, "Work item received");
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Parse a work item body as JSON
    pub fn parse_item(body: &str) -> Result<WorkItem> {
        serde_json::from_str(body).map_err(|e| AppError::QueueError {
            message: format!("Failed to parse work item: {e}"),
        })
    }

    /// Approximate number of pending items in a queue
    pub async fn depth(&self, queue: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(queue).await.map_err(|e| AppError::QueueError {
            message: format!("Failed to read queue depth: {e}"),
        })?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_serialization() {
        let item = WorkItem { id: Uuid::new_v4() };
        let json = serde_json::to_string(&item).unwrap();
        let parsed = Queue::parse_item(&json).unwrap();
        assert_eq!(item.id, parsed.id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Queue::parse_item("not json").is_err());
        assert!(Queue::parse_item("{\"id\": \"not-a-uuid\"}").is_err());
    }
}
