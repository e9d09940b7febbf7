//! Short-lived store for captured command output.
//!
//! Each finished command gets a ticket; the output stays retrievable for
//! `ttl` and is then dropped by a background timer. Reads also check the
//! age themselves, so a record is never served past its TTL even if the
//! timer task has not run yet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

/// Captured output of one command
#[derive(Debug, Clone)]
pub struct ProcessOutputRecord {
    pub ticket_id: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
    stored_at: Instant,
}

#[derive(Clone)]
pub struct TicketStore {
    records: Arc<Mutex<HashMap<String, ProcessOutputRecord>>>,
    ttl: Duration,
}

impl TicketStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores `output` under a fresh ticket and schedules its removal.
    /// Must be called from within a tokio runtime.
    pub fn insert(&self, output: String) -> String {
        let ticket_id = new_ticket_id();
        let record = ProcessOutputRecord {
            ticket_id: ticket_id.clone(),
            output,
            created_at: Utc::now(),
            stored_at: Instant::now(),
        };
        let live = {
            let mut records = self.lock();
            records.insert(ticket_id.clone(), record);
            records.len()
        };
        debug!("Stored {ticket_id} ({live} live tickets)");

        let records = Arc::clone(&self.records);
        let ttl = self.ttl;
        let expired = ticket_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let removed = records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&expired);
            if removed.is_some() {
                debug!("Ticket {expired} expired");
            }
        });

        ticket_id
    }

    /// Returns the record for a live ticket. Reading does not consume it.
    pub fn get(&self, ticket_id: &str) -> Option<ProcessOutputRecord> {
        let records = self.lock();
        records
            .get(ticket_id)
            .filter(|r| r.stored_at.elapsed() < self.ttl)
            .cloned()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProcessOutputRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `term-<unix millis>-<8 hex>`: time-ordered, and unique even when two
/// commands finish within the same millisecond.
fn new_ticket_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("term-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}
