use crate::meteo_logic::model::DisplayRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Shared handle to the service state: the cumulative display record plus
/// the scheduler's idle/updating flag. Cloned into each task; there is no
/// static storage anywhere in the service.
#[derive(Clone)]
pub struct AppState {
    // Cumulative merged view of everything the bus has told us so far.
    record: Arc<Mutex<DisplayRecord>>,
    // True while a publish is in flight. Guards against overlapping
    // publishes only; the record itself is covered by its mutex.
    publish_in_flight: Arc<AtomicBool>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(DisplayRecord::default())),
            publish_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deep-merges a partial update into the cumulative record.
    pub async fn merge(&self, update: DisplayRecord) {
        let mut record = self.record.lock().await;
        record.merge_from(update);
    }

    /// Copy of the current cumulative record.
    pub async fn snapshot(&self) -> DisplayRecord {
        self.record.lock().await.clone()
    }

    /// Attempts the idle → updating transition. Returns false when a
    /// publish is already in flight, in which case the caller must drop
    /// its trigger rather than queue it.
    pub fn begin_publish(&self) -> bool {
        self.publish_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Updating → idle.
    pub fn end_publish(&self) {
        self.publish_in_flight.store(false, Ordering::Release);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
