use crate::meteo_logic::config::Config;
use crate::meteo_logic::encoder;
use crate::meteo_logic::state::AppState;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Timelike;
use rumqttc::{AsyncClient, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};

/// Outbound seam: anything that can push a finished display code to the
/// device. Production uses MQTT; tests record in memory.
#[async_trait]
pub trait CodePublisher: Send + Sync {
    async fn publish(&self, code: &str) -> Result<()>;
}

/// Publishes the raw 47-character line to the device topic, unframed.
pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, topic: String) -> Self {
        Self { client, topic }
    }
}

#[async_trait]
impl CodePublisher for MqttPublisher {
    async fn publish(&self, code: &str) -> Result<()> {
        self.client
            .publish(self.topic.clone(), QoS::AtLeastOnce, false, code.to_owned())
            .await?;
        Ok(())
    }
}

/// Scheduler loop: republishes the merged view once per configured
/// interval. The first tick fires immediately at startup so the display
/// shows the clock before any data arrives.
pub async fn run(
    config: Config,
    state: AppState,
    publisher: Arc<dyn CodePublisher>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut tick = interval(Duration::from_secs(config.publish_interval_seconds));
    // A tick that lands while a publish is still in flight is dropped, not
    // queued; burst catch-up would hammer the device with stale lines.
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Scheduler shutting down.");
                break;
            }
            _ = tick.tick() => {
                publish_snapshot(&state, publisher.as_ref()).await;
            }
        }
    }
}

/// One publish pass: snapshot the merged record, overlay the live clock,
/// encode, send. Single-flight: if a publish is already in flight the
/// trigger is dropped. Shared by scheduler ticks and ingest direct sends.
pub async fn publish_snapshot(state: &AppState, publisher: &dyn CodePublisher) {
    if !state.begin_publish() {
        log::debug!("Publish already in flight, dropping trigger.");
        return;
    }

    let mut record = state.snapshot().await;
    // Overlay, not merge: the clock columns always show wall-clock time,
    // whatever the bus last claimed.
    let now = chrono::Local::now();
    record.hours = Some(f64::from(now.hour()));
    record.minutes = Some(f64::from(now.minute()));

    let code = encoder::encode(&record);
    log::info!("Sending '{}'", code);
    if let Err(e) = publisher.publish(&code).await {
        log::error!("Failed to publish display code: {e:#}");
    }

    state.end_publish();
}
