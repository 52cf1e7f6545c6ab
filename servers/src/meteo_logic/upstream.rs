use crate::meteo_logic::config::Config;
use crate::meteo_logic::downstream::{self, CodePublisher};
use crate::meteo_logic::model::DisplayRecord;
use crate::meteo_logic::state::AppState;
use anyhow::{Context, Result, anyhow};
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use url::Url;

/// Builds the MQTT client from the configured broker URL. `mqtts://` gets
/// TLS against the configured CA certificate; embedded URL credentials are
/// passed through.
pub fn connect(config: &Config) -> Result<(AsyncClient, EventLoop)> {
    let url = Url::parse(&config.mqtt_url)
        .with_context(|| format!("invalid broker URL '{}'", config.mqtt_url))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("broker URL '{}' has no host", config.mqtt_url))?;

    let tls = match url.scheme() {
        "mqtts" => true,
        "mqtt" => false,
        other => return Err(anyhow!("unsupported broker URL scheme '{other}'")),
    };
    let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

    let mut options = MqttOptions::new(config.client_id.clone(), host, port);
    options.set_keep_alive(Duration::from_secs(30));

    if !url.username().is_empty() {
        options.set_credentials(url.username(), url.password().unwrap_or_default());
    }

    if tls {
        let ca = fs::read(&config.ca_certificate_path).with_context(|| {
            format!(
                "failed to read CA certificate {}",
                config.ca_certificate_path.display()
            )
        })?;
        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: None,
        }));
    }

    Ok(AsyncClient::new(options, 10))
}

/// Ingestion loop: drives the MQTT event loop, subscribes on connect,
/// merges inbound updates and triggers a direct send for each. The event
/// loop reconnects by itself; errors only cost a pause before the next
/// poll.
pub async fn run(
    config: Config,
    state: AppState,
    publisher: Arc<dyn CodePublisher>,
    client: AsyncClient,
    mut eventloop: EventLoop,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Ingestion shutting down...");
                let _ = client.disconnect().await;
                return;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!("Connected to mqtt");
                    if let Err(e) = client
                        .subscribe(config.inbound_topic.clone(), QoS::AtLeastOnce)
                        .await
                    {
                        log::error!("Failed to subscribe to {}: {}", config.inbound_topic, e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    ingest(&config, &state, &publisher, &publish.topic, &publish.payload).await;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("MQTT error: {e}");
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

/// Handles one inbound message: topic filter, JSON parse, merge, direct
/// send. A malformed payload is logged and dropped with no state effect.
/// Merges happen inline so updates apply in arrival order; only the
/// publish is spawned off.
async fn ingest(
    config: &Config,
    state: &AppState,
    publisher: &Arc<dyn CodePublisher>,
    topic: &str,
    payload: &[u8],
) {
    if topic != config.inbound_topic {
        log::trace!("Ignoring message on unexpected topic {topic}");
        return;
    }

    match serde_json::from_slice::<DisplayRecord>(payload) {
        Ok(update) => {
            log::debug!("Merging update: {update:?}");
            state.merge(update).await;
            let state = state.clone();
            let publisher = Arc::clone(publisher);
            // The publish may block on the transport; run it off the
            // ingestion loop so the next message is not held up. The
            // single-flight guard drops it if one is already going out.
            tokio::spawn(async move {
                downstream::publish_snapshot(&state, publisher.as_ref()).await;
            });
        }
        Err(e) => log::error!("Error parsing data: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meteo_logic::downstream::CodePublisher;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config() -> Config {
        Config {
            mqtt_url: "mqtt://localhost".to_string(),
            ca_certificate_path: PathBuf::from("ca-cert.pem"),
            inbound_topic: "bus/services/meteo-display/data".to_string(),
            outbound_topic: "bus/devices/meteo-display/data".to_string(),
            client_id: "meteo-display-test".to_string(),
            publish_interval_seconds: 60,
            log_dir: PathBuf::from("./logs"),
            log_level: "info".to_string(),
        }
    }

    struct CountingPublisher {
        published: AtomicUsize,
    }

    #[async_trait]
    impl CodePublisher for CountingPublisher {
        async fn publish(&self, _code: &str) -> Result<()> {
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_publisher() -> Arc<CountingPublisher> {
        Arc::new(CountingPublisher {
            published: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn valid_payload_is_merged_and_sent() {
        let config = test_config();
        let state = AppState::new();
        let publisher = counting_publisher();
        let as_dyn: Arc<dyn CodePublisher> = publisher.clone();

        ingest(
            &config,
            &state,
            &as_dyn,
            &config.inbound_topic,
            br#"{"humidity": 40}"#,
        )
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(state.snapshot().await.humidity, Some(40.0));
        assert_eq!(publisher.published.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_payload_leaves_state_untouched() {
        let config = test_config();
        let state = AppState::new();
        let publisher = counting_publisher();
        let as_dyn: Arc<dyn CodePublisher> = publisher.clone();

        ingest(&config, &state, &as_dyn, &config.inbound_topic, b"not json").await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(state.snapshot().await, DisplayRecord::default());
        assert_eq!(publisher.published.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn foreign_topic_is_ignored() {
        let config = test_config();
        let state = AppState::new();
        let publisher = counting_publisher();
        let as_dyn: Arc<dyn CodePublisher> = publisher.clone();

        ingest(
            &config,
            &state,
            &as_dyn,
            "bus/services/other-device/data",
            br#"{"humidity": 40}"#,
        )
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(state.snapshot().await, DisplayRecord::default());
        assert_eq!(publisher.published.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn connect_rejects_a_urlless_broker() {
        let mut config = test_config();
        config.mqtt_url = "not a url".to_string();
        assert!(connect(&config).is_err());
    }
}
