//! MQTT broker session over the PPP link.
//!
//! The ESP-IDF client runs its own task and reconnects on its own; a
//! polling thread drains the connection events and mirrors the session
//! state into an atomic.  The session is persistent (no clean session) so
//! QoS 1 messages queued across a reconnect are not dropped by the broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embedded_svc::mqtt::client::{EventPayload, QoS as MqttQoS};
use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};
use log::{info, warn};

use crate::adapters::device_id::DeviceIdString;
use crate::app::ports::{BrokerPort, QoS};
use crate::config::{Credential, Host, SystemConfig};
use crate::error::PublishError;

/// Polls of the session flag while a connect is pending.
const CONNECT_POLLS: u32 = 50;
const CONNECT_POLL_MS: u64 = 100;

pub struct MqttBroker {
    host: Host,
    port: u16,
    user: Credential,
    password: Credential,
    client_id: DeviceIdString,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
}

impl MqttBroker {
    pub fn new(cfg: &SystemConfig, client_id: DeviceIdString) -> Self {
        Self {
            host: cfg.broker_host.clone(),
            port: cfg.broker_port,
            user: cfg.broker_user.clone(),
            password: cfg.broker_password.clone(),
            client_id,
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start_client(&mut self) -> Result<(), PublishError> {
        let url = format!("mqtt://{}:{}", self.host, self.port);
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            username: (!self.user.is_empty()).then_some(self.user.as_str()),
            password: (!self.password.is_empty()).then_some(self.password.as_str()),
            disable_clean_session: true,
            keep_alive_interval: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let (client, mut conn) = EspMqttClient::new(&url, &conf).map_err(|e| {
            warn!("MQTT client start failed: {:?}", e);
            PublishError::BrokerUnreachable
        })?;

        let connected = Arc::clone(&self.connected);
        thread::Builder::new()
            .name("mqtt-poll".into())
            .stack_size(6144)
            .spawn(move || {
                while let Ok(event) = conn.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => {
                            info!("MQTT session up");
                            connected.store(true, Ordering::Release);
                        }
                        EventPayload::Disconnected => {
                            warn!("MQTT session lost");
                            connected.store(false, Ordering::Release);
                        }
                        _ => {}
                    }
                }
                connected.store(false, Ordering::Release);
            })
            .map_err(|_| PublishError::BrokerUnreachable)?;

        info!("MQTT client started for {}", url);
        self.client = Some(client);
        Ok(())
    }
}

impl BrokerPort for MqttBroker {
    fn connect(&mut self) -> Result<(), PublishError> {
        if self.client.is_none() {
            self.start_client()?;
        }
        for _ in 0..CONNECT_POLLS {
            if self.connected.load(Ordering::Acquire) {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(CONNECT_POLL_MS));
        }
        Err(PublishError::BrokerUnreachable)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(PublishError::BrokerUnreachable);
        }
        let client = self.client.as_mut().ok_or(PublishError::BrokerUnreachable)?;
        let qos = match qos {
            QoS::AtMostOnce => MqttQoS::AtMostOnce,
            QoS::AtLeastOnce => MqttQoS::AtLeastOnce,
        };
        client
            .publish(topic, qos, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT publish to {} failed: {:?}", topic, e);
                PublishError::Rejected
            })
    }
}
