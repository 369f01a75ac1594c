//! Retrying MQTT publication of a telemetry frame.
//!
//! Each channel gets its own budget of attempts.  A failed publish
//! re-establishes the broker session (and, if the link dropped, the
//! cellular link) before the same channel is retried.  Attempts are spaced
//! by a fixed backoff.  A channel that runs out of attempts fails the frame
//! but does not stop the remaining channels from being sent.

use log::{debug, info, warn};

use super::{Channel, TelemetryFrame};
use crate::app::ports::{BrokerPort, NetworkPort, QoS, SystemPort};
use crate::config::SystemConfig;
use crate::error::PublishError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishPolicy {
    /// Attempts per channel and per broker connect.
    pub attempts: u32,
    pub backoff_ms: u32,
}

impl PublishPolicy {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            attempts: cfg.retry_count,
            backoff_ms: cfg.publish_backoff_ms,
        }
    }
}

pub struct TelemetryPublisher {
    policy: PublishPolicy,
}

impl TelemetryPublisher {
    pub fn new(policy: PublishPolicy) -> Self {
        Self { policy }
    }

    /// Make sure the link is up and the broker session is open.
    ///
    /// A dead link is brought up first (and power-cycled if that fails);
    /// the broker connect is then retried with the usual backoff.
    pub fn ensure_broker<N, B, Y>(
        &self,
        net: &mut N,
        broker: &mut B,
        system: &mut Y,
    ) -> Result<(), PublishError>
    where
        N: NetworkPort,
        B: BrokerPort,
        Y: SystemPort,
    {
        system.feed_watchdog();
        if !net.is_online() {
            info!("Link is down, bringing it up before connecting to the broker");
            if let Err(e) = net.bring_up() {
                warn!("Link bring-up failed: {}", e);
                net.recover();
                return Err(PublishError::Offline);
            }
        }

        for attempt in 1..=self.policy.attempts {
            match broker.connect() {
                Ok(()) => {
                    debug!("Broker connected (attempt {})", attempt);
                    return Ok(());
                }
                Err(e) => warn!(
                    "Broker connect {}/{} failed: {}",
                    attempt, self.policy.attempts, e
                ),
            }
            system.sleep_ms(self.policy.backoff_ms);
        }
        Err(PublishError::BrokerUnreachable)
    }

    /// Publish every channel of `frame`.  `Ok` only if all of them went out.
    pub fn publish_frame<N, B, Y>(
        &self,
        net: &mut N,
        broker: &mut B,
        system: &mut Y,
        frame: &TelemetryFrame,
    ) -> Result<(), PublishError>
    where
        N: NetworkPort,
        B: BrokerPort,
        Y: SystemPort,
    {
        self.ensure_broker(net, broker, system)?;
        let mut session_up = true;
        let mut failed = 0u32;

        for (channel, payload) in frame.entries() {
            if self.publish_channel(net, broker, system, channel, payload, &mut session_up) {
                continue;
            }
            warn!("Gave up publishing {}", channel.name());
            failed += 1;
        }

        if failed == 0 {
            info!("Published {}", frame);
            Ok(())
        } else {
            warn!("{} of {} channels not published", failed, Channel::ALL.len());
            Err(PublishError::Rejected)
        }
    }

    fn publish_channel<N, B, Y>(
        &self,
        net: &mut N,
        broker: &mut B,
        system: &mut Y,
        channel: Channel,
        payload: &str,
        session_up: &mut bool,
    ) -> bool
    where
        N: NetworkPort,
        B: BrokerPort,
        Y: SystemPort,
    {
        let topic = channel.topic();
        for attempt in 1..=self.policy.attempts {
            if *session_up {
                match broker.publish(&topic, payload.as_bytes(), QoS::AtLeastOnce) {
                    Ok(()) => return true,
                    Err(e) => {
                        debug!("Publish {} attempt {} failed: {}", topic.as_str(), attempt, e);
                        *session_up = self.ensure_broker(net, broker, system).is_ok();
                    }
                }
            } else {
                *session_up = self.ensure_broker(net, broker, system).is_ok();
            }
            system.sleep_ms(self.policy.backoff_ms);
        }
        false
    }
}
