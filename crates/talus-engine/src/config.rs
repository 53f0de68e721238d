use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Every tunable named in the core spec, with defaults matching its
/// stated values. Constructed once and handed to [`crate::GroupEngine`];
/// this is not a file-loading subsystem (no daemon in scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grace period for a link stuck mid-handshake before it is reclaimed.
    pub unconfirmed_peer_timeout: Duration,
    /// Ping timeout for an already-confirmed peer (§4.2, ~72s).
    pub confirmed_peer_timeout: Duration,
    /// First lossless retransmit backoff.
    pub lossless_initial_backoff: Duration,
    /// Backoff ceiling for lossless retransmits.
    pub lossless_max_backoff: Duration,
    /// Attempts before a lossless send gives up and tears the link down.
    pub lossless_max_attempts: u32,
    /// How often a confirmed link sends an unsolicited `PING`.
    pub ping_interval: Duration,
    /// Largest application payload accepted by `send_message` /
    /// `send_private` / `send_custom`, before codec framing overhead.
    pub max_message_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unconfirmed_peer_timeout: Duration::from_secs(10),
            confirmed_peer_timeout: Duration::from_secs(72),
            lossless_initial_backoff: Duration::from_millis(200),
            lossless_max_backoff: Duration::from_secs(5),
            lossless_max_attempts: 8,
            ping_interval: Duration::from_secs(20),
            max_message_size: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_spec_values() {
        let config = EngineConfig::default();
        assert_eq!(config.confirmed_peer_timeout, Duration::from_secs(72));
        assert_eq!(config.lossless_max_attempts, 8);
    }

    #[test]
    fn test_roundtrips_through_serde() {
        let config = EngineConfig::default();
        let mut bytes = Vec::new();
        ciborium::into_writer(&config, &mut bytes).expect("serialize");
        let restored: EngineConfig = ciborium::from_reader(bytes.as_slice()).expect("deserialize");
        assert_eq!(restored.max_message_size, config.max_message_size);
    }
}
