//! Transfer Statistics
//!
//! Per-peer counters read from `<tool> show '<name>' dump`.

use awg_config::PublicKey;
use tracing::debug;

/// Number of tab-separated fields on a peer line of the dump output
const DUMP_PEER_FIELDS: usize = 8;

/// Counters for one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStats {
    pub public_key: PublicKey,
    /// Bytes received
    pub rx_bytes: u64,
    /// Bytes sent
    pub tx_bytes: u64,
    /// Last handshake, milliseconds since the Unix epoch (0 if none)
    pub latest_handshake_millis: i64,
}

/// Tunnel statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    peers: Vec<PeerStats>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the dump output.
    ///
    /// Peer lines carry public key, preshared key, endpoint, allowed IPs,
    /// latest handshake (seconds), rx, tx and keepalive. The interface line
    /// and anything malformed are skipped.
    pub fn parse_dump<I>(lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut stats = Self::new();
        for line in lines {
            let line = line.as_ref();
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != DUMP_PEER_FIELDS {
                continue;
            }

            let parsed = (
                PublicKey::from_base64(fields[0]),
                fields[5].parse::<u64>(),
                fields[6].parse::<u64>(),
                fields[4].parse::<i64>(),
            );
            match parsed {
                (Ok(key), Ok(rx), Ok(tx), Ok(handshake)) => {
                    stats.add(key, rx, tx, handshake.saturating_mul(1000));
                }
                _ => debug!("Skipping malformed dump line: {:?}", line),
            }
        }
        stats
    }

    pub fn add(&mut self, public_key: PublicKey, rx_bytes: u64, tx_bytes: u64, latest_handshake_millis: i64) {
        self.peers.push(PeerStats {
            public_key,
            rx_bytes,
            tx_bytes,
            latest_handshake_millis,
        });
    }

    pub fn peers(&self) -> &[PeerStats] {
        &self.peers
    }

    pub fn peer(&self, public_key: &PublicKey) -> Option<&PeerStats> {
        self.peers.iter().find(|p| &p.public_key == public_key)
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn total_rx(&self) -> u64 {
        self.peers.iter().map(|p| p.rx_bytes).sum()
    }

    pub fn total_tx(&self) -> u64 {
        self.peers.iter().map(|p| p.tx_bytes).sum()
    }

    /// Format as human-readable string
    pub fn format(&self) -> String {
        format!(
            "RX: {:.2}MB, TX: {:.2}MB, peers: {}",
            self.total_rx() as f64 / (1024.0 * 1024.0),
            self.total_tx() as f64 / (1024.0 * 1024.0),
            self.peers.len()
        )
    }
}
