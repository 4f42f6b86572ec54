//! Handshake status
//!
//! Result of asking the query tool when a tunnel last completed a
//! handshake. Callers that need the legacy integer codes use
//! [`HandshakeStatus::sentinel`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStatus {
    /// Tunnel is not in the running set
    NotActive,
    /// Query could not be run, exited nonzero or printed nothing
    QueryFailed,
    /// A handshake field was not an integer
    ParseFailed,
    /// Output contained no peer line
    NoPeer,
    /// Peers exist but none has completed a handshake
    NoHandshakeYet,
    /// Most recent handshake, seconds since the Unix epoch
    HandshakeAt(i64),
}

impl HandshakeStatus {
    /// Parse `<tool> show '<name>' latest-handshakes` output
    /// (`<public key>\t<epoch seconds>` per peer), keeping the most recent
    pub fn parse_latest_handshakes<I>(lines: I) -> HandshakeStatus
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut latest: Option<i64> = None;
        for line in lines {
            let mut fields = line.as_ref().split_whitespace();
            let (Some(_peer), Some(epoch), None) = (fields.next(), fields.next(), fields.next()) else {
                continue;
            };
            let Ok(epoch) = epoch.parse::<i64>() else {
                return HandshakeStatus::ParseFailed;
            };
            latest = Some(latest.map_or(epoch, |l| l.max(epoch)));
        }

        match latest {
            None => HandshakeStatus::NoPeer,
            Some(0) => HandshakeStatus::NoHandshakeYet,
            Some(epoch) => HandshakeStatus::HandshakeAt(epoch),
        }
    }

    /// Integer encoding: -3 not active, -2 query or parse failure, -1 no
    /// peer, 0 no handshake yet, otherwise the epoch
    pub fn sentinel(&self) -> i64 {
        match self {
            HandshakeStatus::NotActive => -3,
            HandshakeStatus::QueryFailed | HandshakeStatus::ParseFailed => -2,
            HandshakeStatus::NoPeer => -1,
            HandshakeStatus::NoHandshakeYet => 0,
            HandshakeStatus::HandshakeAt(epoch) => *epoch,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, HandshakeStatus::HandshakeAt(_))
    }
}

impl fmt::Display for HandshakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeStatus::NotActive => f.write_str("not active"),
            HandshakeStatus::QueryFailed => f.write_str("query failed"),
            HandshakeStatus::ParseFailed => f.write_str("unparseable output"),
            HandshakeStatus::NoPeer => f.write_str("no peer"),
            HandshakeStatus::NoHandshakeYet => f.write_str("no handshake yet"),
            HandshakeStatus::HandshakeAt(epoch) => write!(f, "handshake at {epoch}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_mapping() {
        assert_eq!(HandshakeStatus::NotActive.sentinel(), -3);
        assert_eq!(HandshakeStatus::QueryFailed.sentinel(), -2);
        assert_eq!(HandshakeStatus::ParseFailed.sentinel(), -2);
        assert_eq!(HandshakeStatus::NoPeer.sentinel(), -1);
        assert_eq!(HandshakeStatus::NoHandshakeYet.sentinel(), 0);
        assert_eq!(HandshakeStatus::HandshakeAt(1_700_000_000).sentinel(), 1_700_000_000);
    }

    #[test]
    fn test_most_recent_peer_wins() {
        let status = HandshakeStatus::parse_latest_handshakes([
            "3p7bfXt9wbTTW2HC7OQ1Nz+DQ8hbeGdNrfx+FG+IK08=\t1700000000",
            "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=\t1700000500",
            "",
        ]);
        assert_eq!(status, HandshakeStatus::HandshakeAt(1_700_000_500));
        assert!(status.is_connected());
    }

    #[test]
    fn test_no_handshake_and_no_peer() {
        assert_eq!(
            HandshakeStatus::parse_latest_handshakes(["peer\t0"]),
            HandshakeStatus::NoHandshakeYet
        );
        assert_eq!(
            HandshakeStatus::parse_latest_handshakes(["interface-only-line"]),
            HandshakeStatus::NoPeer
        );
    }

    #[test]
    fn test_non_integer_handshake() {
        assert_eq!(
            HandshakeStatus::parse_latest_handshakes(["peer\tyesterday"]),
            HandshakeStatus::ParseFailed
        );
    }
}
