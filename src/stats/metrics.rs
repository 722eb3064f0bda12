//! Statistics for a relay

use std::time::Duration;

/// Point-in-time snapshot of relay counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Currently connected clients
    pub clients: usize,
    /// Highest number of simultaneous clients
    pub max_clients: usize,
    /// Chunks accepted from the producer
    pub chunks_written: u64,
    /// Bytes accepted from the producer
    pub bytes_written: u64,
    /// Bytes pushed to clients, summed over all clients
    pub bytes_sent: u64,
    /// Time since the relay was created
    pub uptime: Duration,
}

impl RelayStats {
    /// Producer bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_written * 8) / secs
        } else {
            0
        }
    }

    /// Mean chunk size in bytes
    pub fn average_chunk_size(&self) -> u64 {
        if self.chunks_written > 0 {
            self.bytes_written / self.chunks_written
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_default() {
        let stats = RelayStats::default();
        assert_eq!(stats.clients, 0);
        assert_eq!(stats.bytes_written, 0);
        assert_eq!(stats.bitrate(), 0);
        assert_eq!(stats.average_chunk_size(), 0);
    }

    #[test]
    fn test_relay_stats_bitrate() {
        let stats = RelayStats {
            bytes_written: 1_000_000,
            uptime: Duration::from_secs(10),
            ..Default::default()
        };

        // 1,000,000 bytes * 8 bits / 10 seconds = 800,000 bps
        assert_eq!(stats.bitrate(), 800_000);
    }

    #[test]
    fn test_relay_stats_bitrate_zero_uptime() {
        let stats = RelayStats {
            bytes_written: 1_000_000,
            uptime: Duration::from_millis(500),
            ..Default::default()
        };

        assert_eq!(stats.bitrate(), 0);
    }

    #[test]
    fn test_relay_stats_average_chunk_size() {
        let stats = RelayStats {
            chunks_written: 4,
            bytes_written: 64 * 1024,
            ..Default::default()
        };

        assert_eq!(stats.average_chunk_size(), 16 * 1024);
    }
}
