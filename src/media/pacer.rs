//! Chunk pacing
//!
//! Files are read far faster than they play. The pacer holds the producer to
//! the track's byte rate so that the relay's current chunk advances in real
//! time, which is what lets late joiners hear "now" instead of the past.

use std::time::Duration;

use tokio::time::Instant;

/// Headroom over the nominal rate so clients never starve
const RATE_HEADROOM: f64 = 1.05;

/// Chunks that may be written back to back after an idle period
const BURST: f64 = 2.0;

/// Token bucket limiting how many chunks per second reach the relay
#[derive(Debug)]
pub struct ChunkPacer {
    /// Chunks per second
    rate: f64,
    tokens: f64,
    last: Instant,
}

impl ChunkPacer {
    /// Pacer for `chunk_size`-byte chunks of a stream encoded at `bitrate` bits/s
    pub fn new(chunk_size: usize, bitrate: u32) -> Self {
        let byte_rate = f64::from(bitrate.max(8) / 8);
        let chunk_size = chunk_size.max(1) as f64;

        Self {
            rate: RATE_HEADROOM * byte_rate / chunk_size,
            tokens: BURST,
            last: Instant::now(),
        }
    }

    /// Chunks allowed per second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Steady-state interval between two chunks
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate)
    }

    /// Wait until the next chunk may be written
    pub async fn wait(&mut self) {
        self.refill();

        if self.tokens < 1.0 {
            let deficit = 1.0 - self.tokens;
            tokio::time::sleep(Duration::from_secs_f64(deficit / self.rate)).await;
            self.refill();
        }

        self.tokens = (self.tokens - 1.0).max(0.0);
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(BURST);
        self.last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_for_128kbps() {
        // 128 kbps = 16000 B/s; with 16 KiB chunks and 5% headroom
        let pacer = ChunkPacer::new(16 * 1024, 128_000);
        let expected = 1.05 * 16_000.0 / 16_384.0;

        assert!((pacer.rate() - expected).abs() < 1e-9);
        assert_eq!(pacer.period().as_millis(), 975);
    }

    #[test]
    fn test_degenerate_inputs_are_clamped() {
        let pacer = ChunkPacer::new(0, 0);
        assert!(pacer.rate() > 0.0);
        assert!(pacer.rate().is_finite());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_steady_rate() {
        let mut pacer = ChunkPacer::new(1000, 80_000); // 10 KB/s -> 10.5 chunks/s
        let start = Instant::now();

        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(1));

        pacer.wait().await;
        let third = start.elapsed();
        assert!(third >= Duration::from_millis(90), "{third:?}");
        assert!(third <= Duration::from_millis(100), "{third:?}");

        for _ in 0..10 {
            pacer.wait().await;
        }
        let total = start.elapsed();
        assert!(total >= Duration::from_millis(1040), "{total:?}");
        assert!(total <= Duration::from_millis(1070), "{total:?}");
    }
}
