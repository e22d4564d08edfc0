use std::num::NonZeroU32;

pub const MICROS_PER_SECOND: i128 = 1_000_000;

/// Converts an RTP timestamp into an absolute sample time in microseconds.
///
/// Only the difference `rtp_timestamp - first_received_rtp_timestamp` is scaled, so
/// callers may pass timestamps on any consistent, already unwrapped 64-bit timeline.
/// The difference and the multiply by 1_000_000 are carried in `i128`, which cannot
/// overflow for any pair of `i64` inputs. The division truncates toward zero. The
/// final value saturates at the `i64` bounds, i.e. after roughly 292,000 years of
/// presentation time, whatever the clock rate.
pub fn to_sample_time_us(
    start_time_offset_us: i64,
    rtp_timestamp: i64,
    first_received_rtp_timestamp: i64,
    clock_rate: NonZeroU32,
) -> i64 {
    let delta = rtp_timestamp as i128 - first_received_rtp_timestamp as i128;
    let scaled = delta * MICROS_PER_SECOND / clock_rate.get() as i128;
    let time_us = start_time_offset_us as i128 + scaled;
    time_us.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Timing anchor of the current epoch.
#[derive(Debug, Default)]
pub struct SampleClock {
    first_received_timestamp: Option<i64>,
    start_time_offset_us: i64,
}

impl SampleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new epoch: `next_rtp_timestamp` will map to `time_us`.
    pub fn seek(&mut self, next_rtp_timestamp: i64, time_us: i64) {
        self.first_received_timestamp = Some(next_rtp_timestamp);
        self.start_time_offset_us = time_us;
    }

    /// Re-anchors on a packet without touching the time offset.
    pub fn on_receiving_first_packet(&mut self, timestamp: i64) {
        self.first_received_timestamp = Some(timestamp);
    }

    pub fn sample_time_us(&mut self, timestamp: i64, clock_rate: NonZeroU32) -> i64 {
        let first = match self.first_received_timestamp {
            Some(first) => first,
            None => {
                debug_assert!(false, "rtp payload consumed before the clock was anchored");
                tracing::warn!(timestamp, "rtp clock not anchored; anchoring on packet");
                self.first_received_timestamp = Some(timestamp);
                timestamp
            }
        };
        to_sample_time_us(self.start_time_offset_us, timestamp, first, clock_rate)
    }
}
