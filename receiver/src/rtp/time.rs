/// Extends wrapping 32-bit RTP timestamps onto a signed 64-bit timeline.
///
/// Steps of less than 2^31 ticks in either direction are taken as the real
/// distance, so forward wraps keep counting up and late packets land slightly
/// behind their predecessor instead of ~2^32 ticks ahead.
#[derive(Debug, Default)]
pub struct RtpTimestampUnwrapper {
    last: Option<(u32, i64)>,
}

impl RtpTimestampUnwrapper {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn unwrap(&mut self, rtp_timestamp: u32) -> i64 {
        let extended = match self.last {
            None => rtp_timestamp as i64,
            Some((last_raw, last_extended)) => {
                let step = rtp_timestamp.wrapping_sub(last_raw) as i32;
                last_extended + step as i64
            }
        };
        self.last = Some((rtp_timestamp, extended));
        extended
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
