//! Linear PCM (L16, RFC 3551 section 4.5.11).

use super::{RtpPayloadReader, WholePacketReader};
use crate::rtp::format::PayloadFormat;
use crate::rtp::track::{AudioTrack, TrackOutput, TrackRegistry};
use bytes::Bytes;

#[derive(Debug)]
pub struct PcmReader {
    core: WholePacketReader,
}

impl PcmReader {
    pub fn new(payload_format: PayloadFormat) -> Self {
        Self {
            core: WholePacketReader::new(payload_format),
        }
    }

    fn frame_size(&self) -> usize {
        2 * self.core.payload_format.channel_count as usize
    }
}

impl RtpPayloadReader for PcmReader {
    fn create_tracks<R: TrackRegistry>(
        &self,
        registry: &mut R,
        track_id: u32,
    ) -> AudioTrack<R::Output> {
        self.core.create_tracks(registry, track_id)
    }

    fn seek(&mut self, next_rtp_timestamp: i64, time_us: i64) {
        self.core.clock.seek(next_rtp_timestamp, time_us);
    }

    fn on_receiving_first_packet(&mut self, timestamp: i64, _sequence_number: u16) {
        self.core.clock.on_receiving_first_packet(timestamp);
    }

    fn consume<O: TrackOutput>(
        &mut self,
        track: &mut AudioTrack<O>,
        payload: Bytes,
        timestamp: i64,
        sequence_number: u16,
        _rtp_marker: bool,
    ) {
        if payload.len() % self.frame_size() != 0 {
            tracing::debug!(
                bytes = payload.len(),
                sequence = sequence_number,
                "l16 payload is not a whole number of frames"
            );
        }
        self.core.consume(track, payload, timestamp);
    }

    fn dropped_packets(&self) -> u64 {
        self.core.dropped_packets
    }
}
