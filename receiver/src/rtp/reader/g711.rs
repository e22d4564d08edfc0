//! G.711 audio, A-law and mu-law (RFC 3551 section 4.5.14).
//!
//! Every G.711 frame decodes on its own, so each RTP payload becomes exactly one
//! key-frame sample. The packet-framed G.711.0 sub-format is not handled.

use super::{RtpPayloadReader, WholePacketReader};
use crate::rtp::format::PayloadFormat;
use crate::rtp::track::{AudioTrack, TrackOutput, TrackRegistry};
use bytes::Bytes;

#[derive(Debug)]
pub struct G711Reader {
    core: WholePacketReader,
}

impl G711Reader {
    pub fn new(payload_format: PayloadFormat) -> Self {
        Self {
            core: WholePacketReader::new(payload_format),
        }
    }
}

impl RtpPayloadReader for G711Reader {
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
        _sequence_number: u16,
        _rtp_marker: bool,
    ) {
        self.core.consume(track, payload, timestamp);
    }

    fn dropped_packets(&self) -> u64 {
        self.core.dropped_packets
    }
}
