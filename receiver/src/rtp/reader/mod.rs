//! RTP payload readers: turn packets of one negotiated payload type into
//! timestamped samples on a track output.

pub mod clock;
pub mod g711;
pub mod pcm;

use crate::rtp::format::{AudioEncoding, PayloadFormat};
use crate::rtp::track::{AudioTrack, SampleFlags, TrackOutput, TrackRegistry};
use bytes::Bytes;

pub use clock::SampleClock;
pub use g711::G711Reader;
pub use pcm::PcmReader;

/// Lifecycle shared by every reader. The session driver calls `create_tracks`
/// once, anchors with `seek` or `on_receiving_first_packet`, then feeds packets
/// in arrival order through `consume`.
pub trait RtpPayloadReader {
    fn create_tracks<R: TrackRegistry>(
        &self,
        registry: &mut R,
        track_id: u32,
    ) -> AudioTrack<R::Output>;

    fn seek(&mut self, next_rtp_timestamp: i64, time_us: i64);

    fn on_receiving_first_packet(&mut self, timestamp: i64, sequence_number: u16);

    fn consume<O: TrackOutput>(
        &mut self,
        track: &mut AudioTrack<O>,
        payload: Bytes,
        timestamp: i64,
        sequence_number: u16,
        rtp_marker: bool,
    );

    /// Packets discarded because they fell before the epoch origin.
    fn dropped_packets(&self) -> u64;
}

/// State shared by readers whose packets each carry exactly one
/// independently decodable sample.
#[derive(Debug)]
struct WholePacketReader {
    payload_format: PayloadFormat,
    clock: SampleClock,
    dropped_packets: u64,
}

impl WholePacketReader {
    fn new(payload_format: PayloadFormat) -> Self {
        Self {
            payload_format,
            clock: SampleClock::new(),
            dropped_packets: 0,
        }
    }

    fn create_tracks<R: TrackRegistry>(
        &self,
        registry: &mut R,
        track_id: u32,
    ) -> AudioTrack<R::Output> {
        AudioTrack::register(registry, track_id, &self.payload_format.format)
    }

    /// Writes the payload as one key-frame sample, or drops it when its sample
    /// time falls before the epoch origin.
    fn consume<O: TrackOutput>(
        &mut self,
        track: &mut AudioTrack<O>,
        payload: Bytes,
        timestamp: i64,
    ) {
        let sample_time_us = self
            .clock
            .sample_time_us(timestamp, self.payload_format.clock_rate);
        if sample_time_us < 0 {
            tracing::trace!(timestamp, sample_time_us, "rtp packet before epoch origin; dropping");
            self.dropped_packets += 1;
            return;
        }

        let size = payload.len();
        let output = track.output_mut();
        output.sample_data(payload);
        output.sample_metadata(sample_time_us, SampleFlags::KEY_FRAME, size, 0, None);
    }
}

/// The readers this receiver supports, picked once per session.
#[derive(Debug)]
pub enum PayloadReader {
    G711(G711Reader),
    Pcm(PcmReader),
}

impl PayloadReader {
    pub fn for_format(payload_format: PayloadFormat) -> Self {
        match payload_format.encoding {
            AudioEncoding::Pcma | AudioEncoding::Pcmu => {
                Self::G711(G711Reader::new(payload_format))
            }
            AudioEncoding::L16 => Self::Pcm(PcmReader::new(payload_format)),
        }
    }
}

impl RtpPayloadReader for PayloadReader {
    fn create_tracks<R: TrackRegistry>(
        &self,
        registry: &mut R,
        track_id: u32,
    ) -> AudioTrack<R::Output> {
        match self {
            Self::G711(reader) => reader.create_tracks(registry, track_id),
            Self::Pcm(reader) => reader.create_tracks(registry, track_id),
        }
    }

    fn seek(&mut self, next_rtp_timestamp: i64, time_us: i64) {
        match self {
            Self::G711(reader) => reader.seek(next_rtp_timestamp, time_us),
            Self::Pcm(reader) => reader.seek(next_rtp_timestamp, time_us),
        }
    }

    fn on_receiving_first_packet(&mut self, timestamp: i64, sequence_number: u16) {
        match self {
            Self::G711(reader) => reader.on_receiving_first_packet(timestamp, sequence_number),
            Self::Pcm(reader) => reader.on_receiving_first_packet(timestamp, sequence_number),
        }
    }

    fn consume<O: TrackOutput>(
        &mut self,
        track: &mut AudioTrack<O>,
        payload: Bytes,
        timestamp: i64,
        sequence_number: u16,
        rtp_marker: bool,
    ) {
        match self {
            Self::G711(reader) => {
                reader.consume(track, payload, timestamp, sequence_number, rtp_marker)
            }
            Self::Pcm(reader) => {
                reader.consume(track, payload, timestamp, sequence_number, rtp_marker)
            }
        }
    }

    fn dropped_packets(&self) -> u64 {
        match self {
            Self::G711(reader) => reader.dropped_packets(),
            Self::Pcm(reader) => reader.dropped_packets(),
        }
    }
}
