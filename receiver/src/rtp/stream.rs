use crate::rtp::format::Format;
use crate::rtp::track::{CryptoData, SampleFlags, TrackKind, TrackOutput, TrackRegistry};
use bytes::{Bytes, BytesMut};
use tokio::sync::{broadcast, watch};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackFormat {
    pub track_id: u32,
    pub kind: TrackKind,
    pub format: Format,
}

#[derive(Clone, Debug)]
pub struct Sample {
    pub track_id: u32,
    pub time_us: i64,
    pub flags: SampleFlags,
    pub data: Bytes,
}

/// In-process fan-out of the samples produced by the readers.
#[derive(Clone, Debug)]
pub struct SampleStream {
    format_tx: watch::Sender<Option<TrackFormat>>,
    sample_tx: broadcast::Sender<Sample>,
}

pub struct SampleStreamSubscription {
    pub format_rx: watch::Receiver<Option<TrackFormat>>,
    pub sample_rx: broadcast::Receiver<Sample>,
}

impl SampleStream {
    pub fn new() -> Self {
        let (format_tx, _format_rx) = watch::channel(None);
        let (sample_tx, _sample_rx) = broadcast::channel(SAMPLE_BACKLOG);
        Self {
            format_tx,
            sample_tx,
        }
    }

    pub fn subscribe(&self) -> SampleStreamSubscription {
        SampleStreamSubscription {
            format_rx: self.format_tx.subscribe(),
            sample_rx: self.sample_tx.subscribe(),
        }
    }

    fn update_format(&self, format: TrackFormat) {
        self.format_tx.send_replace(Some(format));
    }

    fn send_sample(&self, sample: Sample) {
        let _ = self.sample_tx.send(sample);
    }
}

impl TrackRegistry for SampleStream {
    type Output = StreamTrackOutput;

    fn track(&mut self, id: u32, kind: TrackKind) -> StreamTrackOutput {
        StreamTrackOutput {
            track_id: id,
            kind,
            stream: self.clone(),
            pending: Vec::new(),
        }
    }
}

/// Collects appended chunks until the sample metadata arrives.
#[derive(Debug)]
pub struct StreamTrackOutput {
    track_id: u32,
    kind: TrackKind,
    stream: SampleStream,
    pending: Vec<Bytes>,
}

impl StreamTrackOutput {
    fn take_pending(&mut self) -> Bytes {
        let data = match self.pending.as_slice() {
            [single] => single.clone(),
            chunks => {
                let total = chunks.iter().map(Bytes::len).sum();
                let mut joined = BytesMut::with_capacity(total);
                for chunk in chunks {
                    joined.extend_from_slice(chunk);
                }
                joined.freeze()
            }
        };
        self.pending.clear();
        data
    }
}

impl TrackOutput for StreamTrackOutput {
    fn format(&mut self, format: &Format) {
        self.stream.update_format(TrackFormat {
            track_id: self.track_id,
            kind: self.kind,
            format: format.clone(),
        });
    }

    fn sample_data(&mut self, data: Bytes) {
        self.pending.push(data);
    }

    fn sample_metadata(
        &mut self,
        time_us: i64,
        flags: SampleFlags,
        size: usize,
        offset: usize,
        _crypto_data: Option<&CryptoData>,
    ) {
        let pending = self.take_pending();
        let end = pending.len().saturating_sub(offset);
        let start = end.saturating_sub(size);
        self.stream.send_sample(Sample {
            track_id: self.track_id,
            time_us,
            flags,
            data: pending.slice(start..end),
        });
    }
}

const SAMPLE_BACKLOG: usize = 256;
