use crate::rtp::format::Format;
use bytes::Bytes;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SampleFlags(u32);

impl SampleFlags {
    /// The sample decodes without reference to any other sample.
    pub const KEY_FRAME: Self = Self(1);

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Per-sample decryption parameters. No codec read here carries any, so the
/// type has no values and `sample_metadata` always receives `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoData {}

/// Append-only sink for one track.
pub trait TrackOutput {
    fn format(&mut self, format: &Format);

    /// Appends bytes to the sample currently being written.
    fn sample_data(&mut self, data: Bytes);

    /// Finishes the sample made of the last `size` bytes appended, minus `offset`.
    fn sample_metadata(
        &mut self,
        time_us: i64,
        flags: SampleFlags,
        size: usize,
        offset: usize,
        crypto_data: Option<&CryptoData>,
    );
}

/// Hands out one output per registered track.
pub trait TrackRegistry {
    type Output: TrackOutput;

    fn track(&mut self, id: u32, kind: TrackKind) -> Self::Output;
}

/// An output whose format has already been written. Only readers create these.
#[derive(Debug)]
pub struct AudioTrack<O> {
    id: u32,
    output: O,
}

impl<O: TrackOutput> AudioTrack<O> {
    pub(crate) fn register<R>(registry: &mut R, id: u32, format: &Format) -> Self
    where
        R: TrackRegistry<Output = O>,
    {
        let mut output = registry.track(id, TrackKind::Audio);
        output.format(format);
        Self { id, output }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub(crate) fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}
