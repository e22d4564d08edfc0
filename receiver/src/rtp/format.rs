use serde::Serialize;
use std::num::NonZeroU32;

/// Audio encodings this receiver knows how to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// G.711 A-law.
    Pcma,
    /// G.711 mu-law.
    Pcmu,
    /// 16-bit big-endian linear PCM.
    L16,
}

impl AudioEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "PCMA" => Some(Self::Pcma),
            "PCMU" => Some(Self::Pcmu),
            "L16" => Some(Self::L16),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pcma => "PCMA",
            Self::Pcmu => "PCMU",
            Self::L16 => "L16",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PcmEncoding {
    Pcm16BitBigEndian,
}

/// Downstream format handed to the sink, untouched by the readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub sample_mime_type: &'static str,
    pub sample_rate: u32,
    pub channel_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcm_encoding: Option<PcmEncoding>,
}

pub const MIME_AUDIO_ALAW: &str = "audio/g711-alaw";
pub const MIME_AUDIO_MLAW: &str = "audio/g711-mlaw";
pub const MIME_AUDIO_RAW: &str = "audio/raw";

/// Negotiated description of one RTP payload type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFormat {
    pub payload_type: u8,
    pub encoding: AudioEncoding,
    pub clock_rate: NonZeroU32,
    pub channel_count: u8,
    pub format: Format,
}

impl PayloadFormat {
    pub fn new(
        payload_type: u8,
        encoding: AudioEncoding,
        clock_rate: NonZeroU32,
        channel_count: u8,
    ) -> Self {
        let channel_count = channel_count.max(1);
        let format = match encoding {
            AudioEncoding::Pcma | AudioEncoding::Pcmu => Format {
                sample_mime_type: if encoding == AudioEncoding::Pcma {
                    MIME_AUDIO_ALAW
                } else {
                    MIME_AUDIO_MLAW
                },
                sample_rate: clock_rate.get(),
                channel_count,
                pcm_encoding: None,
            },
            AudioEncoding::L16 => Format {
                sample_mime_type: MIME_AUDIO_RAW,
                sample_rate: clock_rate.get(),
                channel_count,
                pcm_encoding: Some(PcmEncoding::Pcm16BitBigEndian),
            },
        };
        Self {
            payload_type,
            encoding,
            clock_rate,
            channel_count,
            format,
        }
    }

    /// RFC 3551 static audio payload types.
    pub fn from_static_payload_type(payload_type: u8) -> Option<Self> {
        let (encoding, clock_rate, channels) = match payload_type {
            0 => (AudioEncoding::Pcmu, 8_000, 1),
            8 => (AudioEncoding::Pcma, 8_000, 1),
            10 => (AudioEncoding::L16, 44_100, 2),
            11 => (AudioEncoding::L16, 44_100, 1),
            _ => return None,
        };
        let clock_rate = NonZeroU32::new(clock_rate)?;
        Some(Self::new(payload_type, encoding, clock_rate, channels))
    }
}
