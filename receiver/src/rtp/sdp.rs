use crate::rtp::format::{AudioEncoding, PayloadFormat};
use std::num::NonZeroU32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SdpInfo {
    pub payload_types: Vec<u8>,
    pub rtpmaps: Vec<RtpMap>,
}

impl SdpInfo {
    pub fn rtpmap(&self, payload_type: u8) -> Option<&RtpMap> {
        self.rtpmaps
            .iter()
            .find(|map| map.payload_type == payload_type)
    }

    /// Builds the payload format for `payload_type` from its rtpmap entry.
    pub fn payload_format(&self, payload_type: u8) -> Option<PayloadFormat> {
        let map = self.rtpmap(payload_type)?;
        let encoding = AudioEncoding::from_name(&map.encoding_name)?;
        let clock_rate = NonZeroU32::new(map.clock_rate)?;
        Some(PayloadFormat::new(
            payload_type,
            encoding,
            clock_rate,
            map.channels.unwrap_or(1),
        ))
    }
}

/// Reads the first `m=audio` section of a session description.
pub fn parse_sdp(body: &[u8]) -> Option<SdpInfo> {
    let text = String::from_utf8_lossy(body);
    let mut info = SdpInfo::default();
    let mut in_audio = false;
    let mut seen_audio = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("m=") {
            if seen_audio {
                break;
            }
            in_audio = line.to_ascii_lowercase().starts_with("m=audio");
            if in_audio {
                seen_audio = true;
                info.payload_types = line
                    .split_whitespace()
                    .skip(3)
                    .filter_map(|pt| pt.parse::<u8>().ok())
                    .collect();
            }
            continue;
        }

        if in_audio && line.starts_with("a=rtpmap:") {
            if let Some(map) = parse_rtpmap(line.trim_start_matches("a=rtpmap:")) {
                info.rtpmaps.push(map);
            }
        }
    }

    if seen_audio {
        Some(info)
    } else {
        None
    }
}

fn parse_rtpmap(value: &str) -> Option<RtpMap> {
    let mut parts = value.split_whitespace();
    let payload_type = parts.next()?.parse::<u8>().ok()?;
    let mut encoding = parts.next()?.split('/');
    let encoding_name = encoding.next()?.to_string();
    let clock_rate = encoding.next()?.parse::<u32>().ok()?;
    let channels = encoding.next().and_then(|value| value.parse::<u8>().ok());
    Some(RtpMap {
        payload_type,
        encoding_name,
        clock_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDP: &str = "v=0\r\n\
o=- 0 0 IN IP4 127.0.0.1\r\n\
s=call\r\n\
c=IN IP4 127.0.0.1\r\n\
t=0 0\r\n\
m=audio 5004 RTP/AVP 8 97 101\r\n\
a=rtpmap:8 PCMA/8000\r\n\
a=rtpmap:97 L16/16000/2\r\n\
a=rtpmap:101 telephone-event/8000\r\n\
m=video 5006 RTP/AVP 96\r\n\
a=rtpmap:96 H264/90000\r\n";

    #[test]
    fn parse_sdp_reads_audio_section_only() {
        let info = parse_sdp(SDP.as_bytes()).expect("audio section");
        assert_eq!(info.payload_types, vec![8, 97, 101]);
        assert_eq!(info.rtpmaps.len(), 3);
        assert!(info.rtpmap(96).is_none());

        let l16 = info.rtpmap(97).expect("rtpmap 97");
        assert_eq!(l16.encoding_name, "L16");
        assert_eq!(l16.clock_rate, 16_000);
        assert_eq!(l16.channels, Some(2));
    }

    #[test]
    fn payload_format_resolves_known_encodings() {
        let info = parse_sdp(SDP.as_bytes()).expect("audio section");

        let pcma = info.payload_format(8).expect("pcma");
        assert_eq!(pcma.encoding, AudioEncoding::Pcma);
        assert_eq!(pcma.clock_rate.get(), 8_000);

        let l16 = info.payload_format(97).expect("l16");
        assert_eq!(l16.channel_count, 2);

        assert!(info.payload_format(101).is_none());
    }

    #[test]
    fn parse_sdp_without_audio_is_none() {
        assert!(parse_sdp(b"v=0\r\nm=video 0 RTP/AVP 96\r\n").is_none());
    }
}
