use crate::rtp::format::{AudioEncoding, PayloadFormat};
use crate::rtp::sdp::SdpInfo;
use anyhow::{bail, Context};
use std::env;
use std::num::NonZeroU32;

#[derive(Clone, Debug)]
pub struct Config {
    pub rtp_bind: String,
    pub rtp_payload_type: u8,
    pub rtp_encoding: Option<String>,
    pub rtp_clock_rate: Option<u32>,
    pub rtp_channels: Option<u8>,
    pub rtp_start_time_us: Option<i64>,
    pub rtp_packet_timeout_secs: u64,
    pub sdp_path: Option<String>,
    pub output_dir: String,
    pub track_id: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let rtp_bind = env::var("RTP_BIND").unwrap_or_else(|_| "0.0.0.0:5004".to_string());
        let rtp_payload_type = env_u8("RTP_PAYLOAD_TYPE").unwrap_or(0);
        if rtp_payload_type > 127 {
            bail!("RTP_PAYLOAD_TYPE must be in 0..=127, got {rtp_payload_type}");
        }
        let rtp_encoding = env::var("RTP_ENCODING").ok();
        let rtp_clock_rate = env_u32("RTP_CLOCK_RATE");
        let rtp_channels = env_u8("RTP_CHANNELS");
        let rtp_start_time_us = env_i64("RTP_START_TIME_US");
        let rtp_packet_timeout_secs = env_u64("RTP_PACKET_TIMEOUT_SECS").unwrap_or(10);
        let sdp_path = env::var("SDP_PATH").ok();
        let output_dir = env::var("OUTPUT_DIR").unwrap_or_else(|_| "recordings".to_string());
        let track_id = env_u32("TRACK_ID").unwrap_or(0);

        Ok(Self {
            rtp_bind,
            rtp_payload_type,
            rtp_encoding,
            rtp_clock_rate,
            rtp_channels,
            rtp_start_time_us,
            rtp_packet_timeout_secs,
            sdp_path,
            output_dir,
            track_id,
        })
    }

    /// Resolves the payload format from the SDP, then the static payload
    /// table, then applies the `RTP_ENCODING`/`RTP_CLOCK_RATE`/`RTP_CHANNELS`
    /// overrides.
    pub fn payload_format(&self, sdp: Option<&SdpInfo>) -> anyhow::Result<PayloadFormat> {
        let payload_type = self.rtp_payload_type;
        let negotiated = sdp
            .and_then(|sdp| sdp.payload_format(payload_type))
            .or_else(|| PayloadFormat::from_static_payload_type(payload_type));

        let encoding = match self.rtp_encoding.as_deref() {
            Some(name) => AudioEncoding::from_name(name)
                .with_context(|| format!("unsupported RTP_ENCODING {name}"))?,
            None => negotiated
                .as_ref()
                .map(|format| format.encoding)
                .with_context(|| {
                    format!("no encoding known for payload type {payload_type}; set RTP_ENCODING")
                })?,
        };

        let clock_rate = match self.rtp_clock_rate {
            Some(rate) => NonZeroU32::new(rate).context("RTP_CLOCK_RATE must be positive")?,
            None => negotiated
                .as_ref()
                .map(|format| format.clock_rate)
                .with_context(|| {
                    format!("no clock rate known for payload type {payload_type}; set RTP_CLOCK_RATE")
                })?,
        };

        let channels = self
            .rtp_channels
            .or_else(|| negotiated.as_ref().map(|format| format.channel_count))
            .unwrap_or(1);

        Ok(PayloadFormat::new(payload_type, encoding, clock_rate, channels))
    }
}

fn env_u8(name: &str) -> Option<u8> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_u32(name: &str) -> Option<u32> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_i64(name: &str) -> Option<i64> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}
