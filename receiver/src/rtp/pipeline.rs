use crate::config::Config;
use crate::rtp::format::PayloadFormat;
use crate::rtp::packet::RtpPacket;
use crate::rtp::reader::{PayloadReader, RtpPayloadReader};
use crate::rtp::stream::SampleStream;
use crate::rtp::time::RtpTimestampUnwrapper;
use anyhow::Context;
use bytes::Bytes;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Default)]
pub struct SessionSummary {
    pub packets: u64,
    pub dropped: u64,
    pub sources: u32,
}

pub async fn run_receiver(
    config: Config,
    payload_format: PayloadFormat,
    stream: SampleStream,
) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(&config.rtp_bind)
        .await
        .with_context(|| format!("failed to bind {}", config.rtp_bind))?;
    info!(addr = %socket.local_addr()?, "rtp receiver listening");

    loop {
        match run_session(&config, &socket, payload_format.clone(), stream.clone()).await {
            Ok(summary) if summary.packets == 0 => continue,
            Ok(summary) => info!(
                packets = summary.packets,
                dropped = summary.dropped,
                sources = summary.sources,
                "rtp session ended"
            ),
            Err(error) => {
                warn!(?error, "rtp session ended");
                sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

/// Receives one session: from the first matching packet until the socket has
/// been idle for `rtp_packet_timeout_secs`.
pub async fn run_session(
    config: &Config,
    socket: &UdpSocket,
    payload_format: PayloadFormat,
    mut stream: SampleStream,
) -> anyhow::Result<SessionSummary> {
    let expected_payload = payload_format.payload_type;
    let idle = Duration::from_secs(config.rtp_packet_timeout_secs.max(1));
    let mut reader = PayloadReader::for_format(payload_format);
    let mut track = None;
    let mut unwrapper = RtpTimestampUnwrapper::new();
    let mut ssrc = None;
    let mut summary = SessionSummary::default();
    let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];

    loop {
        let (len, peer) = match timeout(idle, socket.recv_from(&mut buf)).await {
            Ok(received) => received.context("rtp socket receive failed")?,
            Err(_) => break,
        };

        let rtp = match RtpPacket::parse(Bytes::copy_from_slice(&buf[..len])) {
            Some(packet) => packet,
            None => {
                debug!(%peer, bytes = len, "ignoring non-rtp datagram");
                continue;
            }
        };
        if rtp.payload_type != expected_payload {
            trace!(payload_type = rtp.payload_type, "ignoring rtp payload type");
            continue;
        }

        if ssrc != Some(rtp.ssrc) {
            if let Some(previous) = ssrc {
                info!(previous, ssrc = rtp.ssrc, "rtp source changed; re-anchoring");
            } else {
                debug!(
                    %peer,
                    payload_type = rtp.payload_type,
                    sequence = rtp.sequence_number,
                    timestamp = rtp.timestamp,
                    "rtp packet received"
                );
            }
            ssrc = Some(rtp.ssrc);
            summary.sources += 1;
            unwrapper.reset();
            let timestamp = unwrapper.unwrap(rtp.timestamp);
            match config.rtp_start_time_us {
                Some(start_time_us) => reader.seek(timestamp, start_time_us),
                None => reader.on_receiving_first_packet(timestamp, rtp.sequence_number),
            }
        }

        let track =
            track.get_or_insert_with(|| reader.create_tracks(&mut stream, config.track_id));
        let timestamp = unwrapper.unwrap(rtp.timestamp);
        reader.consume(
            track,
            rtp.payload,
            timestamp,
            rtp.sequence_number,
            rtp.marker,
        );
        summary.packets += 1;
        if summary.packets == 1 {
            debug!(track_id = track.id(), "first rtp payload consumed");
        }
    }

    summary.dropped = reader.dropped_packets();
    Ok(summary)
}

const MAX_DATAGRAM_BYTES: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    fn config(start_time_us: Option<i64>) -> Config {
        Config {
            rtp_bind: "127.0.0.1:0".to_string(),
            rtp_payload_type: 0,
            rtp_encoding: None,
            rtp_clock_rate: None,
            rtp_channels: None,
            rtp_start_time_us: start_time_us,
            rtp_packet_timeout_secs: 1,
            sdp_path: None,
            output_dir: "recordings".to_string(),
            track_id: 7,
        }
    }

    const SSRC: u32 = 0x0BAD_F00D;

    fn datagram(payload_type: u8, sequence: u16, timestamp: u32, fill: u8) -> Vec<u8> {
        datagram_from(SSRC, payload_type, sequence, timestamp, fill)
    }

    fn datagram_from(
        ssrc: u32,
        payload_type: u8,
        sequence: u16,
        timestamp: u32,
        fill: u8,
    ) -> Vec<u8> {
        let mut data = vec![0x80, payload_type];
        data.extend_from_slice(&sequence.to_be_bytes());
        data.extend_from_slice(&timestamp.to_be_bytes());
        data.extend_from_slice(&ssrc.to_be_bytes());
        data.extend(std::iter::repeat(fill).take(160));
        data
    }

    #[tokio::test]
    async fn session_forwards_packets_across_a_timestamp_wrap() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.connect(socket.local_addr().unwrap()).await.unwrap();

        let stream = SampleStream::new();
        let mut subscription = stream.subscribe();
        let payload_format = PayloadFormat::from_static_payload_type(0).unwrap();

        let first = u32::MAX - 79;
        sender.send(&datagram(0, 1, first, 0xAA)).await.unwrap();
        sender.send(b"not rtp").await.unwrap();
        sender.send(&datagram(8, 2, first, 0xEE)).await.unwrap();
        sender
            .send(&datagram(0, 3, first.wrapping_add(160), 0xBB))
            .await
            .unwrap();

        let summary = run_session(&config(Some(5_000_000)), &socket, payload_format, stream)
            .await
            .unwrap();

        assert_eq!(summary.packets, 2);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.sources, 1);

        let format = subscription.format_rx.borrow().clone().expect("format");
        assert_eq!(format.track_id, 7);

        let a = subscription.sample_rx.recv().await.unwrap();
        let b = subscription.sample_rx.recv().await.unwrap();
        assert_eq!(a.time_us, 5_000_000);
        assert_eq!(&a.data[..], &[0xAA; 160][..]);
        assert_eq!(b.time_us, 5_020_000);
        assert_eq!(&b.data[..], &[0xBB; 160][..]);
    }

    #[tokio::test]
    async fn idle_session_reports_no_packets() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let payload_format = PayloadFormat::from_static_payload_type(0).unwrap();

        let summary = run_session(&config(None), &socket, payload_format, SampleStream::new())
            .await
            .unwrap();

        assert_eq!(summary.packets, 0);
        assert_eq!(summary.sources, 0);
    }

    #[tokio::test]
    async fn new_source_restarts_at_the_time_offset() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.connect(socket.local_addr().unwrap()).await.unwrap();

        let stream = SampleStream::new();
        let mut subscription = stream.subscribe();
        let payload_format = PayloadFormat::from_static_payload_type(0).unwrap();

        let packets = [
            datagram_from(0x1111, 0, 10, 1_000, 0x01),
            datagram_from(0x1111, 0, 11, 1_160, 0x02),
            datagram_from(0x2222, 0, 500, 90_000, 0x03),
            datagram_from(0x2222, 0, 501, 90_320, 0x04),
        ];
        for packet in &packets {
            sender.send(packet).await.unwrap();
        }

        let summary = run_session(&config(None), &socket, payload_format, stream)
            .await
            .unwrap();

        assert_eq!(summary.packets, 4);
        assert_eq!(summary.sources, 2);
        assert_eq!(summary.dropped, 0);

        let mut samples = Vec::new();
        while let Ok(sample) = subscription.sample_rx.try_recv() {
            samples.push(sample);
        }
        let times: Vec<i64> = samples.iter().map(|s| s.time_us).collect();
        assert_eq!(times, vec![0, 20_000, 0, 40_000]);
        for (sample, fill) in samples.iter().zip([0x01u8, 0x02, 0x03, 0x04]) {
            assert_eq!(sample.data.len(), 160);
            assert!(sample.data.iter().all(|byte| *byte == fill));
        }
    }
}
