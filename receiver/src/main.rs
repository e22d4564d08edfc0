mod config;
mod rtp;

use crate::config::Config;
use crate::rtp::{SampleRecorder, SampleStream};
use anyhow::Context;
use std::future::Future;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    let sdp = match config.sdp_path.as_ref() {
        Some(path) => {
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read SDP_PATH {path}"))?;
            let sdp = rtp::sdp::parse_sdp(&body).context("sdp has no audio media section")?;
            if !sdp.payload_types.contains(&config.rtp_payload_type) {
                warn!(
                    payload_type = config.rtp_payload_type,
                    offered = ?sdp.payload_types,
                    "payload type not offered in sdp"
                );
            }
            Some(sdp)
        }
        None => None,
    };
    let payload_format = config.payload_format(sdp.as_ref())?;
    info!(
        payload_type = payload_format.payload_type,
        encoding = payload_format.encoding.name(),
        clock_rate = payload_format.clock_rate.get(),
        channels = payload_format.channel_count,
        "payload format resolved"
    );

    let stream = SampleStream::new();
    let recorder = SampleRecorder::new(PathBuf::from(&config.output_dir)).await?;
    let recorder_task = tokio::spawn(recorder.run(stream.subscribe()));

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    run_until_shutdown(
        rtp::run_receiver(config, payload_format, stream),
        recorder_task,
        shutdown,
    )
    .await
}

/// Drives the receiver until `shutdown` resolves. A recorder that stops on its
/// own ends the run with its error instead of leaving the receiver publishing
/// to nobody.
async fn run_until_shutdown<R, S>(
    receiver: R,
    mut recorder_task: JoinHandle<anyhow::Result<()>>,
    shutdown: S,
) -> anyhow::Result<()>
where
    R: Future<Output = anyhow::Result<()>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = receiver => result?,
        joined = &mut recorder_task => {
            let error = match joined {
                Ok(Ok(())) => anyhow::anyhow!("recorder stopped while the receiver was running"),
                Ok(Err(error)) => error,
                Err(error) => error.into(),
            };
            warn!(?error, "recorder stopped");
            return Err(error.context("recording failed"));
        }
        _ = shutdown => info!("shutting down"),
    }

    recorder_task.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::format::PayloadFormat;
    use crate::rtp::reader::{PayloadReader, RtpPayloadReader};
    use bytes::Bytes;
    use std::time::Duration;

    async fn publish_one_sample(mut stream: SampleStream) -> anyhow::Result<()> {
        let format = PayloadFormat::from_static_payload_type(0).unwrap();
        let mut reader = PayloadReader::for_format(format);
        let mut track = reader.create_tracks(&mut stream, 0);
        reader.seek(0, 0);
        reader.consume(&mut track, Bytes::from_static(&[0xFF; 160]), 0, 0, false);
        std::future::pending::<anyhow::Result<()>>().await
    }

    #[tokio::test]
    async fn recorder_failure_ends_the_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("track-0.raw")).unwrap();
        let stream = SampleStream::new();
        let recorder = SampleRecorder::new(dir.path().to_path_buf()).await.unwrap();
        let recorder_task = tokio::spawn(recorder.run(stream.subscribe()));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_until_shutdown(
                publish_one_sample(stream),
                recorder_task,
                std::future::pending(),
            ),
        )
        .await
        .expect("run should end when the recorder fails");

        let error = result.expect_err("recorder error is reported");
        assert!(format!("{error:#}").contains("track-0.raw"));
    }

    #[tokio::test]
    async fn shutdown_lets_the_recorder_flush() {
        let dir = tempfile::tempdir().unwrap();
        let stream = SampleStream::new();
        let recorder = SampleRecorder::new(dir.path().to_path_buf()).await.unwrap();
        let recorder_task = tokio::spawn(recorder.run(stream.subscribe()));

        run_until_shutdown(
            publish_one_sample(stream),
            recorder_task,
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await
        .unwrap();

        let raw = std::fs::read(dir.path().join("track-0.raw")).unwrap();
        assert_eq!(raw, vec![0xFF; 160]);
    }
}
