use crate::rtp::stream::{Sample, SampleStreamSubscription, TrackFormat};
use crate::rtp::track::TrackKind;
use anyhow::Context;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Writes every published sample to `track-<id>.raw` and indexes it in
/// `track-<id>.jsonl`.
#[derive(Debug)]
pub struct SampleRecorder {
    output_dir: PathBuf,
    tracks: HashMap<u32, TrackFiles>,
}

#[derive(Debug)]
struct TrackFiles {
    raw: BufWriter<fs::File>,
    index: BufWriter<fs::File>,
    samples: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    time_us: i64,
    size: usize,
    flags: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatFile<'a> {
    track_id: u32,
    kind: TrackKind,
    #[serde(flatten)]
    format: &'a crate::rtp::format::Format,
}

impl SampleRecorder {
    pub async fn new(output_dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        Ok(Self {
            output_dir,
            tracks: HashMap::new(),
        })
    }

    pub async fn run(mut self, mut subscription: SampleStreamSubscription) -> anyhow::Result<()> {
        let current = subscription.format_rx.borrow_and_update().clone();
        if let Some(format) = current {
            self.write_format(&format).await?;
        }

        let mut formats_open = true;
        loop {
            tokio::select! {
                biased;
                changed = subscription.format_rx.changed(), if formats_open => {
                    if changed.is_err() {
                        formats_open = false;
                        continue;
                    }
                    let current = subscription.format_rx.borrow_and_update().clone();
                    if let Some(format) = current {
                        self.write_format(&format).await?;
                    }
                }
                received = subscription.sample_rx.recv() => match received {
                    Ok(sample) => self.write_sample(sample).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "recorder fell behind; samples lost");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        self.finish().await
    }

    async fn write_format(&mut self, format: &TrackFormat) -> anyhow::Result<()> {
        let path = self
            .output_dir
            .join(format!("track-{}.format.json", format.track_id));
        let body = serde_json::to_vec_pretty(&FormatFile {
            track_id: format.track_id,
            kind: format.kind,
            format: &format.format,
        })?;
        fs::write(&path, body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(
            track_id = format.track_id,
            mime = format.format.sample_mime_type,
            "track format written"
        );
        Ok(())
    }

    async fn write_sample(&mut self, sample: Sample) -> anyhow::Result<()> {
        if !self.tracks.contains_key(&sample.track_id) {
            let files = self.open_track(sample.track_id).await?;
            self.tracks.insert(sample.track_id, files);
        }
        let Some(files) = self.tracks.get_mut(&sample.track_id) else {
            return Ok(());
        };

        files.raw.write_all(&sample.data).await?;
        let mut line = serde_json::to_vec(&IndexEntry {
            time_us: sample.time_us,
            size: sample.data.len(),
            flags: sample.flags.bits(),
        })?;
        line.push(b'\n');
        files.index.write_all(&line).await?;
        files.samples = files.samples.saturating_add(1);
        Ok(())
    }

    async fn open_track(&self, track_id: u32) -> anyhow::Result<TrackFiles> {
        let raw_path = self.output_dir.join(format!("track-{track_id}.raw"));
        let index_path = self.output_dir.join(format!("track-{track_id}.jsonl"));
        let raw = fs::File::create(&raw_path)
            .await
            .with_context(|| format!("failed to create {}", raw_path.display()))?;
        let index = fs::File::create(&index_path)
            .await
            .with_context(|| format!("failed to create {}", index_path.display()))?;
        info!(track_id, path = %raw_path.display(), "recording track");
        Ok(TrackFiles {
            raw: BufWriter::new(raw),
            index: BufWriter::new(index),
            samples: 0,
        })
    }

    async fn finish(mut self) -> anyhow::Result<()> {
        for (track_id, files) in self.tracks.iter_mut() {
            files.raw.flush().await?;
            files.index.flush().await?;
            info!(track_id, samples = files.samples, "recording closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::format::PayloadFormat;
    use crate::rtp::reader::{PayloadReader, RtpPayloadReader};
    use crate::rtp::stream::SampleStream;
    use bytes::Bytes;

    #[tokio::test]
    async fn recorder_writes_payload_index_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = SampleStream::new();
        let recorder = SampleRecorder::new(dir.path().to_path_buf()).await.unwrap();
        let task = tokio::spawn(recorder.run(stream.subscribe()));

        let format = PayloadFormat::from_static_payload_type(0).unwrap();
        let mut reader = PayloadReader::for_format(format);
        let mut track = reader.create_tracks(&mut stream, 4);
        reader.seek(1_000, 5_000_000);
        reader.consume(&mut track, Bytes::from(vec![0xAA; 160]), 1_000, 0, false);
        reader.consume(&mut track, Bytes::from(vec![0xCC; 160]), -40_000, 1, false);
        reader.consume(&mut track, Bytes::from(vec![0xBB; 160]), 9_000, 2, false);
        assert_eq!(reader.dropped_packets(), 1);
        drop(track);
        drop(stream);

        task.await.unwrap().unwrap();

        let raw = std::fs::read(dir.path().join("track-4.raw")).unwrap();
        let mut expected = vec![0xAA; 160];
        expected.extend(vec![0xBB; 160]);
        assert_eq!(raw, expected);

        let index = std::fs::read_to_string(dir.path().join("track-4.jsonl")).unwrap();
        let entries: Vec<serde_json::Value> = index
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["timeUs"], 5_000_000);
        assert_eq!(entries[1]["timeUs"], 6_000_000);
        assert_eq!(entries[1]["size"], 160);
        assert_eq!(entries[1]["flags"], 1);

        let format: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("track-4.format.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(format["trackId"], 4);
        assert_eq!(format["kind"], "audio");
        assert_eq!(format["sampleMimeType"], "audio/g711-mlaw");
        assert_eq!(format["sampleRate"], 8_000);
    }
}
