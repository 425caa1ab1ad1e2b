// THEORY:
// The `source` module is where detections enter the supervisor. The live system
// gets them from a hosted inference service running the model over the video
// stream; the supervisor only ever sees them through `DetectionSource`.
//
// Key architectural principles:
// 1.  **One Batch Per Frame**: A source yields frames in order, each with its
//     stream timestamp and the detections for that frame (possibly none).
// 2.  **Replay**: `ReplaySource` plays back a JSON Lines recording of the
//     service's output. A bad line stops the feed with an error naming the line.

use crate::error::{Result, SupervisorError};
use attic_watch::{BoundingBox, Detection};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

/// Largest accepted stream timestamp: one year.
pub const MAX_TIMESTAMP_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// One frame's worth of detections.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    pub frame_id: u64,
    /// Time since the start of the stream.
    pub timestamp: Duration,
    pub detections: Vec<Detection>,
}

/// Anything that yields detection batches in frame order.
pub trait DetectionSource {
    /// The next batch, or `None` at the end of the stream.
    fn next_batch(&mut self) -> Result<Option<FrameBatch>>;
}

/// A prediction as the inference service reports it: centre point and extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "class", default)]
    pub class_name: String,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

/// One line of a recorded feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_id: u64,
    /// Seconds since the start of the stream.
    pub timestamp: f64,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

impl From<&Prediction> for Detection {
    fn from(p: &Prediction) -> Self {
        Detection::new(
            BoundingBox::from_center(p.x, p.y, p.width, p.height),
            p.class_name.clone(),
            p.confidence,
        )
    }
}

/// Replays a JSON Lines recording of inference results.
pub struct ReplaySource<R> {
    reader: R,
    line_no: usize,
    min_confidence: f32,
    buffer: String,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path, min_confidence: f32) -> Result<Self> {
        let file = File::open(path).map_err(|source| SupervisorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), min_confidence))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R, min_confidence: f32) -> Self {
        Self {
            reader,
            line_no: 0,
            min_confidence,
            buffer: String::new(),
        }
    }

    fn to_batch(&self, record: FrameRecord) -> Result<FrameBatch> {
        let timestamp = record.timestamp;
        if !(0.0..=MAX_TIMESTAMP_SECS).contains(&timestamp) {
            return Err(SupervisorError::Timestamp {
                line: self.line_no,
                value: timestamp,
            });
        }
        let detections = record
            .predictions
            .iter()
            .filter(|p| p.confidence >= self.min_confidence)
            .map(Detection::from)
            .collect();
        Ok(FrameBatch {
            frame_id: record.frame_id,
            timestamp: Duration::from_secs_f64(timestamp),
            detections,
        })
    }
}

impl<R: BufRead> DetectionSource for ReplaySource<R> {
    fn next_batch(&mut self) -> Result<Option<FrameBatch>> {
        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|source| SupervisorError::Io {
                    path: "<detection feed>".into(),
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            let record: FrameRecord = serde_json::from_str(line).map_err(|source| SupervisorError::Record {
                line: self.line_no,
                source,
            })?;
            return self.to_batch(record).map(Some);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FEED: &str = r#"{"frame_id": 0, "timestamp": 0.0, "predictions": [{"x": 150, "y": 150, "width": 40, "height": 20, "class": "rat", "confidence": 0.91}]}

{"frame_id": 1, "timestamp": 0.04, "predictions": []}
{"frame_id": 2, "timestamp": 0.08, "predictions": [{"x": 10, "y": 10, "width": 4, "height": 4, "class": "rat", "confidence": 0.2}, {"x": 500, "y": 300, "width": 30, "height": 30}]}
"#;

    #[test]
    fn replays_frames_in_order() {
        let mut source = ReplaySource::from_reader(Cursor::new(FEED), 0.0);

        let first = source.next_batch().expect("read").expect("frame 0");
        assert_eq!(first.frame_id, 0);
        assert_eq!(first.detections.len(), 1);
        assert_eq!(first.detections[0].bbox, BoundingBox::from_xyxy(130.0, 140.0, 170.0, 160.0));
        assert_eq!(first.detections[0].class_name, "rat");

        let second = source.next_batch().expect("read").expect("frame 1");
        assert!(second.detections.is_empty());
        assert_eq!(second.timestamp, Duration::from_secs_f64(0.04));

        let third = source.next_batch().expect("read").expect("frame 2");
        assert_eq!(third.detections.len(), 2);
        assert_eq!(third.detections[1].confidence, 1.0);

        assert!(source.next_batch().expect("read").is_none());
    }

    #[test]
    fn confidence_filter_drops_weak_predictions() {
        let mut source = ReplaySource::from_reader(Cursor::new(FEED), 0.5);
        let mut kept = 0;
        while let Some(batch) = source.next_batch().expect("read") {
            kept += batch.detections.len();
        }
        assert_eq!(kept, 2);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let feed = "{\"frame_id\": 0, \"timestamp\": 0.0}\n\n{not json}\n";
        let mut source = ReplaySource::from_reader(Cursor::new(feed), 0.0);
        assert!(source.next_batch().expect("first line is valid").is_some());
        match source.next_batch() {
            Err(SupervisorError::Record { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a record error, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_timestamp_is_rejected_with_its_line() {
        let feed = "{\"frame_id\": 0, \"timestamp\": 0.5}\n{\"frame_id\": 1, \"timestamp\": 1e19}\n{\"frame_id\": 2, \"timestamp\": -1.0}\n";
        let mut source = ReplaySource::from_reader(Cursor::new(feed), 0.0);
        assert!(source.next_batch().expect("first line is valid").is_some());
        match source.next_batch() {
            Err(SupervisorError::Timestamp { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, 1e19);
            }
            other => panic!("expected a timestamp error, got {other:?}"),
        }
        assert!(matches!(
            source.next_batch(),
            Err(SupervisorError::Timestamp { line: 3, .. })
        ));
    }
}
