// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Asynchronous detector requests.
//!
//! Each request runs on its own background thread and reports back through
//! a channel that the interaction thread polls, in the same way images are
//! loaded in the background. At most one request is in flight; every
//! request is tagged with the image key it was issued for so results for
//! an image that is no longer displayed can be discarded.

use crate::engine::color::color_for;
use crate::error::EngineError;
use crate::models::annotation::{BoundingBox, Point, Shape};
use crate::models::project::LabelVocabulary;
use crate::util::geometry::{from_normalized, ImageSize, NormalizedBox, NormalizedGeometry};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Normalized region reported by a detector.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Center/size box, like YOLO `xywhn`.
    Rect(NormalizedBox),
    Polygon(Vec<Point>),
}

/// A single detector result.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub region: Region,
    pub confidence: f64,
}

/// External object detector. Called from a background thread.
pub trait Detector: Send + Sync {
    fn detect(&self, image_path: &Path) -> anyhow::Result<Vec<Detection>>;
}

/// Result of a finished request.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    /// Image the request was issued for.
    pub image_key: String,
    pub result: Result<Vec<Detection>, EngineError>,
}

struct PendingDetection {
    image_key: String,
    receiver: Receiver<Result<Vec<Detection>, EngineError>>,
}

/// Runs detector requests, one at a time.
#[derive(Default)]
pub struct DetectionRunner {
    pending: Option<PendingDetection>,
    issued: u64,
}

impl DetectionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request is in flight (the trigger should be disabled).
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of requests actually started.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Image key of the in-flight request.
    pub fn pending_image(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.image_key.as_str())
    }

    /// Start a request unless one is already running.
    pub fn trigger(
        &mut self,
        detector: Arc<dyn Detector>,
        image_key: &str,
        image_path: PathBuf,
    ) -> Result<(), EngineError> {
        if self.is_busy() {
            log::debug!("Detection already running, trigger ignored");
            return Err(EngineError::DetectionInFlight);
        }

        let (sender, receiver) = channel();
        std::thread::spawn(move || {
            let result = detector
                .detect(&image_path)
                .map_err(|e| EngineError::Detector(format!("{:#}", e)));
            let _ = sender.send(result);
        });

        self.issued += 1;
        self.pending = Some(PendingDetection {
            image_key: image_key.to_string(),
            receiver,
        });
        log::info!("Detection started for {}", image_key);
        Ok(())
    }

    /// Non-blocking check for a finished request.
    pub fn poll(&mut self) -> Option<DetectionEvent> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(thread_exited()),
        };
        self.finish(result)
    }

    /// Blocking variant of [`poll`](Self::poll) with a timeout.
    pub fn wait(&mut self, timeout: Duration) -> Option<DetectionEvent> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(thread_exited()),
        };
        self.finish(result)
    }

    fn finish(&mut self, result: Result<Vec<Detection>, EngineError>) -> Option<DetectionEvent> {
        let pending = self.pending.take()?;
        Some(DetectionEvent {
            image_key: pending.image_key,
            result,
        })
    }
}

fn thread_exited() -> EngineError {
    EngineError::Detector("detector thread exited without a result".to_string())
}

/// Turn detections into shapes for an image of `size`.
///
/// When `target_classes` is non-empty, other labels are dropped. New labels
/// are appended to the vocabulary.
pub fn detections_to_shapes(
    detections: Vec<Detection>,
    target_classes: &[String],
    size: ImageSize,
    vocabulary: &mut dyn LabelVocabulary,
) -> Result<Vec<Shape>, EngineError> {
    let mut shapes = Vec::new();
    for detection in detections {
        if !target_classes.is_empty() && !target_classes.contains(&detection.label) {
            continue;
        }
        let normalized = match detection.region {
            Region::Rect(b) => NormalizedGeometry::Rect(b),
            Region::Polygon(points) => {
                let bounds = BoundingBox::from_points(&points);
                NormalizedGeometry::Polygon {
                    points,
                    bounds: NormalizedBox {
                        x_center: bounds.x + bounds.width / 2.0,
                        y_center: bounds.y + bounds.height / 2.0,
                        width: bounds.width,
                        height: bounds.height,
                    },
                }
            }
        };
        vocabulary.ensure(&detection.label)?;
        let color = color_for(&detection.label, &vocabulary.labels());
        shapes.push(
            Shape::new(detection.label, from_normalized(&normalized, size), color)
                .with_confidence(detection.confidence),
        );
    }
    Ok(shapes)
}
