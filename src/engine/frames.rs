// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background frame extraction from video files.
//!
//! The extractor itself is an external collaborator. This module only runs
//! it off the interaction thread, forwards progress through a channel and
//! lets the user cancel. Extraction never touches the shape store; it only
//! produces images to be loaded later.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Progress callback: percent done (0-100) and a status message.
pub type ProgressFn<'a> = dyn FnMut(u8, &str) + 'a;

/// Extracts still frames from a video into a directory.
pub trait FrameExtractor: Send + 'static {
    /// Write frames to a directory under `output_dir` and return it.
    ///
    /// Implementations should poll `cancel` between frames and return early
    /// once it is set.
    fn extract(
        &mut self,
        video: &Path,
        output_dir: &Path,
        fps: u32,
        progress: &mut ProgressFn<'_>,
        cancel: &AtomicBool,
    ) -> anyhow::Result<PathBuf>;
}

/// Messages sent from the extraction thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionEvent {
    Progress { percent: u8, message: String },
    Finished { output_dir: PathBuf },
    Cancelled,
    Failed(String),
}

impl ExtractionEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExtractionEvent::Progress { .. })
    }
}

/// A running extraction job.
pub struct FrameExtraction {
    cancel: Arc<AtomicBool>,
    receiver: Receiver<ExtractionEvent>,
    handle: Option<JoinHandle<()>>,
}

impl FrameExtraction {
    /// Start `extractor` on a background thread.
    pub fn spawn(
        mut extractor: impl FrameExtractor,
        video: PathBuf,
        output_dir: PathBuf,
        fps: u32,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = channel();
        let thread_cancel = Arc::clone(&cancel);

        log::info!("Extracting frames from {} at {} fps", video.display(), fps);
        let handle = std::thread::spawn(move || {
            let progress_sender: Sender<ExtractionEvent> = sender.clone();
            let mut progress = |percent: u8, message: &str| {
                let _ = progress_sender.send(ExtractionEvent::Progress {
                    percent: percent.min(100),
                    message: message.to_string(),
                });
            };
            let result = extractor.extract(&video, &output_dir, fps, &mut progress, &thread_cancel);
            let event = match result {
                _ if thread_cancel.load(Ordering::SeqCst) => ExtractionEvent::Cancelled,
                Ok(output_dir) => ExtractionEvent::Finished { output_dir },
                Err(e) => ExtractionEvent::Failed(format!("{:#}", e)),
            };
            let _ = sender.send(event);
        });

        Self {
            cancel,
            receiver,
            handle: Some(handle),
        }
    }

    /// Ask the extractor to stop at its next check.
    pub fn cancel(&self) {
        log::info!("Frame extraction cancel requested");
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Next pending event, if any, without blocking.
    pub fn try_next(&self) -> Option<ExtractionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Next event, waiting at most `timeout`.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ExtractionEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(ExtractionEvent::Failed(
                "extraction thread exited without a result".to_string(),
            )),
        }
    }
}

impl Drop for FrameExtraction {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Extractor producing `frames` fake frames, checking cancel between them.
    struct CountingExtractor {
        frames: u32,
        gate: Option<Receiver<()>>,
    }

    impl FrameExtractor for CountingExtractor {
        fn extract(
            &mut self,
            video: &Path,
            output_dir: &Path,
            _fps: u32,
            progress: &mut ProgressFn<'_>,
            cancel: &AtomicBool,
        ) -> anyhow::Result<PathBuf> {
            for i in 0..self.frames {
                if let Some(gate) = &self.gate {
                    gate.recv()?;
                }
                if cancel.load(Ordering::SeqCst) {
                    anyhow::bail!("stopped");
                }
                progress(((i + 1) * 100 / self.frames) as u8, "extracting");
            }
            let stem = video.file_stem().unwrap_or_default();
            Ok(output_dir.join(stem))
        }
    }

    fn drain(job: &FrameExtraction) -> Vec<ExtractionEvent> {
        let mut events = Vec::new();
        while let Some(event) = job.next_timeout(Duration::from_secs(5)) {
            let done = event.is_terminal();
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn test_progress_then_finished() {
        let job = FrameExtraction::spawn(
            CountingExtractor { frames: 4, gate: None },
            PathBuf::from("clip.mp4"),
            PathBuf::from("out"),
            2,
        );
        let events = drain(&job);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[3],
            ExtractionEvent::Progress {
                percent: 100,
                message: "extracting".to_string()
            }
        );
        assert_eq!(
            events[4],
            ExtractionEvent::Finished {
                output_dir: PathBuf::from("out/clip")
            }
        );
    }

    #[test]
    fn test_cancel_stops_extraction() {
        let (tx, rx) = channel();
        let job = FrameExtraction::spawn(
            CountingExtractor {
                frames: 10,
                gate: Some(rx),
            },
            PathBuf::from("clip.mp4"),
            PathBuf::from("out"),
            2,
        );
        tx.send(()).unwrap();
        assert!(matches!(
            job.next_timeout(Duration::from_secs(5)),
            Some(ExtractionEvent::Progress { percent: 10, .. })
        ));

        job.cancel();
        tx.send(()).unwrap();
        let events = drain(&job);
        assert_eq!(events.last(), Some(&ExtractionEvent::Cancelled));
    }
}
