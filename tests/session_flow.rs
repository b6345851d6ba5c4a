// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! End-to-end flows through an annotation session.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use yintu::config::AppConfig;
use yintu::engine::controller::{InputOutcome, LabelDialog, Mode, PointerButton, PointerEvent};
use yintu::engine::detect::{Detection, Detector, Region};
use yintu::engine::persistence::{AnnotationStorage, SaveTrigger};
use yintu::engine::selection::{SelectionEvent, SelectionView};
use yintu::engine::session::{AnnotationSession, DetectionOutcome};
use yintu::io::storage::JsonProjectStorage;
use yintu::models::annotation::{Point, ShapeId};
use yintu::models::project::{LabelVocabulary, ProjectData};
use yintu::models::record::{AnnotationRecord, ShapeType};
use yintu::util::geometry::{ImageSize, NormalizedBox};
use yintu::EngineError;

fn size() -> ImageSize {
    ImageSize::new(800, 600).unwrap()
}

fn click(x: f64, y: f64) -> PointerEvent {
    PointerEvent::Click {
        button: PointerButton::Left,
        pos: Point::new(x, y),
    }
}

/// Draw and label a rectangle from (x0, y0) to (x1, y1).
fn draw_rect<S: AnnotationStorage + LabelVocabulary>(
    session: &mut AnnotationSession<S>,
    corners: (f64, f64, f64, f64),
    label: &str,
) -> ShapeId {
    let (x0, y0, x1, y1) = corners;
    session.set_mode(Mode::DrawRect);
    session.pointer(click(x0, y0), 1.0).unwrap();
    assert_eq!(session.pointer(click(x1, y1), 1.0).unwrap(), InputOutcome::LabelRequested);
    match session.resolve_label(Some(label.to_string())).unwrap() {
        InputOutcome::Committed(id) => id,
        other => panic!("expected commit, got {:?}", other),
    }
}

#[derive(Default)]
struct PlainView {
    shown: BTreeSet<ShapeId>,
}

impl SelectionView for PlainView {
    fn show_selection(&mut self, ids: &BTreeSet<ShapeId>) -> Option<SelectionEvent> {
        self.shown = ids.clone();
        None
    }
}

struct ScriptedDialog(Vec<Option<&'static str>>);

impl LabelDialog for ScriptedDialog {
    fn prompt(&mut self, _existing: &[String]) -> Option<String> {
        self.0.remove(0).map(str::to_string)
    }
}

/// Storage that refuses every write.
#[derive(Default)]
struct ReadOnlyStorage(ProjectData);

impl AnnotationStorage for ReadOnlyStorage {
    fn load_records(&self, image_key: &str) -> Result<Vec<AnnotationRecord>, EngineError> {
        self.0.load_records(image_key)
    }

    fn replace_records(&mut self, image_key: &str, _records: Vec<AnnotationRecord>) -> Result<(), EngineError> {
        Err(EngineError::storage(image_key, "read-only project"))
    }
}

impl LabelVocabulary for ReadOnlyStorage {
    fn labels(&self) -> Vec<String> {
        self.0.labels.clone()
    }

    fn append(&mut self, label: &str) -> Result<(), EngineError> {
        self.0.append(label)
    }
}

/// Detector that waits for the test before answering.
struct GatedDetector {
    gate: Mutex<Receiver<()>>,
    detections: Vec<Detection>,
}

impl GatedDetector {
    fn new(detections: Vec<Detection>) -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = channel();
        let detector = Arc::new(Self {
            gate: Mutex::new(rx),
            detections,
        });
        (detector, tx)
    }
}

impl Detector for GatedDetector {
    fn detect(&self, _image_path: &Path) -> anyhow::Result<Vec<Detection>> {
        self.gate
            .lock()
            .map_err(|_| anyhow::anyhow!("gate poisoned"))?
            .recv()?;
        Ok(self.detections.clone())
    }
}

struct BrokenDetector;

impl Detector for BrokenDetector {
    fn detect(&self, _image_path: &Path) -> anyhow::Result<Vec<Detection>> {
        anyhow::bail!("inference crashed")
    }
}

fn detection(label: &str, confidence: f64) -> Detection {
    Detection {
        label: label.to_string(),
        region: Region::Rect(NormalizedBox {
            x_center: 0.5,
            y_center: 0.5,
            width: 0.2,
            height: 0.2,
        }),
        confidence,
    }
}

fn session_over(data: ProjectData) -> AnnotationSession<ProjectData> {
    AnnotationSession::new(data, &AppConfig::default())
}

#[test]
fn test_save_and_reload_through_project_file() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project.json");

    let mut session = AnnotationSession::new(JsonProjectStorage::open(&project).unwrap(), &AppConfig::default());
    session.open_image("frames/a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (100.0, 100.0, 300.0, 400.0), "car");
    assert_eq!(session.save(SaveTrigger::Explicit).unwrap(), 1);

    let mut reopened = AnnotationSession::new(JsonProjectStorage::open(&project).unwrap(), &AppConfig::default());
    assert_eq!(reopened.open_image("frames/a.jpg", Path::new("a.jpg"), size()).unwrap(), 1);
    let shape = &reopened.store().all()[0];
    let bounds = shape.bounding_box();
    assert_eq!(shape.label, "car");
    assert!((bounds.x - 100.0).abs() <= 1.0 && (bounds.y - 100.0).abs() <= 1.0);
    assert!((bounds.width - 200.0).abs() <= 1.0 && (bounds.height - 300.0).abs() <= 1.0);
    assert_eq!(reopened.labels(), vec!["car"]);
}

#[test]
fn test_navigation_saves_previous_image() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "car");

    assert!(session.begin_image("b.jpg", Path::new("b.jpg")).is_none());
    assert!(session.store().is_empty());
    assert_eq!(session.storage().load_records("a.jpg").unwrap().len(), 1);

    session.finish_image_load(size()).unwrap();
    assert!(session.store().is_empty());
}

#[test]
fn test_failed_silent_save_does_not_block_navigation() {
    let mut session = AnnotationSession::new(ReadOnlyStorage::default(), &AppConfig::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "car");

    let error = session.begin_image("b.jpg", Path::new("b.jpg"));
    assert!(matches!(error, Some(EngineError::Storage { .. })));
    assert_eq!(session.image().map(|i| i.key.as_str()), Some("b.jpg"));

    session.finish_image_load(size()).unwrap();
    assert!(matches!(
        session.save(SaveTrigger::Explicit),
        Err(EngineError::Storage { .. })
    ));
}

#[test]
fn test_input_before_image_is_sized() {
    let mut session = session_over(ProjectData::default());
    assert_eq!(session.pointer(click(1.0, 1.0), 1.0), Err(EngineError::NoImage));

    session.begin_image("a.jpg", Path::new("a.jpg"));
    assert_eq!(session.pointer(click(1.0, 1.0), 1.0), Err(EngineError::GeometryUnavailable));
    assert_eq!(session.save(SaveTrigger::Explicit), Err(EngineError::GeometryUnavailable));
}

#[test]
fn test_failed_image_load_clears_canvas() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "car");

    session.begin_image("missing.jpg", Path::new("missing.jpg"));
    session.abort_image_load(&EngineError::ImageLoad {
        path: PathBuf::from("missing.jpg"),
        message: "not found".to_string(),
    });
    assert!(session.image().is_none());
    assert!(session.store().is_empty());
    assert_eq!(session.storage().load_records("a.jpg").unwrap().len(), 1);
}

/// Project whose `a.jpg` holds a valid rectangle followed by a polygon with too few points.
fn project_with_broken_polygon() -> ProjectData {
    let rect = AnnotationRecord {
        shape_type: ShapeType::Rect,
        label: "car".to_string(),
        x: 0.25,
        y: 0.4,
        w: 0.2,
        h: 0.2,
        points: None,
        confidence: 1.0,
    };
    let lane = AnnotationRecord {
        shape_type: ShapeType::Polygon,
        label: "lane".to_string(),
        points: Some(vec![[0.1, 0.1], [0.2, 0.2]]),
        ..rect.clone()
    };
    let mut data = ProjectData::default();
    data.images.insert("a.jpg".to_string(), vec![rect, lane]);
    data
}

#[test]
fn test_failed_annotation_load_keeps_stored_records() {
    let mut session = session_over(project_with_broken_polygon());
    assert!(matches!(
        session.open_image("a.jpg", Path::new("a.jpg"), size()),
        Err(EngineError::InvalidRecord { .. })
    ));
    assert!(session.annotations_locked());
    assert!(session.store().is_empty());
    assert!(matches!(
        session.pointer(click(10.0, 10.0), 1.0),
        Err(EngineError::Storage { .. })
    ));
    assert!(matches!(
        session.save(SaveTrigger::Explicit),
        Err(EngineError::Storage { .. })
    ));

    assert!(session.begin_image("b.jpg", Path::new("b.jpg")).is_none());
    assert!(!session.annotations_locked());
    assert_eq!(session.storage().load_records("a.jpg").unwrap().len(), 2);
    assert!(session.labels().is_empty());

    session.finish_image_load(size()).unwrap();
    assert!(session.close_image().is_none());
    assert_eq!(session.storage().load_records("a.jpg").unwrap().len(), 2);
}

#[test]
fn test_reload_discards_unsaved_edits() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "car");
    session.save(SaveTrigger::Explicit).unwrap();
    draw_rect(&mut session, (100.0, 100.0, 160.0, 160.0), "car");

    session.storage_mut().images.clear();
    assert_eq!(session.reload_image().unwrap(), 0);
    assert!(session.store().is_empty());
}

#[test]
fn test_polygon_with_synchronous_dialog() {
    let mut session = session_over(ProjectData::new(vec!["lane".to_string()]));
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    session.set_mode(Mode::DrawPolygon);

    let mut dialog = ScriptedDialog(vec![Some("  ")]);
    for (x, y) in [(100.0, 100.0), (200.0, 100.0), (200.0, 200.0), (100.0, 200.0)] {
        session.pointer_with_dialog(click(x, y), 2.0, &mut dialog).unwrap();
    }
    // 4 screen pixels from the first vertex at zoom 2 is within the snap distance.
    let outcome = session.pointer_with_dialog(click(102.0, 101.0), 2.0, &mut dialog).unwrap();
    assert!(matches!(outcome, InputOutcome::Committed(_)));

    let shape = &session.store().all()[0];
    assert_eq!(shape.label, "Object");
    assert_eq!(shape.geometry.outline().len(), 4);
    assert_eq!(session.labels(), vec!["lane", "Object"]);
}

#[test]
fn test_delete_union_of_canvas_and_list_selection() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    let a = draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "car");
    let b = draw_rect(&mut session, (100.0, 100.0, 160.0, 160.0), "car");
    let c = draw_rect(&mut session, (300.0, 300.0, 360.0, 360.0), "person");

    let (mut canvas, mut list) = (PlainView::default(), PlainView::default());
    session.sync_selection(SelectionEvent::list([a, b]), &mut canvas, &mut list);
    assert_eq!(canvas.shown, BTreeSet::from([a, b]));

    assert_eq!(session.delete_selected(&mut canvas, &mut list), 2);
    let remaining: Vec<ShapeId> = session.store().all().iter().map(|s| s.id()).collect();
    assert_eq!(remaining, vec![c]);
    assert!(canvas.shown.is_empty() && list.shown.is_empty());
}

#[test]
fn test_detection_replaces_unsaved_shapes() {
    let mut config = AppConfig::default();
    config.detector.target_classes = vec!["car".to_string()];
    let mut session = AnnotationSession::new(ProjectData::default(), &config);
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "person");

    let (detector, release) = GatedDetector::new(vec![detection("car", 0.75), detection("dog", 0.9)]);
    session.trigger_detection(detector.clone()).unwrap();
    assert!(session.detection_busy());
    assert_eq!(session.trigger_detection(detector), Err(EngineError::DetectionInFlight));
    assert_eq!(session.detections_issued(), 1);

    release.send(()).unwrap();
    assert_eq!(
        session.wait_detection(Duration::from_secs(5)),
        Some(DetectionOutcome::Applied(1))
    );
    let shape = &session.store().all()[0];
    assert_eq!(shape.label, "car");
    assert_eq!(shape.confidence, 0.75);
    assert!(!session.detection_busy());
}

#[test]
fn test_stale_detection_is_discarded() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();

    let (detector, release) = GatedDetector::new(vec![detection("car", 0.9)]);
    session.trigger_detection(detector).unwrap();

    session.open_image("b.jpg", Path::new("b.jpg"), size()).unwrap();
    let kept = draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "person");

    release.send(()).unwrap();
    assert_eq!(
        session.wait_detection(Duration::from_secs(5)),
        Some(DetectionOutcome::Stale {
            image_key: "a.jpg".to_string()
        })
    );
    let ids: Vec<ShapeId> = session.store().all().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![kept]);
    assert!(!session.detection_busy());
}

#[test]
fn test_detector_failure_keeps_store() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "person");

    session.trigger_detection(Arc::new(BrokenDetector)).unwrap();
    assert_eq!(
        session.wait_detection(Duration::from_secs(5)),
        Some(DetectionOutcome::Failed(EngineError::Detector("inference crashed".to_string())))
    );
    assert_eq!(session.store().len(), 1);
    assert!(!session.detection_busy());
}

#[test]
fn test_undo_and_escape() {
    let mut session = session_over(ProjectData::default());
    session.open_image("a.jpg", Path::new("a.jpg"), size()).unwrap();
    let first = draw_rect(&mut session, (10.0, 10.0, 60.0, 60.0), "car");
    let second = draw_rect(&mut session, (100.0, 100.0, 160.0, 160.0), "car");

    assert_eq!(session.undo_last(), InputOutcome::Undone(second));

    session.pointer(click(5.0, 5.0), 1.0).unwrap();
    assert_eq!(session.cancel(), InputOutcome::PreviewChanged);
    assert_eq!(session.store().len(), 1);
    assert_eq!(session.store().all()[0].id(), first);
}
