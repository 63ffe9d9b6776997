//! End-to-end engine flows: register, bind, run, dispatch, persist

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{GrayImage, Luma, Rgb, RgbImage};
use kinesics::core::RegistrationState;
use kinesics::gestures::StorePaths;
use kinesics::vision::{FnExtractor, FrameSequenceCapture, GrayscaleExtractor};
use kinesics::{
    Action, ActionSink, CaptureMode, EngineConfig, Feature, FeatureKind, Frame, GestureEngine,
    GestureError, LandmarkVector, LogSink, Result, SmoothingPolicy, TickOutcome,
};
use parking_lot::Mutex;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type Seen = Arc<Mutex<Vec<Action>>>;

fn recording_sink() -> (Box<dyn ActionSink>, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink = move |action: &Action| -> Result<()> {
        sink_seen.lock().push(action.clone());
        Ok(())
    };
    (Box::new(sink), seen)
}

/// Extractor that reports whatever landmarks the test puts in the slot
fn slot_extractor(
    slot: Arc<Mutex<Option<LandmarkVector>>>,
) -> FnExtractor<impl FnMut(&Frame) -> Option<Feature> + Send> {
    FnExtractor::new(FeatureKind::Landmarks, move |_: &Frame| {
        slot.lock().clone().map(Feature::Landmarks)
    })
}

/// Diagonal gradient scene, optionally with a bright square held up in it
fn scene(with_hand: bool) -> RgbImage {
    RgbImage::from_fn(32, 32, |x, y| {
        if with_hand && (8..16).contains(&x) && (8..16).contains(&y) {
            Rgb([255, 255, 255])
        } else {
            let v = (60 + x + y) as u8;
            Rgb([v, v, v])
        }
    })
}

/// 21-point hand with the given fingertips, everything else at the palm
fn hand(thumb: [f32; 2], index: [f32; 2], middle: [f32; 2], ring: [f32; 2]) -> LandmarkVector {
    let mut points = [[0.5, 0.5, 0.0]; 21];
    points[4] = [thumb[0], thumb[1], 0.0];
    points[8] = [index[0], index[1], 0.0];
    points[12] = [middle[0], middle[1], 0.0];
    points[16] = [ring[0], ring[1], 0.0];
    LandmarkVector::from_points(&points)
}

#[test]
fn test_template_register_and_fire() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::template()
        .with_storage(StorePaths::under(dir.path()))
        .with_registration(CaptureMode::Burst {
            sequence_length: 2,
            repetitions: 2,
        });
    let (sink, seen) = recording_sink();
    let mut engine = GestureEngine::new(config, Box::new(GrayscaleExtractor::new()), sink).unwrap();

    let gesture = Frame::new(scene(true));
    engine.begin_registration().unwrap();
    for _ in 0..4 {
        engine.on_tick(&gesture);
    }
    assert_eq!(engine.registration_state(), RegistrationState::AwaitingBinding);
    assert_eq!(engine.bind_action("space").unwrap(), 0);
    assert_eq!(engine.status(), "Gesture 1 assigned to key 'SPACE'!");
    assert!(dir.path().join("gestures").join("gesture_0.png").exists());
    assert!(engine.proceed());

    engine.start_running();
    assert_eq!(engine.status(), "Gesture detection started!");

    let blank = Frame::new(RgbImage::new(32, 32));
    assert_eq!(engine.on_tick(&blank).fired(), None);
    // same background with the hand missing
    let empty_scene = Frame::new(scene(false));
    assert_eq!(engine.on_tick(&empty_scene).fired(), None);
    let gray = Frame::new(RgbImage::from_pixel(32, 32, Rgb([128, 128, 128])));
    assert_eq!(engine.on_tick(&gray).fired(), None);
    assert!(seen.lock().is_empty());

    let t0 = Instant::now();
    let outcome = engine.on_tick_at(&gesture, t0);
    assert_eq!(outcome.fired(), Some(&Action::key("SPACE")));
    // same gesture inside the 500 ms cooldown
    assert_eq!(engine.on_tick_at(&gesture, t0 + Duration::from_millis(200)).fired(), None);
    assert_eq!(
        engine
            .on_tick_at(&gesture, t0 + Duration::from_millis(600))
            .fired(),
        Some(&Action::key("SPACE"))
    );
    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn test_landmark_gestures_persist() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let slot = Arc::new(Mutex::new(None));
    let config = EngineConfig::landmark().with_storage(StorePaths::under(dir.path()));
    let frame = Frame::new(RgbImage::new(4, 4));

    {
        let extractor = Box::new(slot_extractor(slot.clone()));
        let mut engine = GestureEngine::new(config.clone(), extractor, Box::new(LogSink)).unwrap();
        for (label, values) in [("a", vec![1.0, 0.0, 0.0]), ("b", vec![0.0, 1.0, 0.0])] {
            *slot.lock() = Some(LandmarkVector::new(values));
            engine.begin_registration().unwrap();
            engine.on_tick(&frame);
            engine.bind_action(label).unwrap();
            engine.proceed();
        }
    }

    let table = std::fs::read_to_string(dir.path().join("gesture_key_mapping.json")).unwrap();
    let table: serde_json::Value = serde_json::from_str(&table).unwrap();
    assert_eq!(table, serde_json::json!({"0": "A", "1": "B"}));

    let (sink, seen) = recording_sink();
    let extractor = Box::new(slot_extractor(slot.clone()));
    let mut engine = GestureEngine::new(config, extractor, sink).unwrap();
    assert_eq!(engine.status(), "Loaded existing gestures.");
    assert_eq!(engine.store().ids(), vec![0, 1]);

    // five consecutive frames confirm a landmark gesture
    engine.start_running();
    *slot.lock() = Some(LandmarkVector::new(vec![0.1, 0.9, 0.0]));
    let fired: Vec<bool> = (0..5)
        .map(|_| engine.on_tick(&frame).fired().is_some())
        .collect();
    assert_eq!(fired, vec![false, false, false, false, true]);
    assert_eq!(seen.lock().as_slice(), &[Action::key("B")]);
}

#[test]
fn test_registration_excludes_matching() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let slot = Arc::new(Mutex::new(Some(LandmarkVector::new(vec![1.0, 0.0, 0.0]))));
    let config = EngineConfig::landmark()
        .with_storage(StorePaths::under(dir.path()))
        .with_smoothing(SmoothingPolicy::Immediate);
    let (sink, seen) = recording_sink();
    let extractor = Box::new(slot_extractor(slot.clone()));
    let mut engine = GestureEngine::new(config, extractor, sink).unwrap();
    let frame = Frame::new(RgbImage::new(4, 4));

    engine.begin_registration().unwrap();
    engine.on_tick(&frame);
    engine.bind_action("a").unwrap();
    engine.proceed();
    engine.start_running();

    engine.begin_registration().unwrap();
    assert!(matches!(
        engine.begin_registration(),
        Err(GestureError::RegistrationInProgress)
    ));
    for _ in 0..3 {
        engine.on_tick(&frame);
    }
    assert!(seen.lock().is_empty());
    assert!(engine.cancel_binding());
    assert_eq!(engine.store().len(), 1);

    assert!(engine.on_tick(&frame).fired().is_some());
}

#[test]
fn test_reset_then_register_from_zero() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let slot = Arc::new(Mutex::new(Some(LandmarkVector::new(vec![0.0, 0.0, 1.0]))));
    let config = EngineConfig::landmark().with_storage(StorePaths::under(dir.path()));
    let mut engine =
        GestureEngine::new(config, Box::new(slot_extractor(slot)), Box::new(LogSink)).unwrap();
    let frame = Frame::new(RgbImage::new(4, 4));

    for label in ["x", "y"] {
        engine.begin_registration().unwrap();
        engine.on_tick(&frame);
        engine.bind_action(label).unwrap();
        engine.proceed();
    }
    engine.reset().unwrap();
    engine.reset().unwrap();
    assert!(engine.store().is_empty());
    assert!(!dir.path().join("gesture_key_mapping.json").exists());
    assert!(!dir.path().join("gestures").join("gesture_0.json").exists());

    engine.begin_registration().unwrap();
    engine.on_tick(&frame);
    assert_eq!(engine.bind_action("z").unwrap(), 0);
}

#[test]
fn test_corrupt_table_starts_empty() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gesture_key_mapping.json"), "{not json").unwrap();

    let config = EngineConfig::landmark().with_storage(StorePaths::under(dir.path()));
    let slot = Arc::new(Mutex::new(Some(LandmarkVector::new(vec![1.0, 1.0, 1.0]))));
    let mut engine =
        GestureEngine::new(config, Box::new(slot_extractor(slot)), Box::new(LogSink)).unwrap();
    assert_eq!(
        engine.status(),
        "Saved gestures could not be read. Starting with none."
    );
    assert!(engine.store().is_empty());

    engine.begin_registration().unwrap();
    engine.on_tick(&Frame::new(RgbImage::new(4, 4)));
    assert_eq!(engine.bind_action("q").unwrap(), 0);
}

#[test]
fn test_rules_click_and_cursor() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let slot = Arc::new(Mutex::new(None));
    let config = EngineConfig::rules().with_storage(StorePaths::under(dir.path()));
    let (sink, seen) = recording_sink();
    let extractor = Box::new(slot_extractor(slot.clone()));
    let mut engine = GestureEngine::new(config, extractor, sink).unwrap();
    engine.start_running();
    let frame = Frame::new(RgbImage::new(640, 480));
    let t0 = Instant::now();

    *slot.lock() = Some(hand([0.3, 0.3], [0.31, 0.3], [0.5, 0.5], [0.5, 0.5]));
    assert_eq!(engine.on_tick_at(&frame, t0).fired(), Some(&Action::Click));
    assert_eq!(engine.confidence_text(), "Confidence: 1.00 - Key: click");
    // zero cooldown still needs time to pass
    assert_eq!(engine.on_tick_at(&frame, t0).fired(), None);

    *slot.lock() = Some(hand([0.1, 0.1], [0.6, 0.4], [0.5, 0.5], [0.5, 0.5]));
    let outcome = engine.on_tick_at(&frame, t0 + Duration::from_millis(1));
    assert_eq!(outcome.fired(), Some(&Action::MoveCursor { x: 384, y: 192 }));

    *slot.lock() = None;
    assert_eq!(engine.on_tick_at(&frame, t0 + Duration::from_millis(2)).fired(), None);
    assert_eq!(engine.confidence_text(), "No hand detected. Confidence: N/A");
    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn test_replay_source_drives_engine() {
    init_logging();
    let frames = tempfile::tempdir().unwrap();
    let gray = GrayImage::from_fn(24, 24, |x, y| Luma([((x * 7 + y * 3) % 200 + 20) as u8]));
    for name in ["000.png", "001.png"] {
        gray.save(frames.path().join(name)).unwrap();
    }
    let mut source = FrameSequenceCapture::from_directory(frames.path(), false).unwrap();

    let store = tempfile::tempdir().unwrap();
    let config = EngineConfig::template()
        .with_storage(StorePaths::under(store.path()))
        .with_registration(CaptureMode::Single);
    let (sink, seen) = recording_sink();
    let mut engine = GestureEngine::new(config, Box::new(GrayscaleExtractor::new()), sink).unwrap();

    engine.begin_registration().unwrap();
    engine.poll(&mut source);
    assert_eq!(engine.poll(&mut source), TickOutcome::Paused);
    engine.bind_action("enter").unwrap();
    engine.proceed();
    engine.start_running();

    assert_eq!(engine.poll(&mut source).fired(), Some(&Action::key("ENTER")));
    assert_eq!(engine.poll(&mut source), TickOutcome::Skipped);
    assert!(engine.status().starts_with("Camera frame unavailable"));
    assert_eq!(seen.lock().len(), 1);
}
