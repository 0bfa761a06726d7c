//! Capture session lifecycle against the mock backend

use camera_capture::mock::{MockFaults, MockRig};
use camera_capture::{
    CaptureConfig, CaptureError, CaptureSession, EncoderSettings, FpsRange, PreviewTarget,
    ProfileQuality, RecordCallback, Resolution, SessionState, StopOutcome,
};
use camera_mode::{OperatingMode, OperatingPolicy};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Started,
    Stopped(PathBuf),
}

#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

impl RecordCallback for EventLog {
    fn on_record_started(&self) {
        self.0.lock().unwrap().push(Event::Started);
    }

    fn on_record_stopped(&self, output: &Path) {
        self.0.lock().unwrap().push(Event::Stopped(output.to_path_buf()));
    }
}

fn full_policy() -> OperatingPolicy {
    OperatingPolicy::for_mode(OperatingMode::Full, true)
}

fn limited_policy() -> OperatingPolicy {
    OperatingPolicy::for_mode(OperatingMode::Limited, false)
}

fn session(rig: &MockRig, policy: OperatingPolicy) -> CaptureSession<MockRig, MockRig> {
    CaptureSession::new(0, policy, rig.clone(), rig.clone())
}

struct Fixture {
    dir: TempDir,
    rig: MockRig,
    log: EventLog,
}

impl Fixture {
    fn new(rig: MockRig) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            rig,
            log: EventLog::default(),
        }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("front_0001.mp4")
    }

    fn prepare(&self, session: &mut CaptureSession<MockRig, MockRig>) -> Result<(), CaptureError> {
        session.prepare(
            Some(PreviewTarget("front".to_string())),
            self.output(),
            Box::new(self.log.clone()),
        )
    }
}

#[test]
fn test_record_end_to_end() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());

    fx.prepare(&mut session).unwrap();
    assert_eq!(session.state(), SessionState::Prepared);
    assert!(fx.rig.ledger().previewing);

    session.start().unwrap();
    assert!(session.is_recording());
    assert!(fx.rig.ledger().unlocked);

    let outcome = session.stop();
    assert_eq!(outcome, StopOutcome::Saved(fx.output()));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        fx.log.events(),
        vec![Event::Started, Event::Stopped(fx.output())]
    );

    let size = std::fs::metadata(fx.output()).unwrap().len();
    assert!(size > 0);

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.open_devices, 0);
    assert_eq!(ledger.open_recorders, 0);
    assert!(!ledger.previewing);
    assert!(!ledger.unlocked);
}

#[test]
fn test_stop_twice_is_noop() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    assert!(matches!(session.stop(), StopOutcome::Saved(_)));
    assert_eq!(session.stop(), StopOutcome::NotRecording);
    assert_eq!(fx.log.events().len(), 2);
}

#[test]
fn test_stop_on_idle_session() {
    let rig = MockRig::new();
    let mut session = session(&rig, full_policy());
    assert_eq!(session.stop(), StopOutcome::NotRecording);
    assert_eq!(rig.ledger().open_calls, 0);
}

#[test]
fn test_failed_stop_discards_artifact() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();
    assert!(fx.output().exists());

    fx.rig.update_faults(|f| f.recorder_stop = true);
    assert_eq!(session.stop(), StopOutcome::Discarded);

    assert!(!fx.output().exists());
    assert_eq!(fx.log.events(), vec![Event::Started]);
    assert_eq!(session.state(), SessionState::Idle);

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.open_devices, 0);
    assert_eq!(ledger.open_recorders, 0);
}

#[test]
fn test_start_while_idle_fails_without_opening() {
    let rig = MockRig::new();
    let mut session = session(&rig, full_policy());

    assert!(matches!(session.start(), Err(CaptureError::NotPrepared)));

    let ledger = rig.ledger();
    assert_eq!(ledger.open_calls, 0);
    assert_eq!(ledger.open_recorders, 0);
}

#[test]
fn test_open_failure_leaves_session_idle() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        open: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());

    let err = fx.prepare(&mut session).unwrap_err();
    assert!(matches!(err, CaptureError::DeviceUnavailable { camera_id: 0, .. }));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(fx.rig.ledger().open_devices, 0);
}

#[test]
fn test_format_failure_releases_device() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        preview_size: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());

    assert!(matches!(fx.prepare(&mut session), Err(CaptureError::Format(_))));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(fx.rig.ledger().open_devices, 0);
    assert!(session.geometry().is_none());
}

#[test]
fn test_preview_failure_releases_device() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        start_preview: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());

    assert!(matches!(fx.prepare(&mut session), Err(CaptureError::Preview(_))));
    assert_eq!(fx.rig.ledger().open_devices, 0);
}

#[test]
fn test_rejected_preferences_are_not_fatal() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        focus: true,
        scene: true,
        orientation: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());

    fx.prepare(&mut session).unwrap();
    assert_eq!(session.state(), SessionState::Prepared);

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.focus_mode, None);
    assert_eq!(ledger.orientation, None);
    assert!(ledger.previewing);
}

#[test]
fn test_preferences_applied() {
    let fx = Fixture::new(MockRig::new());
    let mut session =
        session(&fx.rig, full_policy()).with_config(CaptureConfig {
            display_orientation: 180,
            ..Default::default()
        });
    fx.prepare(&mut session).unwrap();

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.focus_mode, Some(camera_capture::FocusMode::ContinuousVideo));
    assert_eq!(ledger.scene_mode, Some(camera_capture::SceneMode::Auto));
    assert_eq!(ledger.orientation, Some(180));
    assert_eq!(ledger.preview_target, Some(PreviewTarget("front".to_string())));
}

#[test]
fn test_prepare_twice_rejected() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();

    assert!(matches!(fx.prepare(&mut session), Err(CaptureError::AlreadyPrepared)));
    assert_eq!(fx.rig.ledger().open_devices, 1);
}

#[test]
fn test_geometry_bounded_by_policy() {
    let fx = Fixture::new(MockRig::new());

    let mut full = session(&fx.rig, full_policy());
    fx.prepare(&mut full).unwrap();
    let geometry = full.geometry().unwrap();
    assert_eq!(geometry.preview_size, Some(Resolution::new(1920, 1080)));
    assert_eq!(geometry.video_size, Some(Resolution::new(1920, 1080)));
    assert_eq!(geometry.fps_range, Some(FpsRange::new(15000, 30000)));
    full.release();

    let mut limited = session(&fx.rig, limited_policy());
    fx.prepare(&mut limited).unwrap();
    let geometry = limited.geometry().unwrap();
    assert_eq!(geometry.preview_size, Some(Resolution::new(1280, 720)));
    assert_eq!(geometry.fps_range, Some(FpsRange::new(15000, 15000)));
    assert_eq!(fx.rig.ledger().preview_size, Some(Resolution::new(1280, 720)));
}

#[test]
fn test_start_twice_is_noop() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();

    session.start().unwrap();
    session.start().unwrap();

    assert_eq!(fx.log.events(), vec![Event::Started]);
    assert_eq!(fx.rig.ledger().open_recorders, 1);
}

#[test]
fn test_start_failure_requires_release() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        recorder_start: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();

    assert!(matches!(session.start(), Err(CaptureError::StartFailed(_))));
    assert_eq!(session.state(), SessionState::Prepared);
    assert!(!session.is_recording());
    assert!(fx.log.events().is_empty());
    assert_eq!(fx.rig.ledger().open_recorders, 0);

    // Clearing the fault is not enough: the session must be re-prepared
    fx.rig.update_faults(|f| f.recorder_start = false);
    assert!(matches!(session.start(), Err(CaptureError::StartFailed(_))));
    assert_eq!(fx.rig.ledger().open_recorders, 0);

    session.release();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(fx.rig.ledger().open_devices, 0);
    assert!(!fx.rig.ledger().unlocked);

    fx.prepare(&mut session).unwrap();
    session.start().unwrap();
    assert!(session.is_recording());
}

#[test]
fn test_recorder_prepare_failure_tears_down_recorder() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        recorder_prepare: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();

    assert!(matches!(session.start(), Err(CaptureError::StartFailed(_))));
    assert_eq!(fx.rig.ledger().open_recorders, 0);
    assert_eq!(fx.rig.ledger().open_devices, 1);
}

#[test]
fn test_unlock_failure_keeps_session_usable() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        unlock: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();

    assert!(matches!(session.start(), Err(CaptureError::StartFailed(_))));
    assert_eq!(fx.rig.ledger().open_recorders, 0);

    fx.rig.update_faults(|f| f.unlock = false);
    session.start().unwrap();
    assert!(session.is_recording());
}

#[test]
fn test_recorder_creation_failure() {
    let fx = Fixture::new(MockRig::new().with_faults(MockFaults {
        create_recorder: true,
        ..Default::default()
    }));
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();

    assert!(matches!(session.start(), Err(CaptureError::StartFailed(_))));
    assert_eq!(session.state(), SessionState::Prepared);
    assert!(!fx.rig.ledger().unlocked);
}

#[test]
fn test_profile_frame_rate_clamped_to_ceiling() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, limited_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    let config = fx.rig.ledger().last_config.unwrap();
    match config.encoding {
        EncoderSettings::Profile(profile) => {
            assert_eq!(profile.quality, ProfileQuality::Hd720);
            assert_eq!(profile.frame_rate, 20);
        }
        other => panic!("expected profile, got {:?}", other),
    }
    assert!(config.record_audio);
    assert_eq!(config.output, fx.output());
    assert_eq!(config.preview, Some(PreviewTarget("front".to_string())));
}

#[test]
fn test_profile_preference_order() {
    let rig = MockRig::new().with_profiles(vec![
        MockRig::profile(ProfileQuality::Low, Resolution::new(176, 144), 15),
        MockRig::profile(ProfileQuality::Sd480, Resolution::new(720, 480), 30),
    ]);
    let fx = Fixture::new(rig);
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    match fx.rig.ledger().last_config.unwrap().encoding {
        EncoderSettings::Profile(profile) => {
            assert_eq!(profile.quality, ProfileQuality::Sd480);
            assert_eq!(profile.frame_rate, 30);
        }
        other => panic!("expected profile, got {:?}", other),
    }
}

#[test]
fn test_manual_encoding_without_profiles() {
    let fx = Fixture::new(MockRig::new().with_profiles(Vec::new()));
    let mut session = session(&fx.rig, limited_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    match fx.rig.ledger().last_config.unwrap().encoding {
        EncoderSettings::Manual(manual) => {
            assert_eq!(manual.size, Resolution::new(1280, 720));
            assert_eq!(manual.frame_rate, 20);
            assert_eq!(manual.video_bitrate, 4_000_000);
        }
        other => panic!("expected manual settings, got {:?}", other),
    }
}

#[test]
fn test_silent_config_without_preview() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy()).with_config(CaptureConfig {
        record_audio: false,
        preview_enabled: false,
        ..Default::default()
    });
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.preview_target, None);
    let config = ledger.last_config.unwrap();
    assert!(!config.record_audio);
    assert_eq!(config.preview, None);
}

#[test]
fn test_release_from_any_state() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());

    session.release();
    assert_eq!(session.state(), SessionState::Idle);

    fx.prepare(&mut session).unwrap();
    session.release();
    session.release();
    assert_eq!(fx.rig.ledger().open_devices, 0);
    assert!(fx.log.events().is_empty());
}

#[test]
fn test_release_while_recording_stops_first() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    session.release();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        fx.log.events(),
        vec![Event::Started, Event::Stopped(fx.output())]
    );

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.open_devices, 0);
    assert_eq!(ledger.open_recorders, 0);
}

#[test]
fn test_recorder_keeping_camera_still_closes_it() {
    let fx = Fixture::new(MockRig::new());
    let mut session = session(&fx.rig, full_policy());
    fx.prepare(&mut session).unwrap();
    session.start().unwrap();

    fx.rig.update_faults(|f| f.keep_camera = true);
    assert!(matches!(session.stop(), StopOutcome::Saved(_)));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(fx.rig.ledger().open_devices, 0);
}

#[test]
fn test_drop_releases_handles() {
    let fx = Fixture::new(MockRig::new());
    {
        let mut session = session(&fx.rig, full_policy());
        fx.prepare(&mut session).unwrap();
        session.start().unwrap();
    }

    let ledger = fx.rig.ledger();
    assert_eq!(ledger.open_devices, 0);
    assert_eq!(ledger.open_recorders, 0);
    assert_eq!(fx.log.events().len(), 2);
}

#[test]
fn test_independent_sessions_share_policy() {
    let policy = full_policy();
    let dir = tempfile::tempdir().unwrap();

    let handles: Vec<_> = (0..policy.max_camera_count as u32)
        .map(|camera_id| {
            let output = dir.path().join(format!("cam{}.mp4", camera_id));
            std::thread::spawn(move || {
                let rig = MockRig::new();
                let mut session = CaptureSession::new(camera_id, policy, rig.clone(), rig);
                session.prepare(None, output, Box::new(())).unwrap();
                session.start().unwrap();
                session.stop()
            })
        })
        .collect();

    for handle in handles {
        assert!(matches!(handle.join().unwrap(), StopOutcome::Saved(_)));
    }
}
