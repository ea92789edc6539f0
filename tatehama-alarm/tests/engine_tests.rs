//! Alarm engine integration tests
//!
//! Run the real reconciliation loop on a headless device with a short tick.

mod helpers;

use helpers::{add_sound, headless, station_th65, th65_sounds};
use std::sync::Arc;
use std::time::Duration;
use tatehama_alarm::audio::{HeadlessDevice, LOOP_INFINITE};
use tatehama_alarm::{AlarmEngine, EngineConfig, PlayOutcome, StopAlarmOutcome};
use tatehama_common::{ActiveAlarm, ConsoleState, Side};
use tempfile::TempDir;
use tokio::time::{sleep, Instant};

const TICK: Duration = Duration::from_millis(10);

struct Fixture {
    folder: TempDir,
    device: Arc<HeadlessDevice>,
    state: Arc<ConsoleState>,
    engine: AlarmEngine,
}

fn start_engine() -> Fixture {
    let folder = th65_sounds();
    let (device, dyn_device) = headless();
    let state = Arc::new(ConsoleState::with_stations(vec![station_th65()]));
    let config = EngineConfig {
        sound_folder: folder.path().to_path_buf(),
        tick_interval: TICK,
        master_volume: 1.0,
    };
    let engine = AlarmEngine::start(dyn_device, Arc::clone(&state), config).unwrap();

    Fixture {
        folder,
        device,
        state,
        engine,
    }
}

/// Poll until `check` holds, failing after a generous timeout
async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        sleep(TICK / 2).await;
    }
}

fn volume(fixture: &Fixture, name: &str) -> f32 {
    fixture.engine.effective_volume(name).unwrap()
}

#[tokio::test]
async fn test_loop_sounds_start_muted() {
    let f = start_engine();

    for name in ["approach_a_loop", "approach_b_loop"] {
        let status = f.engine.voice_status(name).unwrap();
        assert!(status.running, "{}", name);
        assert_eq!(status.buffers_queued, 1);
        assert_eq!(status.loop_count, LOOP_INFINITE);
        assert_eq!(status.volume, 0.0);
    }
    // Base alarm names and other sounds stay idle
    for name in ["approach_a", "approach_b", "chime"] {
        assert_eq!(f.engine.voice_status(name).unwrap().buffers_queued, 0, "{}", name);
    }

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_pulsed_alarm_follows_blink_flag() {
    let f = start_engine();
    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Up));

    f.state.set_blink_flag(true);
    wait_until("pulse on", || volume(&f, "approach_a_loop") == 1.0).await;

    f.state.set_blink_flag(false);
    wait_until("pulse off", || volume(&f, "approach_a_loop") == 0.0).await;

    f.state.set_blink_flag(true);
    wait_until("pulse on again", || volume(&f, "approach_a_loop") == 1.0).await;

    // Pulsing only changes volume; the loop voice is never resubmitted
    assert_eq!(f.engine.voice_status("approach_a_loop").unwrap().buffers_queued, 1);
    assert_eq!(volume(&f, "approach_b_loop"), 0.0);

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_continuous_alarm_ignores_blink_flag() {
    let f = start_engine();
    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Down));
    wait_until("continuous on", || volume(&f, "approach_b_loop") == 1.0).await;

    for _ in 0..6 {
        f.state.toggle_blink_flag();
        sleep(TICK * 2).await;
        assert_eq!(volume(&f, "approach_b_loop"), 1.0);
    }

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_alarm_volume_scaled_by_master() {
    let f = start_engine();
    f.engine.set_master_volume(0.5);
    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Down));

    wait_until("scaled alarm", || volume(&f, "approach_b_loop") == 0.5).await;
    assert_eq!(f.engine.asset_volume("approach_b_loop"), Some(1.0));

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_unconfigured_station_is_skipped() {
    let f = start_engine();
    f.state.add_active_alarm(ActiveAlarm::new("TH99", Side::Up));
    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Down));

    wait_until("configured alarm", || volume(&f, "approach_b_loop") == 1.0).await;
    assert_eq!(volume(&f, "approach_a_loop"), 0.0);

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_clearing_down_side_plays_up_side_cue() {
    let f = start_engine();
    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Down));
    wait_until("alarm on", || volume(&f, "approach_b_loop") == 1.0).await;

    f.state.remove_active_alarm("TH65", Side::Down);
    let outcome = f.engine.loop_sound_all_stop("TH65", Side::Down).unwrap();

    assert_eq!(outcome, StopAlarmOutcome::Cleared(PlayOutcome::Played));
    assert_eq!(volume(&f, "approach_b_loop"), 0.0);

    // The cue is the up-side base sound, once, even for the down side
    let cue = f.engine.voice_status("approach_a").unwrap();
    assert_eq!(cue.buffers_queued, 1);
    assert_eq!(cue.loop_count, 0);
    assert_eq!(cue.volume, 1.0);
    assert_eq!(f.engine.voice_status("approach_b").unwrap().buffers_queued, 0);

    sleep(TICK * 3).await;
    assert_eq!(volume(&f, "approach_b_loop"), 0.0);
    // Loop voice is muted, not stopped
    assert!(f.engine.voice_status("approach_b_loop").unwrap().running);

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_clearing_unknown_station_changes_nothing() {
    let f = start_engine();

    let outcome = f.engine.loop_sound_all_stop("TH99", Side::Up).unwrap();
    assert_eq!(outcome, StopAlarmOutcome::UnknownStation);
    assert_eq!(f.engine.voice_status("approach_a").unwrap().buffers_queued, 0);

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_reload_while_running() {
    let f = start_engine();
    let before = f.engine.sound_names().len();

    add_sound(f.folder.path(), "approach_c_loop");
    let report = f.engine.load_sound_files().unwrap();
    assert_eq!(report.released, before);
    assert_eq!(report.loaded, before + 1);

    assert_eq!(f.engine.loop_sound_all_play(), 3);
    assert_eq!(f.device.live_voices(), before + 1);

    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Down));
    wait_until("alarm after reload", || volume(&f, "approach_b_loop") == 1.0).await;

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_async_reload_restarts_loops() {
    let f = start_engine();
    add_sound(f.folder.path(), "approach_c_loop");

    let (report, started) = f.engine.reload().await.unwrap();
    assert_eq!(report.released, 5);
    assert_eq!(report.loaded, 6);
    assert_eq!(started, 3);
    assert_eq!(f.device.live_voices(), 6);

    let status = f.engine.voice_status("approach_c_loop").unwrap();
    assert_eq!(status.buffers_queued, 1);
    assert_eq!(status.volume, 0.0);

    f.state.add_active_alarm(ActiveAlarm::new("TH65", Side::Up));
    f.state.set_blink_flag(true);
    wait_until("alarm after async reload", || volume(&f, "approach_a_loop") == 1.0).await;

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_async_reload_of_missing_folder_empties_catalog() {
    let f = start_engine();
    std::fs::remove_dir_all(f.folder.path()).unwrap();

    assert!(f.engine.reload().await.is_err());
    assert!(f.engine.sound_names().is_empty());
    assert_eq!(f.device.live_voices(), 0);

    f.engine.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_releases_all_voices() {
    let f = start_engine();
    assert_eq!(f.device.live_voices(), 5);

    f.engine.shutdown().await;
    assert!(f.engine.is_shut_down());
    assert_eq!(f.device.live_voices(), 0);
    assert_eq!(f.device.voices_released(), f.device.voices_created());

    f.engine.shutdown().await;
    assert!(f.engine.sound_names().is_empty());
}
