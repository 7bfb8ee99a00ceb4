//! Persisted-record tests: store round trip, corruption handling, write
//! rate limiting and resume-at-boot.

use crate::mock_hw::{FakeClock, MemoryRecordStore, MockHardware, RecordingSink};

use pumpguard::app::commands::Command;
use pumpguard::app::events::ControllerEvent;
use pumpguard::app::ports::{RecordStore, StorageError};
use pumpguard::app::service::PumpController;
use pumpguard::clock::HourMinute;
use pumpguard::config::ControllerConfig;
use pumpguard::modes::ModeKind;
use pumpguard::persist::{PersistedRecord, RECORD_LEN, RecordError, checksum};

fn controller() -> (PumpController, MockHardware, FakeClock, RecordingSink) {
    let mut ctl = PumpController::new(ControllerConfig::default());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    ctl.start(&mut hw, &mut sink);
    (ctl, hw, FakeClock::new(), sink)
}

fn send(
    ctl: &mut PumpController,
    line: &str,
    clock: &FakeClock,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
) {
    let cmd = line.parse::<Command>().expect("valid command");
    ctl.handle_command(cmd, clock, hw, sink);
}

fn read_back(store: &mut MemoryRecordStore) -> Result<PersistedRecord, StorageError> {
    let mut raw = [0u8; RECORD_LEN];
    let n = store.read_record(&mut raw)?;
    Ok(PersistedRecord::decode(&raw[..n])?)
}

#[test]
fn settings_survive_a_power_cycle() {
    let (mut ctl, mut hw, clock, mut sink) = controller();
    let mut store = MemoryRecordStore::default();
    send(&mut ctl, "TWIST_SET:45,90,6,0,18,0", &clock, &mut hw, &mut sink);
    send(&mut ctl, "COUNTDOWN_START:7", &clock, &mut hw, &mut sink);
    send(&mut ctl, "TIMER_SET:0,6,30,7,0", &clock, &mut hw, &mut sink);
    send(&mut ctl, "TIMER_START", &clock, &mut hw, &mut sink);
    assert!(ctl.persist_if_needed(0, &mut store));

    let record = read_back(&mut store).expect("stored record");
    assert_eq!(record.mode, ModeKind::Timer);
    assert_eq!(record.countdown_minutes, 7);
    assert_eq!((record.twist_on_secs, record.twist_off_secs), (45, 90));

    // Reboot inside the slot: timer resumes and runs.
    let (mut rebooted, mut hw2, clock2, mut sink2) = controller();
    clock2.set_time(6, 45);
    rebooted.restore(&record, &clock2, &mut hw2, &mut sink2);
    assert_eq!(rebooted.mode_kind(), ModeKind::Timer);
    assert!(rebooted.motor_on());
    assert!(hw2.relay_on());
    assert_eq!(rebooted.countdown_minutes(), 7);
    assert_eq!(rebooted.twist_settings().on_secs, 45);
    let slot = rebooted.schedule().slot(0).copied().expect("slot 0");
    assert!(slot.enabled);
    assert_eq!(slot.on, HourMinute::new(6, 30));
    assert!(sink2.contains(&ControllerEvent::Restored(ModeKind::Timer)));
}

#[test]
fn running_modes_come_back_idle() {
    for mode in [ModeKind::Manual, ModeKind::Countdown, ModeKind::Auto] {
        let record = PersistedRecord {
            mode,
            motor_on: true,
            ..PersistedRecord::default()
        };
        let (mut ctl, mut hw, clock, mut sink) = controller();
        ctl.restore(&record, &clock, &mut hw, &mut sink);
        assert_eq!(ctl.mode_kind(), ModeKind::Idle, "{mode}");
        assert!(!ctl.motor_on());
        assert!(!hw.relay_on());
    }
}

#[test]
fn semi_auto_resumes_against_the_real_tank_level() {
    let record = PersistedRecord {
        mode: ModeKind::SemiAuto,
        motor_on: true,
        ..PersistedRecord::default()
    };

    // Full tank at boot: semi-auto comes back but the motor stays off.
    let (mut ctl, mut hw, clock, mut sink) = controller();
    hw.set_tank_probes(5);
    ctl.restore(&record, &clock, &mut hw, &mut sink);
    assert_eq!(ctl.mode_kind(), ModeKind::SemiAuto);
    assert!(!ctl.motor_on());
    assert!(!hw.relay_on());
    for _ in 0..10 {
        clock.advance(50);
        ctl.process(&clock, &mut hw, &mut sink);
        assert!(!hw.relay_on());
    }

    // Low tank at boot: it runs.
    let (mut ctl, mut hw, clock, mut sink) = controller();
    hw.set_tank_probes(1);
    ctl.restore(&record, &clock, &mut hw, &mut sink);
    assert_eq!(ctl.mode_kind(), ModeKind::SemiAuto);
    assert!(ctl.motor_on());
    assert!(hw.relay_on());
}

#[test]
fn corrupted_record_leaves_target_untouched() {
    let (mut ctl, mut hw, clock, mut sink) = controller();
    let mut store = MemoryRecordStore::default();
    send(&mut ctl, "TIMER_START", &clock, &mut hw, &mut sink);
    assert!(ctl.persist_if_needed(0, &mut store));

    if let Some(data) = store.data.as_mut() {
        data[3] ^= 0x40;
    }
    let mut raw = [0u8; RECORD_LEN];
    let n = store.read_record(&mut raw).expect("bytes present");

    let mut target = PersistedRecord {
        mode: ModeKind::Twist,
        countdown_minutes: 42,
        ..PersistedRecord::default()
    };
    let before = target;
    let err = PersistedRecord::load_into(&raw[..n], &mut target).unwrap_err();
    assert!(matches!(err, RecordError::ChecksumMismatch { .. }));
    assert_eq!(target, before);
}

#[test]
fn unknown_mode_byte_is_rejected() {
    let mut raw = PersistedRecord::default().encode();
    raw[0] = 9;
    let crc = checksum(&raw[..RECORD_LEN - 2]);
    raw[RECORD_LEN - 2..].copy_from_slice(&crc.to_le_bytes());
    assert_eq!(PersistedRecord::decode(&raw), Err(RecordError::UnknownMode(9)));
}

#[test]
fn writes_only_on_change_and_at_most_once_per_interval() {
    let (mut ctl, mut hw, clock, mut sink) = controller();
    let mut store = MemoryRecordStore::default();
    let interval = u64::from(ctl.config().persist_interval_ms);

    assert!(ctl.persist_if_needed(0, &mut store));
    assert!(!ctl.persist_if_needed(interval * 2, &mut store));

    send(&mut ctl, "TIMER_START", &clock, &mut hw, &mut sink);
    assert!(!ctl.persist_if_needed(1_000, &mut store));
    assert!(ctl.persist_if_needed(interval, &mut store));
    assert_eq!(store.writes, 2);
    assert_eq!(read_back(&mut store).map(|r| r.mode), Ok(ModeKind::Timer));
}

#[test]
fn failed_write_backs_off_for_an_interval() {
    let (mut ctl, _hw, _clock, _sink) = controller();
    let mut store = MemoryRecordStore {
        fail_writes: true,
        ..MemoryRecordStore::default()
    };
    let interval = u64::from(ctl.config().persist_interval_ms);

    assert!(!ctl.persist_if_needed(0, &mut store));
    store.fail_writes = false;
    assert!(!ctl.persist_if_needed(interval - 1, &mut store));
    assert!(ctl.persist_if_needed(interval, &mut store));
    assert_eq!(read_back(&mut store), Ok(PersistedRecord::default()));
}

#[test]
fn empty_store_reports_not_found() {
    let mut store = MemoryRecordStore::default();
    assert_eq!(read_back(&mut store), Err(StorageError::NotFound));
}
