//! Integration tests for VirtusDev
//!
//! These tests exercise the full pipeline against the recording handle:
//! profile capabilities, device lifecycle, paced injection and teardown.

use std::time::Duration;
use virtusdev::cancel::CancelToken;
use virtusdev::config::{parse_conf_value, Config};
use virtusdev::device::mock::RecordingHandle;
use virtusdev::device::{
    DeviceError, DeviceIdentity, DeviceProfile, DeviceState, Jiggler, VirtualDevice,
    KEY_CODE_COUNT,
};
use virtusdev::keyboard::{
    EventType, Injector, KeyCode, RecordingPacer, TimingProfile, REL_X, SYN_REPORT,
};
use std::path::Path;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PATH: &str = "/dev/uinput";

type Triple = (EventType, u16, i32);

fn identity(profile: DeviceProfile) -> DeviceIdentity {
    Config::default().identity_for(profile).unwrap()
}

fn press(code: KeyCode) -> Vec<Triple> {
    vec![
        (EventType::KEY, code.0, 1),
        (EventType::SYNCHRONIZATION, SYN_REPORT, 0),
    ]
}

fn release(code: KeyCode) -> Vec<Triple> {
    vec![
        (EventType::KEY, code.0, 0),
        (EventType::SYNCHRONIZATION, SYN_REPORT, 0),
    ]
}

fn tap(code: KeyCode) -> Vec<Triple> {
    [press(code), release(code)].concat()
}

fn shifted(code: KeyCode) -> Vec<Triple> {
    [
        press(KeyCode::LEFT_SHIFT),
        tap(code),
        release(KeyCode::LEFT_SHIFT),
    ]
    .concat()
}

/// Bring up a device on `rec`, transmit every payload, then tear down.
/// Returns the pacer with the requested pauses.
fn run_session(
    rec: &mut RecordingHandle,
    profile: DeviceProfile,
    baud: u32,
    payloads: &[&str],
) -> RecordingPacer {
    let timing = TimingProfile::from_baud(baud).unwrap();
    let mut device =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(rec)).unwrap();

    let pacer = {
        let sink = device.sink().unwrap();
        let mut injector = Injector::with_pacer(sink, timing, RecordingPacer::default());
        for payload in payloads {
            injector.transmit(payload);
        }
        injector.into_parts().1
    };

    device.teardown();
    assert_eq!(device.state(), DeviceState::Destroyed);
    pacer
}

// ---------------------------------------------------------------------------
// Full pipeline tests
// ---------------------------------------------------------------------------

#[test]
fn barcode_session_emits_exact_sequence() {
    let mut rec = RecordingHandle::new();
    let pacer = run_session(&mut rec, DeviceProfile::Barcode, 9600, &["AB1"]);

    let expected = [
        shifted(KeyCode::A),
        shifted(KeyCode::new(48)),
        tap(KeyCode::KEY_1),
        tap(KeyCode::ENTER),
    ]
    .concat();
    assert_eq!(rec.triples(), expected);

    let us: Vec<u128> = pacer.pauses.iter().map(|d| d.as_micros()).collect();
    assert_eq!(
        us,
        vec![
            1042, 1042, 1042, 1042, 2084, // A
            1042, 1042, 1042, 1042, 2084, // B
            1042, 1042, 2084, // 1
            1042, 1042, 2084, // newline
        ]
    );
    assert_eq!(pacer.total(), Duration::from_micros(20_840));

    assert_eq!(rec.create_calls, 1);
    assert_eq!(rec.destroy_calls, 1);
}

#[test]
fn timestamps_are_monotonic() {
    let mut rec = RecordingHandle::new();
    run_session(&mut rec, DeviceProfile::Rs232, 115_200, &["Hello, World!"]);
    assert!(rec
        .events
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn every_payload_gets_a_terminator() {
    let mut rec = RecordingHandle::new();
    run_session(
        &mut rec,
        DeviceProfile::UsbKeyboard,
        115_200,
        &["abc", "x", "hello world"],
    );

    let enters = rec
        .triples()
        .iter()
        .filter(|t| **t == (EventType::KEY, KeyCode::ENTER.0, 1))
        .count();
    assert_eq!(enters, 3);

    // 3 + 1 + 11 characters plus 3 terminators, none shifted
    let key_events = rec
        .triples()
        .iter()
        .filter(|t| t.0 == EventType::KEY)
        .count();
    assert_eq!(key_events, 2 * (15 + 3));
}

#[test]
fn unmapped_characters_are_skipped() {
    let mut rec = RecordingHandle::new();
    let timing = TimingProfile::from_baud(115_200).unwrap();
    let profile = DeviceProfile::Barcode;
    let mut device =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec))
            .unwrap();

    let report = {
        let sink = device.sink().unwrap();
        let mut injector = Injector::with_pacer(sink, timing, RecordingPacer::default());
        injector.transmit("a€b\u{7}c")
    };
    drop(device);

    assert_eq!(report.payload_len, 5);
    assert_eq!(report.transmitted, 4);
    assert_eq!(report.skipped, vec!['€', '\u{7}']);
    assert!(!report.cancelled);
    assert_eq!(rec.events.len(), 4 * 4);
    assert_eq!(rec.destroy_calls, 1);
}

#[test]
fn skip_leaves_neighbours_intact() {
    let mut rec = RecordingHandle::new();
    let pacer = run_session(&mut rec, DeviceProfile::Barcode, 9600, &["a\u{7}b"]);

    let expected = [tap(KeyCode::A), tap(KeyCode::new(48)), tap(KeyCode::ENTER)].concat();
    assert_eq!(rec.triples(), expected);
    // Three unshifted transmissions, nothing paced for the skipped one
    assert_eq!(pacer.pauses.len(), 3 * 3);
    assert_eq!(pacer.total(), Duration::from_micros(3 * 4168));
}

#[test]
fn digit_and_symbol_share_a_key() {
    let mut plain = RecordingHandle::new();
    let mut symbol = RecordingHandle::new();
    run_session(&mut plain, DeviceProfile::Barcode, 9600, &["1"]);
    run_session(&mut symbol, DeviceProfile::Barcode, 9600, &["!"]);

    assert_eq!(plain.triples()[0], (EventType::KEY, KeyCode::KEY_1.0, 1));
    assert_eq!(
        symbol.triples()[..4],
        [press(KeyCode::LEFT_SHIFT), press(KeyCode::KEY_1)].concat()[..]
    );
}

#[test]
fn cancelled_session_sends_nothing() {
    let mut rec = RecordingHandle::new();
    let token = CancelToken::new();
    token.cancel();

    let profile = DeviceProfile::Barcode;
    let mut device =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec))
            .unwrap();
    let report = {
        let sink = device.sink().unwrap();
        Injector::with_pacer(sink, TimingProfile::default(), RecordingPacer::default())
            .with_cancel(token)
            .transmit("123")
    };
    device.teardown();
    drop(device);

    assert!(report.cancelled);
    assert_eq!(report.transmitted, 0);
    assert!(rec.events.is_empty());
    assert_eq!(rec.destroy_calls, 1);
}

// ---------------------------------------------------------------------------
// Lifecycle tests
// ---------------------------------------------------------------------------

#[test]
fn teardown_is_idempotent() {
    let mut rec = RecordingHandle::new();
    let profile = DeviceProfile::UsbKeyboard;
    let mut device =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec))
            .unwrap();
    device.teardown();
    device.teardown();
    assert!(device.sink().is_none());
    drop(device);

    assert_eq!(rec.create_calls, 1);
    assert_eq!(rec.destroy_calls, 1);
}

#[test]
fn drop_tears_down_created_device() {
    let mut rec = RecordingHandle::new();
    {
        let profile = DeviceProfile::Rs232;
        let _device =
            VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec))
                .unwrap();
    }
    assert_eq!(rec.destroy_calls, 1);
    assert_eq!(
        rec.identity.as_ref().map(|i| i.name().to_string()),
        Some("Virtual RS232 Serial Port".to_string())
    );
}

#[test]
fn failed_creation_never_destroys() {
    let mut rec = RecordingHandle::new();
    rec.fail_create = true;
    let profile = DeviceProfile::Barcode;
    let result =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec));
    assert!(matches!(result, Err(DeviceError::Create(_))));
    drop(result);

    assert_eq!(rec.create_calls, 1);
    assert_eq!(rec.destroy_calls, 0);
}

#[test]
fn failed_declaration_aborts_before_create() {
    let mut rec = RecordingHandle::new();
    rec.fail_declare = Some(EventType::KEY);
    let profile = DeviceProfile::Barcode;
    let result =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec));
    assert!(matches!(
        result,
        Err(DeviceError::Capability {
            event_type: EventType::KEY,
            ..
        })
    ));
    drop(result);
    assert_eq!(rec.create_calls, 0);
}

#[test]
fn open_failure_reports_path() {
    let profile = DeviceProfile::Barcode;
    let result = VirtualDevice::<RecordingHandle>::bring_up(
        profile,
        identity(profile),
        Path::new(PATH),
        || Err(std::io::Error::from(std::io::ErrorKind::NotFound)),
    );
    let err = result.err().unwrap();
    assert!(err.to_string().contains(PATH));
    assert_eq!(err.remediation(), Some("Try: sudo modprobe uinput"));
}

// ---------------------------------------------------------------------------
// Profile tests
// ---------------------------------------------------------------------------

#[test]
fn keyboard_profiles_declare_full_key_range() {
    for profile in [
        DeviceProfile::Barcode,
        DeviceProfile::UsbKeyboard,
        DeviceProfile::Rs232,
    ] {
        let mut rec = RecordingHandle::new();
        profile.declare_capabilities(&mut rec).unwrap();
        assert!(rec.event_types.contains(&EventType::KEY), "{}", profile);
        assert!(rec.event_types.contains(&EventType::SYNCHRONIZATION));
        assert_eq!(rec.codes_for(EventType::KEY), KEY_CODE_COUNT as usize);
    }
}

#[test]
fn jiggler_session_moves_pointer() {
    let mut rec = RecordingHandle::new();
    let profile = DeviceProfile::MouseJiggle;
    let mut device =
        VirtualDevice::bring_up(profile, identity(profile), Path::new(PATH), || Ok(&mut rec))
            .unwrap();

    let failures = {
        let sink = device.sink().unwrap();
        Jiggler::new(Duration::from_secs(30), 1).jiggle(sink)
    };
    device.teardown();
    drop(device);

    assert_eq!(failures, 0);
    assert!(rec.has_code(EventType::RELATIVE, REL_X));
    assert_eq!(
        rec.triples(),
        vec![
            (EventType::RELATIVE, REL_X, 1),
            (EventType::SYNCHRONIZATION, SYN_REPORT, 0),
            (EventType::RELATIVE, REL_X, -1),
            (EventType::SYNCHRONIZATION, SYN_REPORT, 0),
        ]
    );
}

#[test]
fn device_conf_selects_profile() {
    let conf = "# deployment\nDEVICE=\"mouse_jiggle\"\n";
    let name = parse_conf_value(conf, "DEVICE").unwrap().unwrap();
    assert_eq!(
        DeviceProfile::find_by_name(&name).unwrap(),
        DeviceProfile::MouseJiggle
    );
    assert!(DeviceProfile::find_by_name("joystick").is_err());
}
