//! Driver-level tests against the in-memory device model.

mod common;

use common::{device, BusFault, FailBus, SimDevice, StubPin};
use embedded_hal_mock::eh1::delay::NoopDelay;
use vl53l5cx::{
    Error, OutputChannels, ProtocolError, RangingMode, Resolution, TargetOrder, Vl53l5cx,
};

#[test]
fn operations_before_init_are_rejected_without_bus_traffic() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);

    let mut buf = [0u8; 8];
    assert!(matches!(
        sensor.dci_read_data(0x5450, &mut buf),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(
        sensor.dci_write_data(0x5458, &[0, 10, 0, 0]),
        Err(Error::NotInitialized)
    ));
    assert!(matches!(sensor.get_resolution(), Err(Error::NotInitialized)));
    assert!(matches!(sensor.start_ranging(), Err(Error::NotInitialized)));
    assert!(matches!(sensor.get_ranging_data(), Err(Error::NotInitialized)));
    assert!(matches!(sensor.stop_ranging(), Err(Error::NotInitialized)));

    assert_eq!(sim.contacts(), 0, "the bus must stay untouched");
}

#[test]
fn init_loads_firmware_and_leaves_device_configured() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);

    sensor.init().unwrap();
    assert!(!sensor.is_ranging());
    assert_eq!(sensor.get_resolution().unwrap(), Resolution::Grid8x8);
    assert_eq!(sensor.get_ranging_mode().unwrap(), RangingMode::Autonomous);
    assert_eq!(sensor.get_ranging_frequency_hz().unwrap(), 10);
    assert_eq!(sensor.get_integration_time_ms().unwrap(), 5);
    assert_eq!(sensor.get_target_order().unwrap(), TargetOrder::Strongest);
}

#[test]
fn accessors_round_trip_through_the_device() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    sensor.set_resolution(Resolution::Grid4x4).unwrap();
    assert_eq!(sensor.get_resolution().unwrap(), Resolution::Grid4x4);

    sensor.set_ranging_frequency_hz(30).unwrap();
    assert_eq!(sensor.get_ranging_frequency_hz().unwrap(), 30);

    sensor.set_integration_time_ms(20).unwrap();
    assert_eq!(sensor.get_integration_time_ms().unwrap(), 20);

    sensor.set_ranging_mode(RangingMode::Continuous).unwrap();
    assert_eq!(sensor.get_ranging_mode().unwrap(), RangingMode::Continuous);

    sensor.set_target_order(TargetOrder::Closest).unwrap();
    assert_eq!(sensor.get_target_order().unwrap(), TargetOrder::Closest);

    // the percent <-> raw mapping loses one step around 50%
    sensor.set_sharpener_percent(50).unwrap();
    assert_eq!(sensor.get_sharpener_percent().unwrap(), 49);
}

#[test]
fn invalid_arguments_are_rejected_before_bus_traffic() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    let before = sim.contacts();
    assert!(matches!(sensor.set_integration_time_ms(1), Err(Error::InvalidArgument)));
    assert!(matches!(sensor.set_integration_time_ms(1001), Err(Error::InvalidArgument)));
    assert!(matches!(sensor.set_ranging_frequency_hz(0), Err(Error::InvalidArgument)));
    assert!(matches!(sensor.set_ranging_frequency_hz(61), Err(Error::InvalidArgument)));
    assert!(matches!(sensor.set_sharpener_percent(100), Err(Error::InvalidArgument)));
    assert_eq!(sim.contacts(), before);

    // 20 Hz is only legal at 4x4; the check needs the resolution readback
    assert!(matches!(sensor.set_ranging_frequency_hz(20), Err(Error::InvalidArgument)));
}

#[test]
fn full_ranging_session() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    sensor.start_ranging().unwrap();
    assert!(sensor.is_ranging());
    assert!(matches!(sensor.start_ranging(), Err(Error::InvalidArgument)));
    assert!(matches!(
        sensor.set_resolution(Resolution::Grid4x4),
        Err(Error::InvalidArgument)
    ));

    assert!(sensor.check_data_ready().unwrap());
    let results = sensor.get_ranging_data().unwrap();
    assert_eq!(results.distance_mm.len(), 64);
    assert_eq!(results.distance_mm[0], 100);
    assert_eq!(results.distance_mm[5], 105);
    assert!(results.nb_target_detected.iter().all(|&n| n == 1));
    assert!(results.target_status.iter().all(|&s| s == 5));
    assert!(results.ambient_per_spad.iter().all(|&a| a == 3));
    assert_eq!(results.silicon_temp_degc, 28);

    // same frame, same sequence byte: not ready again
    assert!(!sensor.check_data_ready().unwrap());

    sensor.stop_ranging().unwrap();
    assert!(!sensor.is_ranging());
    assert!(matches!(sensor.get_ranging_data(), Err(Error::InvalidArgument)));

    // the session is restartable after a stop
    sensor.set_resolution(Resolution::Grid4x4).unwrap();
    sensor.start_ranging().unwrap();
    let results = sensor.get_ranging_data().unwrap();
    assert_eq!(results.distance_mm.len(), 16);
    sensor.stop_ranging().unwrap();
}

#[test]
fn reduced_channel_set_shrinks_the_frame() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    let channels = OutputChannels::none()
        .with(OutputChannels::NB_TARGET_DETECTED)
        .with(OutputChannels::DISTANCE_MM)
        .with(OutputChannels::TARGET_STATUS);
    sensor.set_output_channels(channels).unwrap();

    sensor.start_ranging().unwrap();
    let results = sensor.get_ranging_data().unwrap();
    assert_eq!(results.distance_mm.len(), 64);
    assert_eq!(results.target_status.len(), 64);
    assert!(results.ambient_per_spad.is_empty());
    assert!(results.signal_per_spad.is_empty());
    sensor.stop_ranging().unwrap();

    // channel selection is locked while streaming
    sensor.start_ranging().unwrap();
    assert!(matches!(
        sensor.set_output_channels(OutputChannels::all()),
        Err(Error::InvalidArgument)
    ));
    sensor.stop_ranging().unwrap();
}

#[test]
fn torn_frames_are_discarded() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    sim.0.borrow_mut().corrupt_footer = true;
    sensor.start_ranging().unwrap();
    assert!(sensor.check_data_ready().unwrap());
    assert!(matches!(
        sensor.get_ranging_data(),
        Err(Error::Protocol(ProtocolError::CorruptedFrame { .. }))
    ));
    // a retry of the read is legal and sees the same torn frame
    assert!(matches!(
        sensor.get_ranging_data(),
        Err(Error::Protocol(ProtocolError::CorruptedFrame { .. }))
    ));
}

#[test]
fn empty_zone_reports_status_sentinel() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    sim.0.borrow_mut().first_zone_targets = 0;
    sensor.start_ranging().unwrap();
    let results = sensor.get_ranging_data().unwrap();
    assert_eq!(results.target_status[0], 255);
    assert_eq!(results.target_status[1], 5);
}

#[test]
fn start_ranging_verifies_the_reported_frame_length() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    sim.0.borrow_mut().tamper_reported_size = true;
    match sensor.start_ranging() {
        Err(Error::Protocol(ProtocolError::FrameSizeMismatch { expected, reported })) => {
            assert_eq!(reported, expected + 4);
        }
        other => panic!("expected frame size mismatch, got {other:?}"),
    }
    assert!(!sensor.is_ranging());
}

#[test]
fn silent_status_register_times_out_every_dci_operation() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    sim.0.borrow_mut().status_silent = true;
    let mut buf = [0u8; 8];
    assert!(matches!(sensor.dci_read_data(0x5450, &mut buf), Err(Error::Timeout)));
    assert!(matches!(
        sensor.dci_write_data(0x5458, &[0, 10, 0, 0]),
        Err(Error::Timeout)
    ));
    assert!(matches!(sensor.set_target_order(TargetOrder::Closest), Err(Error::Timeout)));
    assert!(matches!(sensor.start_ranging(), Err(Error::Timeout)));
}

#[test]
fn silent_boot_status_times_out_the_loader() {
    let sim = SimDevice::new();
    sim.0.borrow_mut().boot_silent = true;
    let mut sensor = device(&sim);

    assert!(matches!(sensor.init(), Err(Error::Timeout)));
    // the loader never completed, so the DCI gate stays shut
    assert!(matches!(sensor.get_resolution(), Err(Error::NotInitialized)));
}

#[test]
fn transport_failures_are_fatal_to_the_call() {
    let mut sensor: Vl53l5cx<FailBus, StubPin, NoopDelay> =
        Vl53l5cx::new(FailBus, StubPin, NoopDelay);
    assert!(matches!(sensor.init(), Err(Error::Transport(BusFault))));
}

#[test]
fn dci_payloads_must_fit_the_working_buffer() {
    let sim = SimDevice::new();
    let mut sensor = device(&sim);
    sensor.init().unwrap();

    let oversized = [0u8; 2048];
    assert!(matches!(
        sensor.dci_write_data(0x5450, &oversized),
        Err(Error::Capacity { .. })
    ));
    // word-granular lengths only
    assert!(matches!(
        sensor.dci_write_data(0x5450, &[0, 1, 2]),
        Err(Error::InvalidArgument)
    ));
}
