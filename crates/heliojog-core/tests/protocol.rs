use heliojog_core::prelude::*;
use heliojog_core::protocol::{ByteChannel, Command};
use pretty_assertions::assert_eq;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_millis(50);

fn client(profile: SpeedProfile) -> MotorClient<SimulatedDevice> {
    MotorClient::new(SimulatedDevice::new(), profile).with_response_timeout(WAIT)
}

#[test]
fn test_set_speed_clamps_to_fine_bounds() {
    let mut client = client(SpeedProfile::FINE);
    for (requested, expected) in [(5000, 2048), (2049, 2048), (-2049, -2048), (i32::MIN, -2048)] {
        client.set_speed(requested).unwrap();
        assert_eq!(client.speed(), expected);
    }
}

#[test]
fn test_set_speed_clamps_to_coarse_bounds() {
    let mut client = client(SpeedProfile::COARSE);
    client.set_speed(101).unwrap();
    assert_eq!(client.speed(), 100);
    client.set_speed(-250).unwrap();
    assert_eq!(client.speed(), -100);
    assert_eq!(client.transport().history(), ["m1: 100", "m1: -100"]);
}

#[test]
fn test_increment_decrement_round_trip() {
    for profile in [SpeedProfile::FINE, SpeedProfile::COARSE] {
        let mut client = client(profile);
        for start in [0, 40, -60, profile.max - profile.step, profile.min + profile.step] {
            client.set_speed(start).unwrap();
            client.increment().unwrap();
            client.decrement().unwrap();
            assert_eq!(client.speed(), start, "profile {}", profile);
        }
    }
}

#[test]
fn test_round_trip_at_bound_loses_clamped_amount() {
    let mut client = client(SpeedProfile::FINE);
    client.set_speed(2000).unwrap();
    client.increment().unwrap();
    assert_eq!(client.speed(), 2048);
    client.decrement().unwrap();
    assert_eq!(client.speed(), 1948);
}

#[test]
fn test_stop_zeroes_before_shutdown() {
    for start in [2048, -700, 0] {
        let mut client = client(SpeedProfile::FINE);
        client.start().unwrap();
        client.set_speed(start).unwrap();
        client.stop().unwrap();

        assert_eq!(client.speed(), 0);
        assert_eq!(client.state(), DriveState::Idle);
        let history = client.transport().history();
        assert_eq!(&history[history.len() - 2..], ["m1: 0", "m1: shut down"]);
    }
}

#[test]
fn test_simulator_tracks_client_speed() {
    let mut client = client(SpeedProfile::FINE);
    client.start().unwrap();
    client.increment().unwrap();
    client.increment().unwrap();
    assert_eq!(client.query_speed().unwrap(), 200);
    assert!(client.transport().channel(Channel::One).enabled);
}

#[test]
fn test_battery_and_current_are_scaled() {
    let sim = SimulatedDevice::new()
        .with_battery(127)
        .with_current(Channel::One, 21);
    let mut client = MotorClient::new(sim, SpeedProfile::FINE);
    assert!((client.query_battery().unwrap() - 12.7).abs() < 1e-9);
    assert!((client.query_current().unwrap() - 2.1).abs() < 1e-9);
}

#[test]
fn test_analog_inputs_are_raw() {
    let sim = SimulatedDevice::new().with_analog(512.0, -1043.0);
    let mut client = MotorClient::new(sim, SpeedProfile::FINE);
    assert_eq!(client.query_analog1().unwrap(), 512.0);
    assert_eq!(client.query_analog2().unwrap(), -1043.0);
}

#[test]
fn test_poll_idle_sample() {
    let mut client = client(SpeedProfile::FINE);
    let sample = client.poll_idle().unwrap();
    assert!((sample.battery_voltage - 12.7).abs() < 1e-9);
    assert!((sample.motor_current - 3.1).abs() < 1e-9);
    assert_eq!(sample.analog1, 512.0);
    assert_eq!(sample.analog2, -1043.0);
}

#[test]
fn test_unrecognized_command_yields_empty_response_once() {
    let mut sim = SimulatedDevice::new();
    sim.write_line("m1: spin").unwrap();
    assert_eq!(sim.read_line(WAIT).unwrap(), "\r\n");
    assert_eq!(sim.read_line(WAIT).unwrap(), "\r\n");
}

#[test]
fn test_response_is_consumed_by_first_read() {
    let mut sim = SimulatedDevice::new();
    sim.write_line(&Command::QueryBattery(Channel::One).text())
        .unwrap();
    assert_eq!(sim.read_line(WAIT).unwrap(), "M1:B127\r\n");
    assert_eq!(sim.read_line(WAIT).unwrap(), "\r\n");
}

/// Channel that accepts writes and never answers
struct SilentChannel;

impl Read for SilentChannel {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "nothing to read"))
    }
}

impl Write for SilentChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteChannel for SilentChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(0)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_query_against_silent_device_times_out() {
    let wait = Duration::from_millis(80);
    let mut client = MotorClient::new(LineTransport::new(SilentChannel), SpeedProfile::FINE)
        .with_response_timeout(wait);

    let start = Instant::now();
    let err = client.query_battery().unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout(), "unexpected error: {}", err);
    assert!(elapsed >= wait, "timed out early: {:?}", elapsed);
    assert!(elapsed < wait * 20, "timed out late: {:?}", elapsed);
}
