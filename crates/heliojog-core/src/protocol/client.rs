//! Motor protocol client
//!
//! Owns the commanded speed and the transport for one driven channel. Every
//! operation is synchronous: it writes one command line and, for queries,
//! reads back exactly one response line.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AnalogInput, Channel, Command, DeviceTransport, ProtocolError, DEFAULT_TIMEOUT_MS};
use crate::profile::SpeedProfile;
use crate::units::tenths_to_units;

/// Whether the driven channel has been started up or shut down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveState {
    /// Shut down (or never started since the client was created)
    Idle,
    /// Started up
    Running,
}

/// One idle poll of the controller's readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Battery voltage in volts
    pub battery_voltage: f64,
    /// Motor current in amps
    pub motor_current: f64,
    /// Analog input 1, raw
    pub analog1: f64,
    /// Analog input 2, raw
    pub analog2: f64,
}

/// Client for the controller's text protocol
pub struct MotorClient<T> {
    transport: T,
    channel: Channel,
    profile: SpeedProfile,
    response_timeout: Duration,
    speed: i32,
    state: DriveState,
    /// Set once a speed command was sent while Idle, cleared on start/stop
    warned_idle: bool,
}

impl<T: DeviceTransport> MotorClient<T> {
    /// Create a client driving channel 1 with a stopped motor
    pub fn new(transport: T, profile: SpeedProfile) -> Self {
        Self {
            transport,
            channel: Channel::One,
            profile,
            response_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            speed: 0,
            state: DriveState::Idle,
            warned_idle: false,
        }
    }

    /// Drive a different channel
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Wait this long for each query response
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Last commanded speed
    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Whether the channel was last started up or shut down
    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Channel this client drives
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Step and bounds applied to speed changes
    pub fn profile(&self) -> SpeedProfile {
        self.profile
    }

    /// The transport, e.g. to inspect a simulator's history
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Raise the commanded speed by one step
    pub fn increment(&mut self) -> Result<(), ProtocolError> {
        let speed = self.profile.adjust(self.speed, 1);
        self.command_speed(speed)
    }

    /// Lower the commanded speed by one step
    pub fn decrement(&mut self) -> Result<(), ProtocolError> {
        let speed = self.profile.adjust(self.speed, -1);
        self.command_speed(speed)
    }

    /// Command an absolute speed, clamped to the profile bounds
    pub fn set_speed(&mut self, speed: i32) -> Result<(), ProtocolError> {
        let clamped = self.profile.clamp(speed);
        if clamped != speed {
            tracing::debug!(requested = speed, clamped, "speed clamped");
        }
        self.command_speed(clamped)
    }

    /// Zero the speed, then shut the channel down
    pub fn stop(&mut self) -> Result<(), ProtocolError> {
        self.speed = 0;
        self.state = DriveState::Idle;
        self.warned_idle = false;
        // Zero must reach the device before the shutdown directive
        self.send(Command::SetSpeed(self.channel, 0))?;
        self.send(Command::Stop(self.channel))?;
        tracing::info!(channel = self.channel.number(), "motor stopped");
        Ok(())
    }

    /// Zero the speed, then start the channel up
    pub fn start(&mut self) -> Result<(), ProtocolError> {
        self.speed = 0;
        self.state = DriveState::Running;
        self.warned_idle = false;
        self.send(Command::SetSpeed(self.channel, 0))?;
        self.send(Command::Start(self.channel))?;
        tracing::info!(channel = self.channel.number(), "motor started");
        Ok(())
    }

    /// Speed the controller reports as commanded
    pub fn query_speed(&mut self) -> Result<i32, ProtocolError> {
        let command = Command::QuerySpeed(self.channel);
        let (tag, body) = self.exchange(command)?;
        body.parse::<i32>()
            .map_err(|_| ProtocolError::ParseError { tag, body })
    }

    /// Battery voltage in volts
    pub fn query_battery(&mut self) -> Result<f64, ProtocolError> {
        self.query_number(Command::QueryBattery(self.channel))
            .map(tenths_to_units)
    }

    /// Motor current in amps
    pub fn query_current(&mut self) -> Result<f64, ProtocolError> {
        self.query_number(Command::QueryCurrent(self.channel))
            .map(tenths_to_units)
    }

    /// Analog input 1, unscaled
    pub fn query_analog1(&mut self) -> Result<f64, ProtocolError> {
        self.query_number(Command::QueryAnalog(AnalogInput::A1))
    }

    /// Analog input 2, unscaled
    pub fn query_analog2(&mut self) -> Result<f64, ProtocolError> {
        self.query_number(Command::QueryAnalog(AnalogInput::A2))
    }

    /// Read battery, current and both analog inputs, in that order.
    ///
    /// Meant for when the operator is not pressing keys; polling while the
    /// motor is being driven would crowd the link with queries.
    pub fn poll_idle(&mut self) -> Result<TelemetrySample, ProtocolError> {
        Ok(TelemetrySample {
            battery_voltage: self.query_battery()?,
            motor_current: self.query_current()?,
            analog1: self.query_analog1()?,
            analog2: self.query_analog2()?,
        })
    }

    fn command_speed(&mut self, speed: i32) -> Result<(), ProtocolError> {
        if self.state == DriveState::Idle && !self.warned_idle {
            // Device behaviour for speed commands while shut down is unknown
            tracing::warn!(
                channel = self.channel.number(),
                speed,
                "speed command sent while channel is shut down"
            );
            self.warned_idle = true;
        }
        self.speed = speed;
        self.send(Command::SetSpeed(self.channel, speed))
    }

    /// Send a command that gets no response
    fn send(&mut self, command: Command) -> Result<(), ProtocolError> {
        if command.expects_response() {
            // Its response line would be read as the answer to the next query
            return Err(ProtocolError::ProtocolViolation(format!(
                "'{}' must be sent as a query",
                command
            )));
        }
        self.transport.write_line(&command.text())
    }

    /// Send a query and return its tag with the value text behind it
    fn exchange(&mut self, command: Command) -> Result<(&'static str, String), ProtocolError> {
        let tag = command
            .response_tag()
            .ok_or_else(|| ProtocolError::ProtocolViolation(format!("'{}' has no response", command)))?;

        self.transport.write_line(&command.text())?;
        let line = self.transport.read_line(self.response_timeout)?;

        match tag.strip(&line) {
            Some(value) => Ok((tag.as_str(), value.to_string())),
            None => Err(ProtocolError::ParseError {
                tag: tag.as_str(),
                body: line.trim().to_string(),
            }),
        }
    }

    fn query_number(&mut self, command: Command) -> Result<f64, ProtocolError> {
        let (tag, body) = self.exchange(command)?;
        body.parse::<f64>()
            .map_err(|_| ProtocolError::ParseError { tag, body })
    }
}
