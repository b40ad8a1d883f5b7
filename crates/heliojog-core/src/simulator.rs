//! Simulated motor controller
//!
//! Stands in for the real controller when no hardware is attached. It answers
//! the same queries with fixed readings, remembers the speeds it was sent, and
//! holds at most one pending response: the line staged by the last write is
//! handed out by the next read and then forgotten.

use std::time::Duration;

use crate::protocol::{Channel, DeviceTransport, ProtocolError};

/// Per-channel state of the simulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedChannel {
    /// Last speed commanded on this channel
    pub speed: i32,
    /// Current draw in 0.1 A
    pub current: i32,
    /// Whether the channel has been started up
    pub enabled: bool,
}

/// In-memory [`DeviceTransport`] answering like the controller
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    m1: SimulatedChannel,
    m2: SimulatedChannel,
    /// Battery voltage in 0.1 V
    battery: i32,
    a1: f64,
    a2: f64,
    /// Response staged by the last write, consumed by the next read
    next_read: String,
    /// Every line received, in order
    history: Vec<String>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// A controller with a 12.7 V battery and both channels shut down
    pub fn new() -> Self {
        Self {
            m1: SimulatedChannel {
                speed: 0,
                current: 31,
                enabled: false,
            },
            m2: SimulatedChannel {
                speed: 0,
                current: 21,
                enabled: false,
            },
            battery: 127,
            a1: 512.0,
            a2: -1043.0,
            next_read: String::new(),
            history: Vec::new(),
        }
    }

    /// Set the battery reading in 0.1 V
    pub fn with_battery(mut self, tenths_of_volt: i32) -> Self {
        self.battery = tenths_of_volt;
        self
    }

    /// Set a channel's current reading in 0.1 A
    pub fn with_current(mut self, channel: Channel, tenths_of_amp: i32) -> Self {
        self.channel_mut(channel).current = tenths_of_amp;
        self
    }

    /// Set the raw analog readings
    pub fn with_analog(mut self, a1: f64, a2: f64) -> Self {
        self.a1 = a1;
        self.a2 = a2;
        self
    }

    /// State of one motor channel
    pub fn channel(&self, channel: Channel) -> &SimulatedChannel {
        match channel {
            Channel::One => &self.m1,
            Channel::Two => &self.m2,
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut SimulatedChannel {
        match channel {
            Channel::One => &mut self.m1,
            Channel::Two => &mut self.m2,
        }
    }

    /// Lines received so far, terminators stripped
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Answer a query, or apply a set command. Returns the staged response.
    fn handle(&mut self, line: &str) -> String {
        match line {
            "m1: get" => format!("M1: {}", self.m1.speed),
            "m2: get" => format!("M2: {}", self.m2.speed),
            "m1: getb" => format!("M1:B{}", self.battery),
            "m2: getb" => format!("M2:B{}", self.battery),
            "m1: getc" => format!("M1:C{}", self.m1.current),
            "m2: getc" => format!("M2:C{}", self.m2.current),
            "a1: get" => format!("A1: {}", self.a1),
            "a2: get" => format!("A2: {}", self.a2),
            other => {
                self.apply(other);
                String::new()
            }
        }
    }

    /// Track set/enable commands. They get no response either way.
    fn apply(&mut self, line: &str) {
        let Some((prefix, arg)) = line.split_once(": ") else {
            return;
        };
        let channel = match prefix {
            "m1" => Channel::One,
            "m2" => Channel::Two,
            _ => return,
        };
        let state = self.channel_mut(channel);
        match arg {
            "shut down" => state.enabled = false,
            "start up" => state.enabled = true,
            value => {
                if let Ok(speed) = value.parse::<i32>() {
                    state.speed = speed;
                }
            }
        }
    }
}

impl DeviceTransport for SimulatedDevice {
    fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let line = line.trim();
        self.next_read = self.handle(line);
        self.history.push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<String, ProtocolError> {
        let mut response = std::mem::take(&mut self.next_read);
        response.push_str("\r\n");
        Ok(response)
    }
}
