//! Motor Controller Protocol
//!
//! Implements the plain-text serial protocol of a two-channel motor
//! controller: line framing, command encoding, response parsing and the
//! client that keeps the commanded speed.

mod client;
pub mod commands;
mod error;
pub mod serial;
pub mod transport;

pub use client::{DriveState, MotorClient, TelemetrySample};
pub use commands::{AnalogInput, Channel, Command, ResponseTag};
pub use error::ProtocolError;
pub use serial::{list_ports, open_port, PortInfo};
pub use transport::{ByteChannel, DeviceTransport, LineTransport, SerialChannel};

/// Serial device the controller enumerates as over USB
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default baud rate for the controller's USB serial link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default wait for a query response in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default bounded wait for operator input before an idle poll, in milliseconds
pub const DEFAULT_INPUT_WAIT_MS: u64 = 200;
