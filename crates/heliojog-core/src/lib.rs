//! # heliojog Core Library
//!
//! Manual jog control for a single-axis heliostat drive.
//!
//! This library provides:
//! - The motor controller's plain-text serial protocol
//! - A line transport over the serial port, and an in-memory simulator
//! - Clamped speed state with fine and coarse speed profiles
//! - The interactive jog loop, independent of any particular terminal
//!
//! ## Example
//!
//! ```rust,no_run
//! use heliojog_core::prelude::*;
//!
//! # fn main() -> Result<(), ProtocolError> {
//! let mut client = MotorClient::new(SimulatedDevice::new(), SpeedProfile::FINE);
//! client.start()?;
//! client.increment()?;
//! let sample = client.poll_idle()?;
//! println!("battery: {} V", sample.battery_voltage);
//! client.stop()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod config;
pub mod input;
pub mod profile;
pub mod protocol;
pub mod session;
pub mod simulator;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, JogConfig};
    pub use crate::input::{InputPoll, InputSource, KeyEvent, ScriptedInput};
    pub use crate::profile::SpeedProfile;
    pub use crate::protocol::{
        Channel, DeviceTransport, DriveState, LineTransport, MotorClient, ProtocolError,
        TelemetrySample,
    };
    pub use crate::session::{run_session, Renderer, StatusFrame};
    pub use crate::simulator::SimulatedDevice;
}
