//! Serial port handling
//!
//! Finding and opening the controller's USB serial port.

use serialport::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
};
use std::time::Duration;

use super::{ProtocolError, DEFAULT_PORT};

/// A serial port the controller might be attached to
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    /// The controller only ever shows up as a USB device
    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (Some(usb.vid), Some(usb.pid), usb.product),
            _ => (None, None, None),
        };
        Self {
            name: info.port_name,
            vid,
            pid,
            product,
        }
    }
}

/// Default controller port first, then other USB devices, then the rest.
/// Names are compared plainly within each group.
fn order_ports(ports: &mut [PortInfo]) {
    let rank = |p: &PortInfo| (p.name != DEFAULT_PORT, !p.is_usb());
    ports.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name)));
}

/// Serial ports the OS reports, likeliest controller first
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(found) => found.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("serial port enumeration failed: {}", e);
            Vec::new()
        }
    };
    order_ports(&mut ports);
    ports
}

/// Open the controller's port as 8N1 without flow control
pub fn open_port(name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, ProtocolError> {
    // Short per-call timeout; line reads apply their own deadline on top
    let mut port = serialport::new(name, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(50))
        .open()
        .map_err(|e| ProtocolError::SerialError(format!("{}: {}", name, e)))?;

    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!(port = name, "could not raise DTR: {}", e);
    }
    tracing::info!(port = name, baud_rate, "opened motor controller port");
    Ok(port)
}
