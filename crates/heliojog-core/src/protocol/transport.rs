//! Line-oriented device transport
//!
//! The controller is half-duplex: a command line goes out, and for queries a
//! single response line comes back. [`DeviceTransport`] is the seam between
//! the protocol client and whatever carries those lines (a serial port, or the
//! in-memory [`SimulatedDevice`](crate::simulator::SimulatedDevice)).

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use super::ProtocolError;

/// Largest response line accepted before the read is considered garbage
const MAX_LINE_LEN: usize = 256;

/// Capability interface for exchanging text lines with the controller
pub trait DeviceTransport {
    /// Send one command line. The newline terminator is appended here.
    fn write_line(&mut self, line: &str) -> Result<(), ProtocolError>;

    /// Read one response line, terminator included.
    ///
    /// Fails with [`ProtocolError::Timeout`] if no complete line arrives
    /// before `timeout` elapses.
    fn read_line(&mut self, timeout: Duration) -> Result<String, ProtocolError>;
}

impl<T: DeviceTransport + ?Sized> DeviceTransport for Box<T> {
    fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        (**self).write_line(line)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<String, ProtocolError> {
        (**self).read_line(timeout)
    }
}

/// Byte stream underneath a [`LineTransport`]
pub trait ByteChannel: Read + Write + Send {
    /// Get number of bytes available to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Discard anything already received
    fn clear_input_buffer(&mut self) -> io::Result<()>;
}

/// Serial port wrapper implementing [`ByteChannel`]
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an already opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl ByteChannel for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }
}

/// [`DeviceTransport`] over a raw byte channel.
///
/// Bytes received after a line terminator are kept for the next read.
pub struct LineTransport<C> {
    channel: C,
    pending: Vec<u8>,
}

impl LineTransport<SerialChannel> {
    /// Open the controller's serial port
    pub fn open_serial(port_name: &str, baud_rate: u32) -> Result<Self, ProtocolError> {
        let port = super::serial::open_port(port_name, baud_rate)?;
        let mut transport = Self::new(SerialChannel::new(port));
        // Drop whatever the controller printed before we attached
        transport.channel.clear_input_buffer()?;
        Ok(transport)
    }
}

impl<C: ByteChannel> LineTransport<C> {
    /// Frame lines over `channel`, which is used as is
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            pending: Vec::new(),
        }
    }

    /// Access the underlying channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Split the first complete line off the pending buffer
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<C: ByteChannel> DeviceTransport for LineTransport<C> {
    fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        self.channel.write_all(&bytes)?;
        self.channel.flush()?;
        tracing::debug!(line, "sent");
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<String, ProtocolError> {
        let start = Instant::now();
        let mut buffer = [0u8; 64];

        loop {
            if let Some(line) = self.take_line() {
                tracing::debug!(line = line.trim_end(), "received");
                return Ok(line);
            }

            if self.pending.len() > MAX_LINE_LEN {
                let junk = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return Err(ProtocolError::ProtocolViolation(format!(
                    "response line exceeds {} bytes: {:?}",
                    MAX_LINE_LEN, junk
                )));
            }

            if start.elapsed() >= timeout {
                tracing::debug!(
                    partial = %String::from_utf8_lossy(&self.pending),
                    "read timed out"
                );
                return Err(ProtocolError::Timeout {
                    waited_ms: timeout.as_millis() as u64,
                });
            }

            let available = self.channel.bytes_to_read()?;
            if available == 0 {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }

            let to_read = std::cmp::min(available as usize, buffer.len());
            match self.channel.read(&mut buffer[..to_read]) {
                Ok(0) => {
                    return Err(ProtocolError::IoError(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device closed the stream",
                    )))
                }
                Ok(n) => self.pending.extend_from_slice(&buffer[..n]),
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory channel: records writes, serves queued inbound bytes
    #[derive(Default)]
    struct MockChannel {
        sent: Vec<u8>,
        inbound: VecDeque<u8>,
        fail_on_send: bool,
    }

    impl MockChannel {
        fn with_inbound(bytes: &[u8]) -> Self {
            Self {
                inbound: bytes.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Read for MockChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.inbound.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    impl Write for MockChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_on_send {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteChannel for MockChannel {
        fn bytes_to_read(&mut self) -> io::Result<u32> {
            Ok(self.inbound.len() as u32)
        }

        fn clear_input_buffer(&mut self) -> io::Result<()> {
            self.inbound.clear();
            Ok(())
        }
    }

    #[test]
    fn test_write_appends_newline() {
        let mut transport = LineTransport::new(MockChannel::default());
        transport.write_line("m1: 100").unwrap();
        transport.write_line("m1: shut down").unwrap();
        assert_eq!(transport.channel().sent, b"m1: 100\nm1: shut down\n".to_vec());
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let mut channel = MockChannel::default();
        channel.fail_on_send = true;
        let mut transport = LineTransport::new(channel);
        let err = transport.write_line("m1: 0").unwrap_err();
        assert!(matches!(err, ProtocolError::IoError(_)));
    }

    #[test]
    fn test_read_keeps_bytes_after_terminator() {
        let channel = MockChannel::with_inbound(b"M1:B127\r\nA1: 512\r\n");
        let mut transport = LineTransport::new(channel);
        let timeout = Duration::from_millis(100);
        assert_eq!(transport.read_line(timeout).unwrap(), "M1:B127\r\n");
        assert_eq!(transport.read_line(timeout).unwrap(), "A1: 512\r\n");
    }

    #[test]
    fn test_read_empty_response_line() {
        let mut transport = LineTransport::new(MockChannel::with_inbound(b"\r\n"));
        assert_eq!(
            transport.read_line(Duration::from_millis(100)).unwrap(),
            "\r\n"
        );
    }

    #[test]
    fn test_silent_device_times_out_after_wait() {
        let mut transport = LineTransport::new(MockChannel::default());
        let wait = Duration::from_millis(60);
        let start = Instant::now();
        let err = transport.read_line(wait).unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, ProtocolError::Timeout { waited_ms: 60 }));
        assert!(elapsed >= wait, "returned early after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    }

    #[test]
    fn test_partial_line_times_out() {
        let mut transport = LineTransport::new(MockChannel::with_inbound(b"M1:B12"));
        let err = transport.read_line(Duration::from_millis(20)).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_runaway_line_is_rejected() {
        let junk = vec![b'x'; MAX_LINE_LEN + 10];
        let mut transport = LineTransport::new(MockChannel::with_inbound(&junk));
        let err = transport.read_line(Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, ProtocolError::ProtocolViolation(_)));
    }
}
