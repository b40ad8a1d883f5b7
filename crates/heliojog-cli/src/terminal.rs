//! Terminal front end
//!
//! Raw-mode key input via crossterm and a plain clear-and-print status screen.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use heliojog_core::input::{key_for_char, InputPoll, InputSource, KeyEvent};
use heliojog_core::protocol::ProtocolError;
use heliojog_core::session::{Renderer, StatusFrame};
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Keeps the terminal in raw mode until dropped
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::error!("failed to restore terminal mode: {}", e);
        }
    }
}

/// Key input from the controlling terminal
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn poll_key(&mut self, wait: Duration) -> Result<InputPoll, ProtocolError> {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !event::poll(remaining)? {
                return Ok(InputPoll::Timeout);
            }
            // Resize, focus and key-release events do not count as input
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    return map_key(key.code, key.modifiers).map(InputPoll::Key);
                }
            }
        }
    }
}

/// Translate a terminal key into a jog key.
///
/// Keys that arrive as escape sequences other than up/down are rejected.
pub fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Result<KeyEvent, ProtocolError> {
    match code {
        // Raw mode swallows SIGINT, so Ctrl-C has to end the session itself
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Ok(KeyEvent::Quit),
        KeyCode::Char(c) => Ok(key_for_char(c)),
        KeyCode::Up => Ok(KeyEvent::Up),
        KeyCode::Down => Ok(KeyEvent::Down),
        KeyCode::Tab => Ok(KeyEvent::Tab),
        KeyCode::Enter => Ok(KeyEvent::Enter),
        KeyCode::Backspace => Ok(KeyEvent::Other('\x7f')),
        other => Err(ProtocolError::ProtocolViolation(format!(
            "unhandled escape sequence: {:?}",
            other
        ))),
    }
}

/// Clears the screen and prints the status block on every frame
pub struct ScreenRenderer<W> {
    out: W,
}

impl<W: Write> ScreenRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for ScreenRenderer<W> {
    fn render(&mut self, frame: &StatusFrame) -> io::Result<()> {
        let last_key = frame
            .last_key
            .map(|k| k.to_string())
            .unwrap_or_else(|| "None".to_string());

        // Full terminal reset, then one line per field. CRLF since raw mode
        // disables output newline translation.
        write!(self.out, "\x1bc")?;
        write!(self.out, "Channel:         {}\r\n", frame.channel.number())?;
        write!(self.out, "Profile:         {}\r\n", frame.profile)?;
        write!(self.out, "Current Speed:   {}\r\n", frame.speed)?;
        write!(self.out, "Drive State:     {:?}\r\n", frame.state)?;
        write!(self.out, "Last Key:        {}\r\n", last_key)?;
        match &frame.telemetry {
            Some(t) => {
                write!(self.out, "Battery Voltage: {}\r\n", t.battery_voltage)?;
                write!(self.out, "Motor Current:   {}\r\n", t.motor_current)?;
                write!(self.out, "Analog 1:        {}\r\n", t.analog1)?;
                write!(self.out, "Analog 2:        {}\r\n", t.analog2)?;
            }
            None => write!(self.out, "Telemetry:       (not polled yet)\r\n")?,
        }
        self.out.flush()
    }
}
