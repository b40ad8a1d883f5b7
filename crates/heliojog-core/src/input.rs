//! Operator input
//!
//! The jog loop reads keys with a bounded wait. A wait that expires without a
//! key is an ordinary outcome ([`InputPoll::Timeout`]) that the loop answers
//! with an idle telemetry poll.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::protocol::ProtocolError;

/// Keys the jog loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Arrow up: speed up one step
    Up,
    /// Arrow down: slow down one step
    Down,
    /// `q`: leave the session
    Quit,
    /// Tab: start the channel up
    Tab,
    /// Enter, Return or Space: stop the motor
    Enter,
    /// Anything else, ignored
    Other(char),
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEvent::Up => f.write_str("Up"),
            KeyEvent::Down => f.write_str("Down"),
            KeyEvent::Quit => f.write_str("q"),
            KeyEvent::Tab => f.write_str("Tab"),
            KeyEvent::Enter => f.write_str("Enter"),
            KeyEvent::Other(c) => write!(f, "{}", c.escape_debug()),
        }
    }
}

/// Result of one bounded-wait read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPoll {
    /// A key arrived
    Key(KeyEvent),
    /// No key arrived within the wait
    Timeout,
}

/// Source of operator key presses
pub trait InputSource {
    /// Wait up to `wait` for the next key
    fn poll_key(&mut self, wait: Duration) -> Result<InputPoll, ProtocolError>;
}

/// Map a plain character to its key
pub fn key_for_char(c: char) -> KeyEvent {
    match c {
        'q' => KeyEvent::Quit,
        '\t' => KeyEvent::Tab,
        '\n' | '\r' | ' ' => KeyEvent::Enter,
        other => KeyEvent::Other(other),
    }
}

/// Decode raw terminal bytes into keys.
///
/// Arrow keys arrive as `ESC [ A` (up) and `ESC [ B` (down). Any other escape
/// sequence is rejected as a protocol violation rather than guessed at.
pub fn decode_keys(bytes: &[u8]) -> Result<Vec<KeyEvent>, ProtocolError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProtocolError::ProtocolViolation(format!("input is not UTF-8: {}", e)))?;

    let mut keys = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            keys.push(key_for_char(c));
            continue;
        }
        match chars.next() {
            Some('[') => {}
            other => return Err(unhandled_escape(other)),
        }
        match chars.next() {
            Some('A') => keys.push(KeyEvent::Up),
            Some('B') => keys.push(KeyEvent::Down),
            other => return Err(unhandled_escape(other)),
        }
    }
    Ok(keys)
}

fn unhandled_escape(c: Option<char>) -> ProtocolError {
    match c {
        Some(c) => ProtocolError::ProtocolViolation(format!(
            "unhandled escape sequence: {}",
            c.escape_debug()
        )),
        None => ProtocolError::ProtocolViolation("truncated escape sequence".into()),
    }
}

/// Input source replaying a fixed list of polls, then quitting
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<InputPoll>,
}

impl ScriptedInput {
    /// Replay `events` in order
    pub fn new(events: impl IntoIterator<Item = InputPoll>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Script from raw terminal bytes, e.g. input piped on stdin
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let keys = decode_keys(bytes)?;
        Ok(Self::new(keys.into_iter().map(InputPoll::Key)))
    }

    /// Polls not yet handed out
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll_key(&mut self, _wait: Duration) -> Result<InputPoll, ProtocolError> {
        Ok(self
            .events
            .pop_front()
            .unwrap_or(InputPoll::Key(KeyEvent::Quit)))
    }
}
