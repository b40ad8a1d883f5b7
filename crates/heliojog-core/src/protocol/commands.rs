//! Protocol commands
//!
//! The controller speaks a plain-text protocol: one newline-terminated command
//! per line, and at most one CRLF-terminated response line per query.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Motor output channel on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Motor 1 (`m1`)
    #[default]
    One,
    /// Motor 2 (`m2`)
    Two,
}

impl Channel {
    /// Channel number as used on the wire
    pub fn number(&self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }

    /// Command prefix, e.g. `m1`
    pub fn command_prefix(&self) -> &'static str {
        match self {
            Channel::One => "m1",
            Channel::Two => "m2",
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            other => Err(other),
        }
    }
}

/// Analog input on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalogInput {
    /// Input `a1`
    A1,
    /// Input `a2`
    A2,
}

impl AnalogInput {
    fn command_prefix(&self) -> &'static str {
        match self {
            AnalogInput::A1 => "a1",
            AnalogInput::A2 => "a2",
        }
    }

    fn response_tag(&self) -> &'static str {
        match self {
            AnalogInput::A1 => "A1: ",
            AnalogInput::A2 => "A2: ",
        }
    }
}

/// Commands understood by the controller's text protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Set the channel speed (`m1: <int>`)
    SetSpeed(Channel, i32),

    /// Disable the channel (`m1: shut down`)
    Stop(Channel),

    /// Enable the channel (`m1: start up`)
    Start(Channel),

    /// Read the channel's commanded speed (`m1: get`)
    QuerySpeed(Channel),

    /// Read battery voltage in 0.1 V (`m1: getb`)
    QueryBattery(Channel),

    /// Read channel current in 0.1 A (`m1: getc`)
    QueryCurrent(Channel),

    /// Read an analog input (`a1: get`)
    QueryAnalog(AnalogInput),
}

impl Command {
    /// The command text without line terminator
    pub fn text(&self) -> String {
        match self {
            Command::SetSpeed(ch, value) => format!("{}: {}", ch.command_prefix(), value),
            Command::Stop(ch) => format!("{}: shut down", ch.command_prefix()),
            Command::Start(ch) => format!("{}: start up", ch.command_prefix()),
            Command::QuerySpeed(ch) => format!("{}: get", ch.command_prefix()),
            Command::QueryBattery(ch) => format!("{}: getb", ch.command_prefix()),
            Command::QueryCurrent(ch) => format!("{}: getc", ch.command_prefix()),
            Command::QueryAnalog(input) => format!("{}: get", input.command_prefix()),
        }
    }

    /// Check if this command expects a response line
    pub fn expects_response(&self) -> bool {
        self.response_tag().is_some()
    }

    /// The fixed prefix the controller puts in front of the value it returns
    pub fn response_tag(&self) -> Option<ResponseTag> {
        let tag = match self {
            Command::SetSpeed(..) | Command::Stop(_) | Command::Start(_) => return None,
            Command::QuerySpeed(ch) => match ch {
                Channel::One => "M1: ",
                Channel::Two => "M2: ",
            },
            Command::QueryBattery(ch) => match ch {
                Channel::One => "M1:B",
                Channel::Two => "M2:B",
            },
            Command::QueryCurrent(ch) => match ch {
                Channel::One => "M1:C",
                Channel::Two => "M2:C",
            },
            Command::QueryAnalog(input) => input.response_tag(),
        };
        Some(ResponseTag(tag))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Response prefix identifying which field a line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTag(&'static str);

impl ResponseTag {
    /// The tag text, including any trailing space
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Strip the line terminator and the tag, returning the value text.
    ///
    /// Returns `None` when the line does not carry this tag, which includes the
    /// empty line the controller sends for commands it did not recognise.
    pub fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.trim()
            .strip_prefix(self.0.trim_end())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(Command::SetSpeed(Channel::One, -300).text(), "m1: -300");
        assert_eq!(Command::Stop(Channel::One).text(), "m1: shut down");
        assert_eq!(Command::Start(Channel::One).text(), "m1: start up");
        assert_eq!(Command::QueryBattery(Channel::One).text(), "m1: getb");
        assert_eq!(Command::QueryCurrent(Channel::Two).text(), "m2: getc");
        assert_eq!(Command::QueryAnalog(AnalogInput::A2).text(), "a2: get");
    }

    #[test]
    fn test_command_response() {
        assert!(Command::QuerySpeed(Channel::One).expects_response());
        assert!(Command::QueryAnalog(AnalogInput::A1).expects_response());
        assert!(!Command::SetSpeed(Channel::One, 0).expects_response());
        assert!(!Command::Stop(Channel::One).expects_response());
    }

    #[test]
    fn test_tag_strip() {
        let tag = Command::QueryBattery(Channel::One).response_tag().unwrap();
        assert_eq!(tag.strip("M1:B127\r\n"), Some("127"));
        assert_eq!(tag.strip("\r\n"), None);
        assert_eq!(tag.strip("M1:C21\r\n"), None);

        let tag = Command::QueryAnalog(AnalogInput::A2).response_tag().unwrap();
        assert_eq!(tag.strip("A2: -1043\r\n"), Some("-1043"));
        assert_eq!(tag.strip("A2:"), None);
    }

    #[test]
    fn test_channel_from_number() {
        assert_eq!(Channel::try_from(1), Ok(Channel::One));
        assert_eq!(Channel::try_from(2), Ok(Channel::Two));
        assert_eq!(Channel::try_from(3), Err(3));
    }
}
