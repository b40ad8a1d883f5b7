//! Interactive jog session
//!
//! Ties a [`MotorClient`] to an [`InputSource`] and a [`Renderer`]: redraw,
//! wait for a key, act on it, and poll telemetry only when the wait expired.
//! However the loop ends, the motor is stopped before [`run_session`]
//! returns, and also if the loop unwinds from a panic.

use std::io;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::input::{InputPoll, InputSource, KeyEvent};
use crate::profile::SpeedProfile;
use crate::protocol::{
    Channel, DeviceTransport, DriveState, MotorClient, ProtocolError, TelemetrySample,
};

/// Snapshot handed to the renderer on every redraw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFrame {
    /// Channel being jogged
    pub channel: Channel,
    /// Active step and bounds
    pub profile: SpeedProfile,
    /// Last commanded speed
    pub speed: i32,
    /// Started up or shut down
    pub state: DriveState,
    /// Most recent key, `None` before the first one
    pub last_key: Option<KeyEvent>,
    /// Latest idle poll
    pub telemetry: Option<TelemetrySample>,
}

/// Sink that clears the screen and shows the current state
pub trait Renderer {
    /// Replace whatever is shown with `frame`
    fn render(&mut self, frame: &StatusFrame) -> io::Result<()>;
}

/// Stops the motor when dropped unless [`StopGuard::finish`] already did
pub struct StopGuard<'a, T: DeviceTransport> {
    client: &'a mut MotorClient<T>,
    armed: bool,
}

impl<'a, T: DeviceTransport> StopGuard<'a, T> {
    /// Arm a guard over `client`
    pub fn new(client: &'a mut MotorClient<T>) -> Self {
        Self {
            client,
            armed: true,
        }
    }

    /// Stop the motor now and report whether that worked
    pub fn finish(mut self) -> Result<(), ProtocolError> {
        self.armed = false;
        self.client.stop()
    }
}

impl<T: DeviceTransport> Deref for StopGuard<'_, T> {
    type Target = MotorClient<T>;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl<T: DeviceTransport> DerefMut for StopGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
    }
}

impl<T: DeviceTransport> Drop for StopGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.client.stop() {
                tracing::error!("failed to stop motor during unwind: {}", e);
            }
        }
    }
}

/// Run the jog loop until the operator quits or something fails.
///
/// The channel is started up first and one idle poll fills the display.
/// `input_wait` bounds each key read; an expired wait triggers the next idle
/// poll. On every exit path the motor is stopped. If the loop failed, that
/// error is returned even when the stop fails too (the stop failure is
/// logged).
pub fn run_session<T, I, R>(
    client: &mut MotorClient<T>,
    input: &mut I,
    renderer: &mut R,
    input_wait: Duration,
) -> Result<(), ProtocolError>
where
    T: DeviceTransport,
    I: InputSource + ?Sized,
    R: Renderer + ?Sized,
{
    let mut guard = StopGuard::new(client);
    let outcome = jog_loop(&mut *guard, input, renderer, input_wait);
    let stopped = guard.finish();

    match (outcome, stopped) {
        (Err(e), Err(stop_err)) => {
            tracing::error!("failed to stop motor after session error: {}", stop_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), stopped) => stopped,
    }
}

fn jog_loop<T, I, R>(
    client: &mut MotorClient<T>,
    input: &mut I,
    renderer: &mut R,
    input_wait: Duration,
) -> Result<(), ProtocolError>
where
    T: DeviceTransport,
    I: InputSource + ?Sized,
    R: Renderer + ?Sized,
{
    client.start()?;
    let mut telemetry = Some(client.poll_idle()?);
    let mut last_key = None;

    loop {
        renderer.render(&StatusFrame {
            channel: client.channel(),
            profile: client.profile(),
            speed: client.speed(),
            state: client.state(),
            last_key,
            telemetry,
        })?;

        let key = match input.poll_key(input_wait)? {
            InputPoll::Timeout => {
                telemetry = Some(client.poll_idle()?);
                continue;
            }
            InputPoll::Key(key) => key,
        };
        last_key = Some(key);
        tracing::debug!(%key, "key");

        match key {
            KeyEvent::Quit => return Ok(()),
            KeyEvent::Up => client.increment()?,
            KeyEvent::Down => client.decrement()?,
            KeyEvent::Tab => client.start()?,
            KeyEvent::Enter => client.stop()?,
            KeyEvent::Other(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use crate::simulator::SimulatedDevice;

    #[derive(Default)]
    struct FrameLog(Vec<StatusFrame>);

    impl Renderer for FrameLog {
        fn render(&mut self, frame: &StatusFrame) -> io::Result<()> {
            self.0.push(*frame);
            Ok(())
        }
    }

    #[test]
    fn test_guard_stops_on_drop() {
        let mut client = MotorClient::new(SimulatedDevice::new(), SpeedProfile::FINE);
        {
            let mut guard = StopGuard::new(&mut client);
            guard.start().unwrap();
            guard.set_speed(900).unwrap();
        }
        assert_eq!(client.speed(), 0);
        assert_eq!(client.state(), DriveState::Idle);
        let history = client.transport().history();
        assert_eq!(&history[history.len() - 2..], ["m1: 0", "m1: shut down"]);
    }

    #[test]
    fn test_frames_show_channel_and_profile() {
        let mut client = MotorClient::new(SimulatedDevice::new(), SpeedProfile::COARSE)
            .with_channel(Channel::Two);
        let mut input = ScriptedInput::new([InputPoll::Key(KeyEvent::Down)]);
        let mut frames = FrameLog::default();

        run_session(&mut client, &mut input, &mut frames, Duration::from_millis(1)).unwrap();

        assert!(frames
            .0
            .iter()
            .all(|f| f.channel == Channel::Two && f.profile == SpeedProfile::COARSE));
        assert_eq!(frames.0[1].speed, -5);
    }

    #[test]
    fn test_quit_renders_and_stops() {
        let mut client = MotorClient::new(SimulatedDevice::new(), SpeedProfile::FINE);
        let mut input = ScriptedInput::new([
            InputPoll::Key(KeyEvent::Up),
            InputPoll::Key(KeyEvent::Quit),
        ]);
        let mut frames = FrameLog::default();

        run_session(&mut client, &mut input, &mut frames, Duration::from_millis(1)).unwrap();

        assert_eq!(frames.0.len(), 2);
        assert_eq!(frames.0[0].channel, Channel::One);
        assert_eq!(frames.0[0].profile, SpeedProfile::FINE);
        assert_eq!(frames.0[0].speed, 0);
        assert_eq!(frames.0[0].last_key, None);
        assert_eq!(frames.0[1].speed, 100);
        assert_eq!(frames.0[1].last_key, Some(KeyEvent::Up));
        assert_eq!(client.speed(), 0);
    }
}
