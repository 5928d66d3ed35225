//! Caller-side command policy: clamped setters, toggles, stepped
//! adjustments and indicator exclusion, composed over the session's
//! `send`/`last` API.

use crate::registry::CommandValue;
use crate::{ControlError, ControlSession};

// Cockpit adjustment steps and windows.
const BRAKE_BIAS_STEP: f32 = 0.005;
const BRAKE_BIAS_ADJUST_MIN: f32 = 0.4;
const BRAKE_BIAS_ADJUST_MAX: f32 = 0.7;
const TURBO_STEP: f32 = 0.1;

pub struct VehicleCommands<'a> {
    session: &'a ControlSession,
}

impl<'a> VehicleCommands<'a> {
    pub fn new(session: &'a ControlSession) -> Self {
        Self { session }
    }

    /// Traction control level, clamped to 0-10.
    pub async fn set_tc_level(&self, level: i32) -> Result<(), ControlError> {
        self.session
            .send("tc_level", CommandValue::Int(level.clamp(0, 10)))
            .await
    }

    /// ABS level, clamped to 0-10.
    pub async fn set_abs_level(&self, level: i32) -> Result<(), ControlError> {
        self.session
            .send("abs_level", CommandValue::Int(level.clamp(0, 10)))
            .await
    }

    /// Brake bias, 0.0 = rear, 1.0 = front.
    pub async fn set_brake_bias(&self, bias: f32) -> Result<(), ControlError> {
        self.session
            .send("brake_bias", CommandValue::Float(bias.clamp(0.0, 1.0)))
            .await
    }

    /// Turbo pressure in bar, clamped to 0.0-3.0.
    pub async fn set_turbo_pressure(&self, bar: f32) -> Result<(), ControlError> {
        self.session
            .send("turbo_pressure", CommandValue::Float(bar.clamp(0.0, 3.0)))
            .await
    }

    /// Engine map slot, clamped to 1-8.
    pub async fn set_engine_map(&self, map: i32) -> Result<(), ControlError> {
        self.session
            .send("engine_map", CommandValue::Int(map.clamp(1, 8)))
            .await
    }

    /// Flips a boolean command from its last sent value (off if never
    /// sent) and returns the new state.
    pub async fn toggle(&self, command: &str) -> Result<bool, ControlError> {
        let current = matches!(
            self.session.last(command).map(|rec| rec.value),
            Some(CommandValue::Bool(true))
        );
        let next = !current;
        self.session.send(command, CommandValue::Bool(next)).await?;
        Ok(next)
    }

    /// Nudges brake bias by half-percent steps inside the adjustable
    /// window and returns the value sent.
    pub async fn adjust_brake_bias(&self, steps: i32) -> Result<f32, ControlError> {
        let current = self.last_float("brake_bias").unwrap_or(0.0);
        let next = (current + steps as f32 * BRAKE_BIAS_STEP)
            .clamp(BRAKE_BIAS_ADJUST_MIN, BRAKE_BIAS_ADJUST_MAX);
        self.session
            .send("brake_bias", CommandValue::Float(next))
            .await?;
        Ok(next)
    }

    /// Nudges turbo pressure by 0.1 bar steps and returns the value sent.
    pub async fn adjust_turbo_pressure(&self, steps: i32) -> Result<f32, ControlError> {
        let current = self.last_float("turbo_pressure").unwrap_or(0.0);
        let next = (current + steps as f32 * TURBO_STEP).clamp(0.0, 3.0);
        self.session
            .send("turbo_pressure", CommandValue::Float(next))
            .await?;
        Ok(next)
    }

    /// Indicators are mutually exclusive: the opposite side is switched
    /// off first when it was last seen on.
    pub async fn indicate_left(&self) -> Result<(), ControlError> {
        self.clear_if_on("right_indicator").await?;
        self.session
            .send("left_indicator", CommandValue::Bool(true))
            .await
    }

    pub async fn indicate_right(&self) -> Result<(), ControlError> {
        self.clear_if_on("left_indicator").await?;
        self.session
            .send("right_indicator", CommandValue::Bool(true))
            .await
    }

    pub async fn indicators_off(&self) -> Result<(), ControlError> {
        self.clear_if_on("left_indicator").await?;
        self.clear_if_on("right_indicator").await
    }

    /// One-shot trigger.
    pub async fn open_pit_menu(&self) -> Result<(), ControlError> {
        self.session
            .send("open_pit_menu", CommandValue::Bool(true))
            .await
    }

    async fn clear_if_on(&self, command: &str) -> Result<(), ControlError> {
        if let Some(rec) = self.session.last(command) {
            if rec.value == CommandValue::Bool(true) {
                self.session.send(command, CommandValue::Bool(false)).await?;
            }
        }
        Ok(())
    }

    fn last_float(&self, command: &str) -> Option<f32> {
        match self.session.last(command)?.value {
            CommandValue::Float(v) => Some(v),
            CommandValue::Int(v) => Some(v as f32),
            CommandValue::Bool(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode_command;
    use crate::tests::{recv_packet, session_with_listener};

    #[tokio::test]
    async fn toggle_starts_off_and_flips() {
        let (session, listener) = session_with_listener().await;
        let cockpit = VehicleCommands::new(&session);

        assert!(cockpit.toggle("headlights").await.unwrap());
        let packet = recv_packet(&listener).await;
        assert_eq!(decode_command(&packet), Some((5, CommandValue::Bool(true))));

        assert!(!cockpit.toggle("headlights").await.unwrap());
        let packet = recv_packet(&listener).await;
        assert_eq!(decode_command(&packet), Some((5, CommandValue::Bool(false))));
    }

    #[tokio::test]
    async fn levels_are_clamped_before_sending() {
        let (session, listener) = session_with_listener().await;
        let cockpit = VehicleCommands::new(&session);

        cockpit.set_tc_level(42).await.unwrap();
        let packet = recv_packet(&listener).await;
        assert_eq!(decode_command(&packet), Some((1, CommandValue::Int(10))));

        cockpit.set_engine_map(0).await.unwrap();
        let packet = recv_packet(&listener).await;
        assert_eq!(decode_command(&packet), Some((12, CommandValue::Int(1))));
    }

    #[tokio::test]
    async fn brake_bias_adjust_stays_in_window() {
        let (session, listener) = session_with_listener().await;
        let cockpit = VehicleCommands::new(&session);

        // no prior record: one step up lands on the window floor
        let sent = cockpit.adjust_brake_bias(1).await.unwrap();
        assert_eq!(sent, 0.4);
        recv_packet(&listener).await;

        let sent = cockpit.adjust_brake_bias(2).await.unwrap();
        assert!((sent - 0.41).abs() < 1e-6);
        recv_packet(&listener).await;

        let sent = cockpit.adjust_brake_bias(1000).await.unwrap();
        assert_eq!(sent, 0.7);
    }

    #[tokio::test]
    async fn enabling_one_indicator_clears_the_other_first() {
        let (session, listener) = session_with_listener().await;
        let cockpit = VehicleCommands::new(&session);

        cockpit.indicate_right().await.unwrap();
        let packet = recv_packet(&listener).await;
        assert_eq!(decode_command(&packet), Some((7, CommandValue::Bool(true))));

        cockpit.indicate_left().await.unwrap();
        let first = recv_packet(&listener).await;
        let second = recv_packet(&listener).await;
        assert_eq!(decode_command(&first), Some((7, CommandValue::Bool(false))));
        assert_eq!(decode_command(&second), Some((6, CommandValue::Bool(true))));
    }

    #[tokio::test]
    async fn indicators_off_only_clears_what_was_on() {
        let (session, listener) = session_with_listener().await;
        let cockpit = VehicleCommands::new(&session);

        cockpit.indicate_left().await.unwrap();
        recv_packet(&listener).await;

        cockpit.indicators_off().await.unwrap();
        let packet = recv_packet(&listener).await;
        assert_eq!(decode_command(&packet), Some((6, CommandValue::Bool(false))));

        let mut buf = [0u8; 16];
        let quiet = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            listener.recv_from(&mut buf),
        )
        .await;
        assert!(quiet.is_err());
    }
}
