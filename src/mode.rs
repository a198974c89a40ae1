//! Central mode state machine
//!
//! Interprets integrated input events against the current UI mode and turns
//! them into LED commands.
//!
//! | Mode         | Click      | DoubleClick  | LongClick   | VeryLongClick | Encoder            |
//! |--------------|------------|--------------|-------------|---------------|--------------------|
//! | Off          | on         | on           | on          | on            |                    |
//! | Display      | off        | EffectSelect | EffectSetup | SystemSetup   | brightness         |
//! | EffectSelect | commit     | cancel       |             |               | preview effect     |
//! | EffectSetup  | next param | cancel       | commit      | sync + commit | adjust param       |
//! | SystemSetup  | next param | cancel       | commit      | factory reset | adjust calibration |
//!
//! Setup and select modes auto-commit after a mode specific period without
//! input. Anything not in the table is ignored and leaves the mode alone.

use embassy_time::{Duration, Instant, with_timeout};
use heapless::Vec;

use crate::command::{CommandSender, LedCommand, LedCommandKind};
use crate::input::{ButtonEvent, ClickKind, InputEvent, SwitchEvent, TouchEvent, TouchKind};
use crate::integrator::{IntegratedEvent, IntegratedReceiver};
use crate::logging::log;
use crate::math8::elapsed_since;

/// Most commands a single transition emits
pub const MAX_COMMANDS: usize = 4;

/// Commands emitted by one transition
pub type Commands = Vec<LedCommand, MAX_COMMANDS>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemMode {
    #[default]
    Off,
    Display,
    EffectSelect,
    EffectSetup,
    SystemSetup,
}

impl SystemMode {
    /// A transactional configuration mode is open
    pub const fn is_setup(self) -> bool {
        matches!(self, Self::EffectSelect | Self::EffectSetup | Self::SystemSetup)
    }
}

/// Role of this fixture in a synced group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRole {
    /// Broadcasts its state when sync is enabled
    Coordinator,
    #[default]
    Peer,
}

#[derive(Debug, Clone)]
pub struct ModeConfig {
    pub role: DeviceRole,
    pub effect_select_timeout_ms: u64,
    pub effect_setup_timeout_ms: u64,
    pub system_setup_timeout_ms: u64,
    /// Bounded wait on the event queue, also the timeout check period
    pub receive_timeout_ms: u64,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            role: DeviceRole::Peer,
            effect_select_timeout_ms: 10_000,
            effect_setup_timeout_ms: 15_000,
            system_setup_timeout_ms: 30_000,
            receive_timeout_ms: 100,
        }
    }
}

impl ModeConfig {
    /// Inactivity deadline of `mode`, `None` for modes without one
    pub fn timeout(&self, mode: SystemMode) -> Option<Duration> {
        let ms = match mode {
            SystemMode::Off | SystemMode::Display => return None,
            SystemMode::EffectSelect => self.effect_select_timeout_ms,
            SystemMode::EffectSetup => self.effect_setup_timeout_ms,
            SystemMode::SystemSetup => self.system_setup_timeout_ms,
        };
        Some(Duration::from_millis(ms))
    }
}

pub struct ModeMachine {
    config: ModeConfig,
    mode: SystemMode,
    last_event: Instant,
}

impl ModeMachine {
    pub const fn new(config: ModeConfig) -> Self {
        Self {
            config,
            mode: SystemMode::Off,
            last_event: Instant::from_ticks(0),
        }
    }

    pub const fn mode(&self) -> SystemMode {
        self.mode
    }

    pub const fn config(&self) -> &ModeConfig {
        &self.config
    }

    /// Align with the persisted power state at boot
    pub fn restore(&mut self, is_on: bool) {
        self.mode = if is_on {
            SystemMode::Display
        } else {
            SystemMode::Off
        };
    }

    /// Dispatch one event. `None` means the event was not handled in the
    /// current mode.
    pub fn handle(&mut self, event: &IntegratedEvent) -> Option<Commands> {
        let at = event.timestamp;
        let (next, commands) = match event.event {
            InputEvent::Button(button) => self.on_button(button, at)?,
            InputEvent::Encoder(encoder) => (self.mode, self.on_encoder(encoder.steps, at)?),
            InputEvent::Touch(touch) => self.on_touch(touch, at)?,
            InputEvent::Switch(switch) => (self.mode, self.on_switch(switch, at)),
            InputEvent::Remote(command) => self.on_remote(command, at),
        };
        self.enter(next);
        self.last_event = at;
        Some(commands)
    }

    /// Auto-commit an open mode once its inactivity deadline has passed.
    pub fn check_timeout(&mut self, now: Instant) -> Option<Commands> {
        let deadline = self.config.timeout(self.mode)?;
        if elapsed_since(now, self.last_event) <= deadline {
            return None;
        }
        log!("[mode] {:?} timed out", self.mode);
        self.enter(SystemMode::Display);
        self.last_event = now;
        Some(commands(&[
            LedCommand::new(LedCommandKind::SaveConfig, now),
            LedCommand::new(LedCommandKind::FeedbackConfirm, now),
        ]))
    }

    fn enter(&mut self, next: SystemMode) {
        if next != self.mode {
            log!("[mode] {:?} -> {:?}", self.mode, next);
            self.mode = next;
        }
    }

    fn on_button(&self, button: ButtonEvent, at: Instant) -> Option<(SystemMode, Commands)> {
        use LedCommandKind as K;
        use SystemMode as M;

        let cmd = |kind| LedCommand::new(kind, at);
        let result = match (self.mode, button.kind) {
            (_, ClickKind::None | ClickKind::Error) => (self.mode, commands(&[cmd(K::FeedbackError)])),
            (M::Off, _) => (M::Display, commands(&[cmd(K::TurnOn)])),

            (M::Display, ClickKind::Click) => (M::Off, commands(&[cmd(K::TurnOff)])),
            (M::Display, ClickKind::DoubleClick) => (
                M::EffectSelect,
                commands(&[cmd(K::EnterEffectSelect), cmd(K::FeedbackEffectColor)]),
            ),
            (M::Display, ClickKind::LongClick) => (
                M::EffectSetup,
                commands(&[cmd(K::EnterEffectSetup), cmd(K::FeedbackSetupColor)]),
            ),
            (M::Display, ClickKind::VeryLongClick) => (
                M::SystemSetup,
                commands(&[cmd(K::EnterSystemSetup), cmd(K::FeedbackSystemColor)]),
            ),

            (M::EffectSelect, ClickKind::Click) => {
                (M::Display, commands(&[cmd(K::SaveConfig), cmd(K::FeedbackConfirm)]))
            }
            (M::EffectSelect | M::EffectSetup | M::SystemSetup, ClickKind::DoubleClick) => {
                (M::Display, commands(&[cmd(K::CancelConfig), cmd(K::FeedbackCancel)]))
            }

            (M::EffectSetup | M::SystemSetup, ClickKind::Click) => {
                (self.mode, commands(&[cmd(K::NextParam), cmd(K::FeedbackParam)]))
            }
            (M::EffectSetup | M::SystemSetup, ClickKind::LongClick) => {
                (M::Display, commands(&[cmd(K::SaveConfig), cmd(K::FeedbackConfirm)]))
            }
            (M::EffectSetup, ClickKind::VeryLongClick) => {
                (M::Display, commands(&[cmd(K::SyncAndSave), cmd(K::FeedbackSync)]))
            }
            (M::SystemSetup, ClickKind::VeryLongClick) => {
                (M::Display, commands(&[cmd(K::FactoryReset), cmd(K::FeedbackConfirm)]))
            }

            (M::EffectSelect, ClickKind::LongClick | ClickKind::VeryLongClick) => return None,
        };
        Some(result)
    }

    fn on_encoder(&self, steps: i16, at: Instant) -> Option<Commands> {
        let kind = match self.mode {
            SystemMode::Off => return None,
            SystemMode::Display => LedCommandKind::AdjustBrightness,
            SystemMode::EffectSelect => LedCommandKind::StepEffect,
            SystemMode::EffectSetup => LedCommandKind::AdjustEffectParam,
            SystemMode::SystemSetup => LedCommandKind::AdjustCalibration,
        };
        Some(commands(&[LedCommand::new(kind, at).with_value(steps)]))
    }

    fn on_touch(&self, touch: TouchEvent, at: Instant) -> Option<(SystemMode, Commands)> {
        let result = match (self.mode, touch.kind) {
            (SystemMode::Off, TouchKind::Press) => (
                SystemMode::Display,
                commands(&[LedCommand::new(LedCommandKind::TurnOn, at)]),
            ),
            (SystemMode::Display, TouchKind::Press) => (
                SystemMode::Display,
                commands(&[LedCommand::new(LedCommandKind::StepEffect, at).with_value(1)]),
            ),
            (SystemMode::Display, TouchKind::Hold) => (
                SystemMode::Off,
                commands(&[LedCommand::new(LedCommandKind::TurnOff, at)]),
            ),
            _ => return None,
        };
        Some(result)
    }

    fn on_switch(&self, switch: SwitchEvent, at: Instant) -> Commands {
        let value = i16::from(switch.closed);
        let mut emitted = commands(&[LedCommand::new(LedCommandKind::SetMasked, at).with_value(value)]);
        if self.config.role == DeviceRole::Coordinator {
            let _ = emitted.push(LedCommand::new(LedCommandKind::SetSyncEnabled, at).with_value(value));
        }
        emitted
    }

    /// Peer commands close any open setup mode without saving, then apply.
    fn on_remote(&self, command: LedCommand, at: Instant) -> (SystemMode, Commands) {
        let mut emitted = Commands::new();
        let mut next = self.mode;
        if self.mode.is_setup() {
            log!("[mode] remote command closes {:?}", self.mode);
            let _ = emitted.push(LedCommand::new(LedCommandKind::CancelConfig, at));
            next = SystemMode::Display;
        }
        match command.kind {
            LedCommandKind::TurnOn => next = SystemMode::Display,
            LedCommandKind::TurnOff => next = SystemMode::Off,
            _ => {}
        }
        let _ = emitted.push(command);
        (next, emitted)
    }
}

fn commands(list: &[LedCommand]) -> Commands {
    list.iter().copied().take(MAX_COMMANDS).collect()
}

/// Mode task.
///
/// Waits on the integrated queue for at most `receive_timeout_ms` so that
/// mode deadlines are serviced even without input.
pub async fn run_mode<const IN_SIZE: usize, const CMD_SIZE: usize>(
    mut machine: ModeMachine,
    events: IntegratedReceiver<'_, IN_SIZE>,
    commands: CommandSender<'_, CMD_SIZE>,
) {
    let receive_timeout = Duration::from_millis(machine.config.receive_timeout_ms);
    loop {
        let emitted = match with_timeout(receive_timeout, events.receive()).await {
            Ok(event) => machine
                .handle(&event)
                .or_else(|| machine.check_timeout(event.timestamp)),
            Err(_) => machine.check_timeout(Instant::now()),
        };
        for command in emitted.into_iter().flatten() {
            commands.send(command).await;
        }
    }
}
