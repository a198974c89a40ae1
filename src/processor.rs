//! LED command processing
//!
//! The processor is the only owner of the effect table, the calibration and
//! the master brightness. It applies one [`LedCommand`] at a time and hands
//! the renderer an immutable [`Scene`] snapshot whenever the visible state
//! changed.
//!
//! Setup modes are transactional: entering one snapshots the state it may
//! touch, `CancelConfig` restores the snapshot and `SaveConfig` discards it
//! and persists the live values.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;

use crate::calibration::{CALIBRATION_PARAM_COUNT, SystemCalibration};
use crate::channel::{Latest, offer};
use crate::command::{CommandReceiver, LedCommand, LedCommandKind};
use crate::effect::{Adjustment, EffectId, EffectRegistry, MAX_PARAMS, ParamValues, Parameter};
use crate::feedback::{Feedback, FeedbackRun};
use crate::logging::log;
use crate::math8::elapsed_since;
use crate::storage::{DEFAULT_BRIGHTNESS, StaticState, Storage, VolatileState};
use crate::sync::{SyncMessage, SyncSender};

/// Most commands one applied command can broadcast (effect, its params, save)
pub const MAX_BROADCAST: usize = MAX_PARAMS + 2;

/// Lowest brightness reachable with the encoder
const MIN_ADJUST_BRIGHTNESS: i32 = 1;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Brightness change per encoder step
    pub brightness_step: u8,
    /// Quiet period after a brightness change before it is persisted
    pub save_delay_ms: u64,
    /// Initial state of outbound sync
    pub sync_enabled: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            brightness_step: 8,
            save_delay_ms: 3000,
            sync_enabled: false,
        }
    }
}

/// Everything the renderer needs to draw a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub is_on: bool,
    /// Target master brightness, the renderer fades towards it
    pub brightness: u8,
    pub min_brightness: u8,
    pub effect: EffectId,
    pub params: ParamValues,
    /// Restrict rendering to the calibrated window
    pub masked: bool,
    pub start_offset: u16,
    pub end_offset: u16,
    pub feedback: Option<FeedbackRun>,
}

/// Result of applying one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The scene changed and the renderer must be woken
    pub dirty: bool,
    /// Dropped because a feedback blink is showing
    pub suppressed: bool,
    /// Command the processor issues to itself (limit feedback)
    pub follow_up: Option<LedCommand>,
    /// Commands to mirror to peers
    pub broadcast: Vec<LedCommand, MAX_BROADCAST>,
}

pub struct CommandProcessor<S> {
    storage: S,
    config: ProcessorConfig,
    registry: EffectRegistry,
    calibration: SystemCalibration,

    is_on: bool,
    brightness: u8,
    effect_index: usize,
    masked: bool,
    sync_enabled: bool,
    selected_param: usize,
    feedback: Option<FeedbackRun>,

    // Temp snapshots, present only while the matching mode is open
    selection_snapshot: Option<usize>,
    params_snapshot: Option<(usize, ParamValues)>,
    calibration_snapshot: Option<SystemCalibration>,

    save_deadline: Option<Instant>,
}

impl<S: Storage> CommandProcessor<S> {
    /// Seed the live state from storage.
    ///
    /// Missing or unreadable records leave the defaults in place.
    pub fn new(mut storage: S, mut registry: EffectRegistry, config: ProcessorConfig) -> Self {
        let mut calibration = SystemCalibration::default();
        match storage.load_static() {
            Ok(state) => state.apply(&mut calibration, &mut registry),
            Err(err) => log!("[processor] static state not loaded: {}", err),
        }
        let volatile = storage.load_volatile().unwrap_or_else(|err| {
            log!("[processor] volatile state not loaded: {}", err);
            VolatileState::default()
        });
        let effect_index = usize::from(volatile.effect_index).min(registry.len().saturating_sub(1));

        Self {
            storage,
            sync_enabled: config.sync_enabled,
            config,
            registry,
            calibration,
            is_on: volatile.is_on,
            brightness: volatile.brightness,
            effect_index,
            masked: false,
            selected_param: 0,
            feedback: None,
            selection_snapshot: None,
            params_snapshot: None,
            calibration_snapshot: None,
            save_deadline: None,
        }
    }

    pub const fn is_on(&self) -> bool {
        self.is_on
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn effect_index(&self) -> usize {
        self.effect_index
    }

    pub const fn selected_param(&self) -> usize {
        self.selected_param
    }

    pub const fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub const fn calibration(&self) -> &SystemCalibration {
        &self.calibration
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// A setup or select transaction is open
    pub const fn has_snapshot(&self) -> bool {
        self.selection_snapshot.is_some()
            || self.params_snapshot.is_some()
            || self.calibration_snapshot.is_some()
    }

    pub fn is_feedback_active(&self, now: Instant) -> bool {
        self.feedback.is_some_and(|run| run.is_active(now))
    }

    /// Current render snapshot
    pub fn scene(&self) -> Scene {
        let (effect, params) = match self.registry.get(self.effect_index) {
            Some(entry) => (entry.id, entry.values()),
            None => (EffectId::Static, ParamValues::new()),
        };
        Scene {
            is_on: self.is_on,
            brightness: self.brightness,
            min_brightness: self.calibration.min_brightness(),
            effect,
            params,
            // System setup always shows the window being calibrated
            masked: self.masked || self.calibration_snapshot.is_some(),
            start_offset: self.calibration.start_offset(),
            end_offset: self.calibration.end_offset(),
            feedback: self.feedback,
        }
    }

    /// Apply one command received at `now`.
    pub fn apply(&mut self, command: &LedCommand, now: Instant) -> Outcome {
        let mut outcome = Outcome::default();
        if command.kind.is_suppressible() && self.is_feedback_active(now) {
            log!("[processor] {:?} suppressed by feedback", command.kind);
            outcome.suppressed = true;
            return outcome;
        }

        let before = self.scene();
        let mut limit_hit = false;

        match command.kind {
            LedCommandKind::TurnOn => self.set_power(true),
            LedCommandKind::TurnOff => self.set_power(false),
            LedCommandKind::SetBrightness => {
                let clamped = command.value.clamp(0, i16::from(u8::MAX));
                if clamped != command.value {
                    log!("[processor] brightness {} clamped", command.value);
                }
                self.set_brightness(clamped, now);
            }
            LedCommandKind::AdjustBrightness => {
                let raw = i32::from(self.brightness)
                    + i32::from(command.value) * i32::from(self.config.brightness_step);
                limit_hit = !(MIN_ADJUST_BRIGHTNESS..=i32::from(u8::MAX)).contains(&raw);
                let value = raw.clamp(MIN_ADJUST_BRIGHTNESS, i32::from(u8::MAX));
                self.set_brightness(i16::try_from(value).unwrap_or(i16::MAX), now);
            }
            LedCommandKind::SetEffect => self.set_effect(command.value, now),
            LedCommandKind::StepEffect => self.step_effect(command.value, now),
            LedCommandKind::EnterEffectSelect => {
                if self.selection_snapshot.is_none() {
                    self.selection_snapshot = Some(self.effect_index);
                }
            }
            LedCommandKind::EnterEffectSetup => {
                if self.params_snapshot.is_none() {
                    let values = self.active_values();
                    self.params_snapshot = Some((self.effect_index, values));
                }
                self.selected_param = 0;
            }
            LedCommandKind::EnterSystemSetup => {
                if self.calibration_snapshot.is_none() {
                    self.calibration_snapshot = Some(self.calibration);
                }
                self.selected_param = 0;
            }
            LedCommandKind::SetEffectParam => {
                let index = usize::from(command.param);
                match self.active_param(index) {
                    Some(param) => {
                        param.set(command.value);
                    }
                    None => log!("[processor] no parameter {}", index),
                }
            }
            LedCommandKind::AdjustEffectParam => {
                let index = self.selected_param;
                if let Some(param) = self.active_param(index) {
                    let Adjustment { value, limit_hit: hit } = param.adjust(command.value);
                    log!("[processor] param {} -> {}", index, value);
                    limit_hit = hit;
                }
            }
            LedCommandKind::AdjustCalibration => {
                if let Some(adjustment) = self.calibration.adjust(self.selected_param, command.value) {
                    log!("[processor] calibration {} -> {}", self.selected_param, adjustment.value);
                    limit_hit = adjustment.limit_hit;
                }
            }
            LedCommandKind::NextParam => {
                let count = if self.calibration_snapshot.is_some() {
                    CALIBRATION_PARAM_COUNT
                } else {
                    self.active_values().len()
                };
                if count > 0 {
                    self.selected_param = (self.selected_param + 1) % count;
                }
            }
            LedCommandKind::CancelConfig => self.cancel(),
            LedCommandKind::SaveConfig => {
                let selected_from = self.selection_snapshot;
                self.commit();
                // Peers never saw the previews, only the committed choice
                if self.sync_enabled && selected_from.is_some_and(|from| from != self.effect_index) {
                    let _ = outcome.broadcast.push(self.effect_command(now));
                }
            }
            LedCommandKind::SyncAndSave => {
                self.commit();
                outcome.broadcast = self.full_sync(now);
            }
            LedCommandKind::FactoryReset => self.factory_reset(),
            LedCommandKind::SetMasked => self.masked = command.value != 0,
            LedCommandKind::SetSyncEnabled => self.sync_enabled = command.value != 0,
            LedCommandKind::FeedbackConfirm
            | LedCommandKind::FeedbackCancel
            | LedCommandKind::FeedbackLimit
            | LedCommandKind::FeedbackError
            | LedCommandKind::FeedbackEffectColor
            | LedCommandKind::FeedbackSetupColor
            | LedCommandKind::FeedbackSystemColor
            | LedCommandKind::FeedbackParam
            | LedCommandKind::FeedbackSync => {
                if let Some(feedback) = Feedback::from_command(command.kind) {
                    self.feedback = Some(FeedbackRun::new(feedback, now));
                }
            }
        }

        if limit_hit {
            outcome.follow_up = Some(LedCommand::new(LedCommandKind::FeedbackLimit, now));
        }

        let after = self.scene();
        // Effect select previews stay local until committed
        if command.kind.is_syncable() && self.sync_enabled && self.selection_snapshot.is_none() {
            if let Some(state) = self.state_change(&before, &after, now) {
                let _ = outcome.broadcast.push(state);
            }
        }
        outcome.dirty = after != before;
        outcome
    }

    /// Deadline of the pending debounced brightness save
    pub const fn next_save_deadline(&self) -> Option<Instant> {
        self.save_deadline
    }

    /// Persist the volatile record once the save delay has passed.
    ///
    /// Returns `true` if a save was attempted.
    pub fn flush_pending_save(&mut self, now: Instant) -> bool {
        match self.save_deadline {
            Some(deadline) if now >= deadline => {
                self.save_volatile();
                true
            }
            _ => false,
        }
    }

    fn set_power(&mut self, on: bool) {
        if self.is_on == on {
            return;
        }
        log!("[processor] power {}", if on { "on" } else { "off" });
        self.is_on = on;
        self.save_volatile();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn set_brightness(&mut self, value: i16, now: Instant) {
        let value = value.clamp(0, i16::from(u8::MAX)) as u8;
        if self.brightness == value {
            return;
        }
        self.brightness = value;
        self.schedule_save(now);
    }

    fn set_effect(&mut self, value: i16, now: Instant) {
        let last = self.registry.len().saturating_sub(1);
        let index = usize::try_from(value).unwrap_or(0).min(last);
        if usize::try_from(value).ok() != Some(index) {
            log!("[processor] effect {} clamped to {}", value, index);
        }
        self.switch_effect(index, now);
    }

    fn step_effect(&mut self, steps: i16, now: Instant) {
        let Ok(count) = i32::try_from(self.registry.len()) else {
            return;
        };
        if count == 0 {
            return;
        }
        let current = i32::try_from(self.effect_index).unwrap_or(0);
        let next = (current + i32::from(steps)).rem_euclid(count);
        self.switch_effect(usize::try_from(next).unwrap_or(0), now);
    }

    fn switch_effect(&mut self, index: usize, now: Instant) {
        if index == self.effect_index {
            return;
        }
        self.effect_index = index;
        self.selected_param = 0;
        log!("[processor] effect {}", index);
        // Previews in effect select are persisted by the commit instead
        if self.selection_snapshot.is_none() {
            self.schedule_save(now);
        }
    }

    fn active_values(&self) -> ParamValues {
        self.registry
            .get(self.effect_index)
            .map(|entry| entry.values())
            .unwrap_or_default()
    }

    fn active_param(&mut self, index: usize) -> Option<&mut Parameter> {
        self.registry.get_mut(self.effect_index)?.params.get_mut(index)
    }

    fn cancel(&mut self) {
        if let Some(index) = self.selection_snapshot.take() {
            self.effect_index = index;
        }
        if let Some((index, values)) = self.params_snapshot.take() {
            if let Some(entry) = self.registry.get_mut(index) {
                for (param, value) in entry.params.iter_mut().zip(values.iter()) {
                    param.set(*value);
                }
            }
        }
        if let Some(calibration) = self.calibration_snapshot.take() {
            self.calibration = calibration;
        }
        self.selected_param = 0;
        log!("[processor] configuration cancelled");
    }

    fn commit(&mut self) {
        self.selection_snapshot = None;
        self.params_snapshot = None;
        self.calibration_snapshot = None;
        self.selected_param = 0;
        self.save_volatile();
        self.save_static();
    }

    fn factory_reset(&mut self) {
        log!("[processor] factory reset");
        self.selection_snapshot = None;
        self.params_snapshot = None;
        self.calibration_snapshot = None;
        self.registry.reset();
        self.calibration.reset();
        self.brightness = DEFAULT_BRIGHTNESS;
        self.effect_index = 0;
        self.selected_param = 0;
        self.save_volatile();
        self.save_static();
    }

    fn schedule_save(&mut self, now: Instant) {
        self.save_deadline = Some(now + Duration::from_millis(self.config.save_delay_ms));
    }

    #[allow(clippy::cast_possible_truncation)]
    fn save_volatile(&mut self) {
        self.save_deadline = None;
        let state = VolatileState {
            is_on: self.is_on,
            brightness: self.brightness,
            effect_index: self.effect_index as u8,
        };
        if let Err(err) = self.storage.save_volatile(&state) {
            log!("[processor] volatile save failed: {}", err);
        }
    }

    fn save_static(&mut self) {
        let state = StaticState::capture(&self.calibration, &self.registry);
        if let Err(err) = self.storage.save_static(&state) {
            log!("[processor] static save failed: {}", err);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn effect_command(&self, now: Instant) -> LedCommand {
        LedCommand::new(LedCommandKind::SetEffect, now).with_value(self.effect_index as i16)
    }

    /// Absolute state to mirror after a syncable command changed something
    fn state_change(&self, before: &Scene, after: &Scene, now: Instant) -> Option<LedCommand> {
        if before.is_on != after.is_on {
            let kind = if after.is_on {
                LedCommandKind::TurnOn
            } else {
                LedCommandKind::TurnOff
            };
            return Some(LedCommand::new(kind, now));
        }
        if before.brightness != after.brightness {
            return Some(
                LedCommand::new(LedCommandKind::SetBrightness, now)
                    .with_value(i16::from(after.brightness)),
            );
        }
        if before.effect != after.effect || before.params != after.params {
            return Some(self.effect_command(now));
        }
        None
    }

    /// Effect, every parameter and a save for the peers
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn full_sync(&self, now: Instant) -> Vec<LedCommand, MAX_BROADCAST> {
        let mut commands = Vec::new();
        if !self.sync_enabled {
            log!("[processor] sync disabled, saving locally only");
            return commands;
        }
        let _ = commands.push(self.effect_command(now));
        for (index, value) in self.active_values().iter().enumerate() {
            let _ = commands.push(
                LedCommand::new(LedCommandKind::SetEffectParam, now)
                    .with_param(index as u8)
                    .with_value(*value),
            );
        }
        let _ = commands.push(LedCommand::new(LedCommandKind::SaveConfig, now));
        commands
    }
}

/// Command processor task.
///
/// Blocks on the command queue, waking early only to flush a pending
/// brightness save. Every visible change publishes a fresh [`Scene`].
pub async fn run_processor<S, const CMD_SIZE: usize, const SYNC_SIZE: usize>(
    mut processor: CommandProcessor<S>,
    commands: CommandReceiver<'_, CMD_SIZE>,
    scene: &Latest<Scene>,
    sync: SyncSender<'_, SYNC_SIZE>,
) where
    S: Storage,
{
    scene.signal(processor.scene());
    loop {
        let received = match processor.next_save_deadline() {
            Some(deadline) => match select(commands.receive(), Timer::at(deadline)).await {
                Either::First(command) => Some(command),
                Either::Second(()) => None,
            },
            None => Some(commands.receive().await),
        };
        let now = Instant::now();
        let Some(command) = received else {
            processor.flush_pending_save(now);
            continue;
        };

        let mut dirty = false;
        let mut next = Some(command);
        while let Some(command) = next.take() {
            let outcome = processor.apply(&command, now);
            dirty |= outcome.dirty;
            for message in &outcome.broadcast {
                offer(sync, SyncMessage::from_command(message), "sync");
            }
            next = outcome.follow_up;
        }
        if dirty {
            scene.signal(processor.scene());
        }
        // Commands stamped long ago indicate a congested queue
        if elapsed_since(now, command.timestamp) > Duration::from_millis(500) {
            log!("[processor] command {:?} applied late", command.kind);
        }
    }
}
