//! Wireless sync frame
//!
//! Layout (little endian):
//!
//! | Offset | Size | Field                         |
//! |--------|------|-------------------------------|
//! | 0      | 1    | magic `0xA5`                  |
//! | 1      | 1    | version                       |
//! | 2      | 1    | command kind                  |
//! | 3      | 1    | parameter index               |
//! | 4      | 2    | value (`i16`)                 |
//! | 6      | 4    | sender timestamp, ms (`u32`)  |

use embassy_time::Instant;

use crate::channel::{Queue, QueueReceiver, QueueSender, offer};
use crate::command::{LedCommand, LedCommandKind};
use crate::error::DecodeError;
use crate::input::InputEvent;
use crate::logging::log;

pub const SYNC_MESSAGE_LEN: usize = 10;
pub const SYNC_MAGIC: u8 = 0xA5;
pub const SYNC_VERSION: u8 = 1;

/// One command as carried over the air
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMessage {
    pub kind: LedCommandKind,
    pub param: u8,
    pub value: i16,
    /// Sender clock in milliseconds, truncated
    pub timestamp_ms: u32,
}

impl SyncMessage {
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_command(command: &LedCommand) -> Self {
        Self {
            kind: command.kind,
            param: command.param,
            value: command.value,
            timestamp_ms: command.timestamp.as_millis() as u32,
        }
    }

    /// Rebuild the command, stamped with the local receive time
    pub const fn to_command(&self, received: Instant) -> LedCommand {
        LedCommand::new(self.kind, received)
            .with_param(self.param)
            .with_value(self.value)
    }

    pub fn encode(&self) -> [u8; SYNC_MESSAGE_LEN] {
        let mut frame = [0u8; SYNC_MESSAGE_LEN];
        frame[0] = SYNC_MAGIC;
        frame[1] = SYNC_VERSION;
        frame[2] = self.kind.as_raw();
        frame[3] = self.param;
        frame[4..6].copy_from_slice(&self.value.to_le_bytes());
        frame[6..10].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        frame
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let Ok(frame) = <&[u8; SYNC_MESSAGE_LEN]>::try_from(frame) else {
            return Err(DecodeError::Length(frame.len()));
        };
        if frame[0] != SYNC_MAGIC {
            return Err(DecodeError::Magic(frame[0]));
        }
        if frame[1] != SYNC_VERSION {
            return Err(DecodeError::Version(frame[1]));
        }
        let kind = LedCommandKind::from_raw(frame[2]).ok_or(DecodeError::Kind(frame[2]))?;
        Ok(Self {
            kind,
            param: frame[3],
            value: i16::from_le_bytes([frame[4], frame[5]]),
            timestamp_ms: u32::from_le_bytes([frame[6], frame[7], frame[8], frame[9]]),
        })
    }
}

/// Outbound broadcast queue, drained by the radio transport
pub type SyncQueue<const SIZE: usize> = Queue<SyncMessage, SIZE>;

pub type SyncSender<'a, const SIZE: usize> = QueueSender<'a, SyncMessage, SIZE>;

pub type SyncReceiver<'a, const SIZE: usize> = QueueReceiver<'a, SyncMessage, SIZE>;

/// Radio receive path: decode a frame and inject it as a remote event.
///
/// Malformed frames are logged and dropped. Returns `true` when an event was
/// queued.
pub fn accept_frame<const SIZE: usize>(
    frame: &[u8],
    now: Instant,
    events: QueueSender<'_, InputEvent, SIZE>,
) -> bool {
    match SyncMessage::decode(frame) {
        Ok(message) => offer(events, InputEvent::Remote(message.to_command(now)), "sync"),
        Err(err) => {
            log!("[sync] dropping frame: {}", err);
            false
        }
    }
}
