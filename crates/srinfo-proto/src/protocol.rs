use serde::{Deserialize, Serialize};

use crate::model::{ChannelId, ScheduleEntry};

/// Requests a front end sends to the schedule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Show the schedule for one channel, from cache when possible.
    Schedule { channel: ChannelId },
    /// Re-fetch every cached channel now and restart the refresh countdown.
    RefreshAll,
}

/// Coarse failure category reported to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad endpoint, connection failure or unreadable body.
    Transport,
    /// The server answered with a non-success status.
    Status,
    /// A document could not be parsed at all.
    Parse,
}

/// Everything the engine reports back. Each `Command::Schedule` ends in
/// exactly one `Schedule` or `ScheduleFailed`, and each sweep in exactly one
/// `Refreshed` or `RefreshFailed`.
#[derive(Debug, Clone)]
pub enum ScheduleEvent {
    /// A network fetch for `channel` has started.
    Loading { channel: ChannelId },
    Schedule {
        channel: ChannelId,
        entry: ScheduleEntry,
    },
    ScheduleFailed {
        channel: ChannelId,
        kind: ErrorKind,
        message: String,
    },
    /// A sweep over `channels` cached channels has started.
    RefreshStarted { channels: usize },
    Refreshed { channels: usize },
    /// A sweep stopped at `channel`; the `refreshed` channels before it kept
    /// their new data.
    RefreshFailed {
        channel: ChannelId,
        refreshed: usize,
        kind: ErrorKind,
        message: String,
    },
}

impl ScheduleEvent {
    /// Channel the event is about, if it concerns a single one.
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            ScheduleEvent::Loading { channel }
            | ScheduleEvent::Schedule { channel, .. }
            | ScheduleEvent::ScheduleFailed { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}
