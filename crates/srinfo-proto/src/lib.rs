//! Types shared between the srinfo schedule engine and its front ends.

pub mod config;
pub mod model;
pub mod platform;
pub mod protocol;

pub use model::{Channel, ChannelGroup, ChannelId, Episode, EpisodeError, ScheduleEntry, ScheduleRow};
pub use protocol::{Command, ErrorKind, ScheduleEvent};
