//! Domain types shared by the engine and any front end.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Stable channel identifier as issued by the API.
pub type ChannelId = u32;

/// A broadcast source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
}

impl Channel {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn group(&self) -> ChannelGroup {
        ChannelGroup::of(&self.name)
    }
}

/// Menu grouping by channel-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelGroup {
    P2,
    P3,
    P4,
    Sr,
    Other,
}

impl ChannelGroup {
    pub const ALL: [ChannelGroup; 5] = [
        ChannelGroup::P2,
        ChannelGroup::P3,
        ChannelGroup::P4,
        ChannelGroup::Sr,
        ChannelGroup::Other,
    ];

    pub fn of(name: &str) -> Self {
        match name.get(..2) {
            Some("P2") => ChannelGroup::P2,
            Some("P3") => ChannelGroup::P3,
            Some("P4") => ChannelGroup::P4,
            Some("SR") => ChannelGroup::Sr,
            _ => ChannelGroup::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelGroup::P2 => "P2",
            ChannelGroup::P3 => "P3",
            ChannelGroup::P4 => "P4",
            ChannelGroup::Sr => "SR",
            ChannelGroup::Other => "Channels",
        }
    }
}

/// Split channels into their menu groups. Empty groups are left out; channel
/// order inside a group follows the input.
pub fn group_channels(channels: &[Channel]) -> Vec<(ChannelGroup, Vec<Channel>)> {
    ChannelGroup::ALL
        .iter()
        .filter_map(|group| {
            let members: Vec<Channel> = channels
                .iter()
                .filter(|c| c.group() == *group)
                .cloned()
                .collect();
            (!members.is_empty()).then_some((*group, members))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpisodeError {
    #[error("episode ends ({end}) before it starts ({start})")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// One scheduled broadcast.
///
/// Both timestamps are required and ordered; anything else is rejected by
/// [`Episode::new`]. Optional text fields are attached with the `with_*`
/// methods, which cannot break that invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    id: Option<u64>,
    title: String,
    subtitle: String,
    description: String,
    program_name: String,
    image_url: Option<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Episode {
    pub fn new(
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, EpisodeError> {
        if end < start {
            return Err(EpisodeError::EndBeforeStart { start, end });
        }
        Ok(Self {
            id: None,
            title: title.into(),
            subtitle: String::new(),
            description: String::new(),
            program_name: String::new(),
            image_url: None,
            start,
            end,
        })
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_program_name(mut self, program_name: impl Into<String>) -> Self {
        self.program_name = program_name.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        let url = image_url.into();
        self.image_url = (!url.is_empty()).then_some(url);
        self
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Name shown in schedule tables: the program, else the episode title.
    pub fn display_name(&self) -> &str {
        if !self.program_name.trim().is_empty() {
            &self.program_name
        } else if !self.title.trim().is_empty() {
            &self.title
        } else {
            UNNAMED_PROGRAM
        }
    }
}

const UNNAMED_PROGRAM: &str = "Unnamed program";

/// The episodes currently held for one channel. Cloning shares the list.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    episodes: Arc<[Episode]>,
    fetched_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn new(episodes: Vec<Episode>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            episodes: episodes.into(),
            fetched_at,
        }
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn rows(&self) -> Vec<ScheduleRow> {
        self.episodes.iter().map(ScheduleRow::from).collect()
    }
}

/// An episode formatted for a three-column schedule table, in local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRow {
    pub program: String,
    pub starts: String,
    pub ends: String,
}

impl ScheduleRow {
    pub const HEADERS: [&'static str; 3] = ["Program", "Starts", "Ends"];
}

impl From<&Episode> for ScheduleRow {
    fn from(episode: &Episode) -> Self {
        Self {
            program: episode.display_name().to_string(),
            starts: format_local(episode.start()),
            ends: format_local(episode.end()),
        }
    }
}

fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%-d %b %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_episode_rejects_reversed_times() {
        let err = Episode::new("Ekot", at(10), at(9)).unwrap_err();
        assert_eq!(
            err,
            EpisodeError::EndBeforeStart {
                start: at(10),
                end: at(9)
            }
        );
        assert!(Episode::new("Instant", at(9), at(9)).is_ok());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let ep = Episode::new("Morning news", at(6), at(7)).unwrap();
        assert_eq!(ep.display_name(), "Morning news");

        let ep = ep.with_program_name("Ekot");
        assert_eq!(ep.display_name(), "Ekot");

        let blank = Episode::new("  ", at(6), at(7)).unwrap();
        assert_eq!(blank.display_name(), "Unnamed program");
    }

    #[test]
    fn test_empty_image_url_is_absent() {
        let ep = Episode::new("Ekot", at(6), at(7)).unwrap().with_image_url("");
        assert_eq!(ep.image_url(), None);
        let ep = ep.with_image_url("https://static.sr.se/x.jpg");
        assert_eq!(ep.image_url(), Some("https://static.sr.se/x.jpg"));
    }

    #[test]
    fn test_channel_groups() {
        assert_eq!(ChannelGroup::of("P2 Musik"), ChannelGroup::P2);
        assert_eq!(ChannelGroup::of("P4 Göteborg"), ChannelGroup::P4);
        assert_eq!(ChannelGroup::of("SR Sápmi"), ChannelGroup::Sr);
        assert_eq!(ChannelGroup::of("P1"), ChannelGroup::Other);
        assert_eq!(ChannelGroup::of("Ö"), ChannelGroup::Other);
        assert_eq!(ChannelGroup::of(""), ChannelGroup::Other);
    }

    #[test]
    fn test_group_channels_keeps_order_and_skips_empty() {
        let channels = vec![
            Channel::new(132, "P1"),
            Channel::new(210, "P4 Göteborg"),
            Channel::new(164, "P3"),
            Channel::new(212, "P4 Malmöhus"),
        ];
        let groups = group_channels(&channels);
        let labels: Vec<_> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(
            labels,
            vec![ChannelGroup::P3, ChannelGroup::P4, ChannelGroup::Other]
        );
        let p4: Vec<_> = groups[1].1.iter().map(|c| c.id).collect();
        assert_eq!(p4, vec![210, 212]);
    }

    #[test]
    fn test_entry_rows_share_episodes() {
        let entry = ScheduleEntry::new(
            vec![Episode::new("Ekot", at(6), at(7)).unwrap()],
            at(5),
        );
        let copy = entry.clone();
        assert_eq!(copy.len(), 1);
        assert!(std::ptr::eq(entry.episodes(), copy.episodes()));
        let rows = entry.rows();
        assert_eq!(rows[0].program, "Ekot");
        assert!(!rows[0].starts.is_empty());
    }
}
