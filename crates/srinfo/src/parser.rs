//! XML parsing for channel-list and schedule documents.
//!
//! Streaming parser over `quick-xml` events. A document that is not
//! well-formed fails as a whole; a single schedule element with bad data is
//! skipped and counted, the rest of the batch survives.

use chrono::{DateTime, Utc};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use srinfo_proto::{Channel, ChannelId, Episode};
use tracing::{debug, warn};

use crate::api::Document;
use crate::error::ParseError;

const CHANNEL_TAG: &[u8] = b"channel";
const EPISODE_TAG: &[u8] = b"scheduledepisode";
const PROGRAM_TAG: &[u8] = b"program";
const TOTAL_PAGES_TAG: &[u8] = b"totalpages";

/// Upper bound on stored per-episode messages; the count keeps going.
const MAX_STORED_ERRORS: usize = 50;

/// Episodes parsed from a set of documents, plus what had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct EpisodeBatch {
    pub episodes: Vec<Episode>,
    /// First few skip reasons, for logs.
    pub errors: Vec<String>,
    /// Number of schedule elements that did not become an episode.
    pub error_count: usize,
}

impl EpisodeBatch {
    fn reject(&mut self, page: u32, reason: String) {
        warn!("Skipping scheduled episode on page {}: {}", page, reason);
        self.error_count += 1;
        if self.errors.len() < MAX_STORED_ERRORS {
            self.errors.push(format!("page {}: {}", page, reason));
        }
    }
}

/// Read the pagination page count. A document without one is a single page.
pub fn total_pages(doc: &Document) -> Result<u32, ParseError> {
    let mut reader = Reader::from_str(&doc.body);
    let mut inside = false;
    let mut text = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(xml_error(doc.page, reader.error_position() as u64, e)),
        };
        match event {
            Event::Start(e) if e.name().as_ref() == TOTAL_PAGES_TAG => inside = true,
            Event::Text(t) if inside => text.push_str(&decode_text(&t)),
            Event::End(_) if inside => {
                let value = text.trim();
                return value
                    .parse::<u32>()
                    .map(|n| n.max(1))
                    .map_err(|_| ParseError::PageCount {
                        page: doc.page,
                        value: value.to_string(),
                    });
            }
            Event::Eof => return Ok(1),
            _ => {}
        }
    }
}

/// Collect every `<channel id=".." name="..">` across the documents, in
/// document order. Elements without a positive integer id are skipped.
pub fn parse_channels(docs: &[Document]) -> Result<Vec<Channel>, ParseError> {
    let mut channels = Vec::new();

    for doc in docs {
        let mut reader = Reader::from_str(&doc.body);
        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => return Err(xml_error(doc.page, reader.error_position() as u64, e)),
            };
            match event {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == CHANNEL_TAG => {
                    let raw_id = attribute(&e, b"id");
                    match raw_id.as_deref().and_then(parse_channel_id) {
                        Some(id) => {
                            let name = attribute(&e, b"name").unwrap_or_default();
                            channels.push(Channel::new(id, name));
                        }
                        None => warn!(
                            "Skipping channel on page {} with id {:?}",
                            doc.page, raw_id
                        ),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
    }

    debug!("Parsed {} channels from {} documents", channels.len(), docs.len());
    Ok(channels)
}

/// Build one episode per `<scheduledepisode>` across the documents.
pub fn parse_episodes(docs: &[Document]) -> Result<EpisodeBatch, ParseError> {
    let mut batch = EpisodeBatch::default();
    for doc in docs {
        parse_episode_document(doc, &mut batch)?;
    }
    debug!(
        "Parsed {} episodes ({} skipped) from {} documents",
        batch.episodes.len(),
        batch.error_count,
        docs.len()
    );
    Ok(batch)
}

fn parse_episode_document(doc: &Document, batch: &mut EpisodeBatch) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(&doc.body);
    let mut current: Option<EpisodeFields> = None;
    // Nesting below the open <scheduledepisode>; fields live at depth 1.
    let mut depth = 0usize;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(xml_error(doc.page, reader.error_position() as u64, e)),
        };
        match event {
            Event::Start(e) => match current.as_mut() {
                Some(fields) => {
                    depth += 1;
                    if depth == 1 {
                        field = Field::from_tag(e.name().as_ref());
                        text.clear();
                        if e.name().as_ref() == PROGRAM_TAG {
                            fields.read_program(&e);
                        }
                    }
                }
                None if e.name().as_ref() == EPISODE_TAG => {
                    current = Some(EpisodeFields::default());
                    depth = 0;
                }
                None => {}
            },
            Event::Empty(e) => match current.as_mut() {
                Some(fields) if depth == 0 && e.name().as_ref() == PROGRAM_TAG => {
                    fields.read_program(&e);
                }
                None if e.name().as_ref() == EPISODE_TAG => {
                    batch.reject(doc.page, "empty schedule element".to_string());
                }
                _ => {}
            },
            Event::Text(t) if field.is_some() => text.push_str(&decode_text(&t)),
            Event::CData(c) if field.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            Event::GeneralRef(r) if field.is_some() => text.push_str(&resolve_reference(&r)),
            Event::End(_) => match current.take() {
                Some(fields) if depth == 0 => match fields.into_episode() {
                    Ok(episode) => batch.episodes.push(episode),
                    Err(reason) => batch.reject(doc.page, reason),
                },
                Some(mut fields) => {
                    if depth == 1 {
                        if let Some(f) = field.take() {
                            fields.set(f, text.trim().to_string());
                        }
                    }
                    depth -= 1;
                    current = Some(fields);
                }
                None => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// Recognised child elements of a schedule element.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    EpisodeId,
    Title,
    Subtitle,
    Description,
    StartTime,
    EndTime,
    ImageUrl,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"episodeid" => Some(Field::EpisodeId),
            b"title" => Some(Field::Title),
            b"subtitle" => Some(Field::Subtitle),
            b"description" => Some(Field::Description),
            b"starttimeutc" => Some(Field::StartTime),
            b"endtimeutc" => Some(Field::EndTime),
            b"imageurl" => Some(Field::ImageUrl),
            _ => None,
        }
    }
}

/// Raw text collected for one schedule element before validation.
#[derive(Debug, Default)]
struct EpisodeFields {
    id: Option<String>,
    title: String,
    subtitle: String,
    description: String,
    start: Option<String>,
    end: Option<String>,
    image_url: String,
    program_name: String,
}

impl EpisodeFields {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::EpisodeId => self.id = Some(value),
            Field::Title => self.title = value,
            Field::Subtitle => self.subtitle = value,
            Field::Description => self.description = value,
            Field::StartTime => self.start = Some(value),
            Field::EndTime => self.end = Some(value),
            Field::ImageUrl => self.image_url = value,
        }
    }

    fn read_program(&mut self, e: &BytesStart) {
        if let Some(name) = attribute(e, b"name") {
            self.program_name = name;
        }
    }

    fn into_episode(self) -> Result<Episode, String> {
        let start = parse_instant("starttimeutc", self.start.as_deref())?;
        let end = parse_instant("endtimeutc", self.end.as_deref())?;

        let mut episode = Episode::new(self.title, start, end)
            .map_err(|e| e.to_string())?
            .with_subtitle(self.subtitle)
            .with_description(self.description)
            .with_program_name(self.program_name)
            .with_image_url(self.image_url);

        if let Some(raw) = self.id.filter(|s| !s.is_empty()) {
            let id = raw
                .parse::<u64>()
                .map_err(|_| format!("invalid episodeid {:?}", raw))?;
            episode = episode.with_id(id);
        }
        Ok(episode)
    }
}

fn parse_instant(field: &str, raw: Option<&str>) -> Result<DateTime<Utc>, String> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {}", field))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid {} {:?}: {}", field, raw, e))
}

fn parse_channel_id(raw: &str) -> Option<ChannelId> {
    raw.trim().parse::<ChannelId>().ok().filter(|id| *id > 0)
}

fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .map(|attr| decode_text(&attr.value))
}

fn decode_text(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    match unescape(&text) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => text.into_owned(),
    }
}

fn resolve_reference(name: &[u8]) -> String {
    let reference = format!("&{};", String::from_utf8_lossy(name));
    match unescape(&reference) {
        Ok(resolved) => resolved.into_owned(),
        Err(_) => reference,
    }
}

fn xml_error(page: u32, position: u64, err: quick_xml::Error) -> ParseError {
    ParseError::Xml {
        page,
        position,
        message: err.to_string(),
    }
}
