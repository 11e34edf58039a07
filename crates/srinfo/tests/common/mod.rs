//! Scripted in-memory stand-in for the SR API, shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Url;
use srinfo::{ApiClient, HttpResponse, Transport, TransportError};
use srinfo_proto::{Channel, ChannelId};

pub const BASE_URL: &str = "http://api.test/api/v2/";

#[derive(Debug, Clone)]
pub struct Broadcast {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Broadcast {
    pub fn new(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            start,
            end,
        }
    }
}

/// How the fake answers schedule requests for one channel.
#[derive(Debug, Clone)]
pub enum Reply {
    Schedule(Vec<Broadcast>),
    Status(u16),
    Unreachable,
}

#[derive(Default)]
struct State {
    channels: Vec<Channel>,
    replies: HashMap<ChannelId, Reply>,
    requests: Vec<Url>,
}

/// Serves `channels` and `scheduledepisodes` from scripted replies, one page
/// per request, and records every URL it was asked for.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<State>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(BASE_URL, Arc::new(self.clone())).unwrap()
    }

    pub fn set_channels(&self, channels: Vec<Channel>) {
        self.state.lock().unwrap().channels = channels;
    }

    pub fn set_reply(&self, channel: ChannelId, reply: Reply) {
        self.state.lock().unwrap().replies.insert(channel, reply);
    }

    pub fn requests(&self) -> Vec<Url> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Schedule requests made so far for `channel`, across all dates.
    pub fn schedule_requests(&self, channel: ChannelId) -> usize {
        let id = channel.to_string();
        self.requests()
            .iter()
            .filter(|url| url.path().ends_with("/scheduledepisodes"))
            .filter(|url| query(url, "channelid").as_deref() == Some(id.as_str()))
            .count()
    }

    fn answer(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(url.clone());

        if url.path().ends_with("/channels") {
            return Ok(ok(channels_xml(&state.channels)));
        }

        let channel: ChannelId = query(url, "channelid")
            .and_then(|id| id.parse().ok())
            .unwrap_or_default();
        let date = query(url, "date")
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());

        match state.replies.get(&channel) {
            Some(Reply::Schedule(broadcasts)) => {
                let today: Vec<&Broadcast> = broadcasts
                    .iter()
                    .filter(|b| Some(b.start.date_naive()) == date)
                    .collect();
                Ok(ok(schedule_xml(channel, &today)))
            }
            Some(Reply::Status(status)) => Ok(HttpResponse {
                status: *status,
                body: String::new(),
            }),
            Some(Reply::Unreachable) => {
                Err(TransportError::Connect("connection refused".to_string()))
            }
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.answer(url)
    }
}

pub fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn ok(body: String) -> HttpResponse {
    HttpResponse { status: 200, body }
}

pub fn channels_xml(channels: &[Channel]) -> String {
    let items: String = channels
        .iter()
        .map(|c| format!(r#"<channel id="{}" name="{}"><color>31a1bd</color></channel>"#, c.id, c.name))
        .collect();
    format!(
        "<sr><pagination><page>1</page><totalpages>1</totalpages></pagination>\
         <channels>{}</channels></sr>",
        items
    )
}

pub fn schedule_xml(channel: ChannelId, broadcasts: &[&Broadcast]) -> String {
    let items: String = broadcasts
        .iter()
        .map(|b| {
            format!(
                "<scheduledepisode><title>{}</title>\
                 <starttimeutc>{}</starttimeutc><endtimeutc>{}</endtimeutc>\
                 <program id=\"1\" name=\"{}\" /><channel id=\"{}\" name=\"P3\" />\
                 </scheduledepisode>",
                b.title,
                b.start.to_rfc3339(),
                b.end.to_rfc3339(),
                b.title,
                channel
            )
        })
        .collect();
    format!(
        "<sr><pagination><page>1</page><totalpages>1</totalpages></pagination>\
         <schedule>{}</schedule></sr>",
        items
    )
}
