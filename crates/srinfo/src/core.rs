/// ScheduleEngine: fetch-or-cache for single channels, refresh sweeps over
/// everything cached, and the timer that triggers those sweeps.
///
/// Network and parsing work runs on spawned tokio tasks. Results go back to
/// the front end as `ScheduleEvent`s over an mpsc channel; the front end owns
/// the receiving end and applies them on its own loop, so nothing UI-visible
/// changes off that loop.
///
/// The cache is the only state shared between tasks. Two requests for the
/// same uncached channel are not merged: both fetch, both store, and the one
/// that finishes last stays in the cache.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use srinfo_proto::{Channel, ChannelId, Command, ScheduleEntry, ScheduleEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::cache::ScheduleCache;
use crate::error::{FetchError, RefreshError, SweepError};
use crate::parser;
use crate::window::TimeWindow;

struct Shared {
    api: ApiClient,
    cache: ScheduleCache,
    window: TimeWindow,
    events: mpsc::Sender<ScheduleEvent>,
    /// When the last sweep was triggered or finished. The timer fires one
    /// interval after this.
    last_refresh: watch::Sender<Instant>,
}

#[derive(Clone)]
pub struct ScheduleEngine {
    shared: Arc<Shared>,
}

impl ScheduleEngine {
    pub fn new(api: ApiClient, window: TimeWindow, events: mpsc::Sender<ScheduleEvent>) -> Self {
        let (last_refresh, _) = watch::channel(Instant::now());
        Self {
            shared: Arc::new(Shared {
                api,
                cache: ScheduleCache::new(),
                window,
                events,
                last_refresh,
            }),
        }
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.shared.cache
    }

    pub fn window(&self) -> TimeWindow {
        self.shared.window
    }

    /// All channels the API lists, in API order.
    pub async fn fetch_channels(&self) -> Result<Vec<Channel>, FetchError> {
        let docs = self.shared.api.fetch_channel_list().await?;
        Ok(parser::parse_channels(&docs)?)
    }

    /// Fetch, parse and trim one channel's schedule against a single `now`.
    /// Leaves the cache alone.
    pub async fn fetch_fresh(&self, channel: ChannelId) -> Result<ScheduleEntry, RefreshError> {
        let wrap = |source: FetchError| RefreshError { channel, source };
        let now = Utc::now();
        let window = self.shared.window;

        let docs = self
            .shared
            .api
            .fetch_schedule(channel, &window.dates(now))
            .await
            .map_err(|e| wrap(e.into()))?;
        let batch = parser::parse_episodes(&docs).map_err(|e| wrap(e.into()))?;
        if batch.error_count > 0 {
            warn!(
                "Channel {}: skipped {} unusable episodes",
                channel, batch.error_count
            );
        }

        let episodes = window.trim(batch.episodes, now);
        debug!("Channel {}: {} episodes in window", channel, episodes.len());
        Ok(ScheduleEntry::new(episodes, now))
    }

    /// Cached entry if there is one, otherwise fetch and store.
    pub async fn load_schedule(&self, channel: ChannelId) -> Result<ScheduleEntry, RefreshError> {
        match self.shared.cache.get(channel) {
            Some(entry) => Ok(entry),
            None => self.store_fresh(channel).await,
        }
    }

    /// Run a front-end command on its own task.
    pub fn handle(&self, command: Command) -> JoinHandle<()> {
        debug!("Command: {:?}", command);
        match command {
            Command::Schedule { channel } => self.request_schedule(channel),
            Command::RefreshAll => self.request_refresh_all(),
        }
    }

    /// Front-end entry point for one channel. Emits `Schedule` straight from
    /// the cache on a hit; on a miss emits `Loading`, then `Schedule` or
    /// `ScheduleFailed`. A failed fetch stores nothing.
    pub fn request_schedule(&self, channel: ChannelId) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let event = match engine.shared.cache.get(channel) {
                Some(entry) => {
                    debug!("Channel {}: served from cache", channel);
                    ScheduleEvent::Schedule { channel, entry }
                }
                None => {
                    engine.emit(ScheduleEvent::Loading { channel }).await;
                    match engine.store_fresh(channel).await {
                        Ok(entry) => ScheduleEvent::Schedule { channel, entry },
                        Err(e) => {
                            warn!("{}", e);
                            ScheduleEvent::ScheduleFailed {
                                channel,
                                kind: e.kind(),
                                message: e.to_string(),
                            }
                        }
                    }
                }
            };
            engine.emit(event).await;
        })
    }

    /// Re-fetch every channel cached at the start of the sweep, one after
    /// another. Stops at the first failure; channels already done keep their
    /// new schedules and the rest keep their old ones.
    pub async fn refresh_all(&self) -> Result<usize, SweepError> {
        self.mark_refreshed();
        let channels = self.shared.cache.keys();
        info!("Refreshing {} cached channels", channels.len());

        let mut refreshed = 0;
        for channel in channels {
            if let Err(e) = self.store_fresh(channel).await {
                self.mark_refreshed();
                let err = SweepError {
                    channel,
                    refreshed,
                    source: e.source,
                };
                error!("{}", err);
                return Err(err);
            }
            refreshed += 1;
        }

        self.mark_refreshed();
        info!("Refreshed {} channels", refreshed);
        Ok(refreshed)
    }

    /// Front-end entry point for a sweep. Restarts the timer countdown, then
    /// emits `RefreshStarted` and one of `Refreshed` / `RefreshFailed`.
    pub fn request_refresh_all(&self) -> JoinHandle<()> {
        self.mark_refreshed();
        let engine = self.clone();
        tokio::spawn(async move {
            let channels = engine.shared.cache.len();
            engine.emit(ScheduleEvent::RefreshStarted { channels }).await;
            let event = match engine.refresh_all().await {
                Ok(channels) => ScheduleEvent::Refreshed { channels },
                Err(e) => ScheduleEvent::RefreshFailed {
                    channel: e.channel,
                    refreshed: e.refreshed,
                    kind: e.kind(),
                    message: e.to_string(),
                },
            };
            engine.emit(event).await;
        })
    }

    /// Fire `request_refresh_all` one `interval` after the most recent sweep,
    /// whatever started that sweep. Ends once the front end drops its event
    /// receiver.
    pub fn spawn_refresh_timer(&self, interval: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        let mut last_refresh = self.shared.last_refresh.subscribe();
        tokio::spawn(async move {
            info!("Refresh timer running every {:?}", interval);
            loop {
                let due = *last_refresh.borrow_and_update() + interval;
                tokio::select! {
                    _ = tokio::time::sleep_until(due) => {
                        if engine.shared.events.is_closed() {
                            info!("Refresh timer: event receiver gone, stopping");
                            break;
                        }
                        info!("Refresh timer fired");
                        engine.request_refresh_all();
                    }
                    changed = last_refresh.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn store_fresh(&self, channel: ChannelId) -> Result<ScheduleEntry, RefreshError> {
        let entry = self.fetch_fresh(channel).await?;
        self.shared.cache.put(channel, entry.clone());
        Ok(entry)
    }

    fn mark_refreshed(&self) {
        self.shared.last_refresh.send_replace(Instant::now());
    }

    async fn emit(&self, event: ScheduleEvent) {
        if self.shared.events.send(event).await.is_err() {
            debug!("ScheduleEngine: event receiver closed, dropping event");
        }
    }
}
