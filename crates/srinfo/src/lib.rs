//! srinfo: keeps a rolling, per-channel view of upcoming Sveriges Radio
//! broadcasts, fetched from the paginated XML API and cached in memory.
//!
//! Pipeline: [`api::ApiClient`] → [`parser`] → [`window::TimeWindow`] →
//! [`cache::ScheduleCache`], driven by [`core::ScheduleEngine`].

pub mod api;
pub mod cache;
pub mod core;
pub mod error;
pub mod parser;
pub mod window;

pub use api::{ApiClient, Document, HttpResponse, HttpTransport, Transport, TransportError};
pub use cache::ScheduleCache;
pub use error::{ApiError, FetchError, ParseError, RefreshError, SweepError};
pub use parser::EpisodeBatch;
pub use window::TimeWindow;
pub use self::core::ScheduleEngine;
