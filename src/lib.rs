//! Trending Hub
//!
//! Aggregates "trending" lists from a fixed set of upstream sites into one
//! normalized item shape, behind a freshness-window cache.
//!
//! Layers, bottom up:
//! - `sources`: one adapter per upstream (markup scraping, JSON, paged fan-out)
//! - `registry`: target name to adapter
//! - `orchestrator`: runs an adapter, normalizes its failure
//! - `cache`: request-keyed response cache
//! - `service`: request boundary producing `Envelope`s
//! - `server`: HTTP shell

pub mod cache;
pub mod config;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod schemas;
pub mod server;
pub mod service;
pub mod sources;

pub use cache::{CacheKey, CacheStatus, Clock, ManualClock, ResponseCache, SystemClock};
pub use config::Config;
pub use error::{FetchFailure, SourceError};
pub use orchestrator::FetchOrchestrator;
pub use registry::SourceRegistry;
pub use schemas::{Envelope, Item};
pub use service::TrendingService;
pub use sources::{FetchParams, Source};
