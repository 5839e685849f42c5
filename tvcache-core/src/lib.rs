pub mod channel;
pub mod config;
pub mod decision;
pub mod error;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod store;

pub use channel::{CacheEntry, Channel, ChannelState, ChannelView, RefreshMode, SystemSettings};
pub use config::{ResolverConfig, ServiceConfig, Strategy};
pub use decision::{decide, Decision, Evaluation, RefreshReason};
pub use error::{ConfigError, ResolveError, SchedulerError, ServiceError, StoreError};
pub use resolver::{Resolver, StaticScanner};
pub use scheduler::{run_cycle, scan_once, spawn_scheduler, CycleReport, SchedulerHandle};
pub use service::{Resolution, Source, StreamService};
pub use store::StreamStore;
