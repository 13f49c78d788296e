//! Sitesweep — pluggable collection engine for business listings on JavaScript-rendered directories.

pub mod browser;
pub mod collect;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod plugins;
pub mod registry;
pub mod settings;
pub mod sink;
pub mod types;

pub use browser::{Browser, BrowserSession, Locator, NoopBrowser, ScrollTarget};
pub use collect::{Collector, PluginDescriptor, StopReason, Timing};
pub use dispatch::Dispatcher;
pub use error::{BrowserError, CollectError, HarvestError, HarvestResult, SinkError, ValidationError};
pub use outcome::{format_found_count, parse_found_count, RunOutcome};
pub use registry::PluginRegistry;
pub use settings::Overrides;
pub use types::*;
