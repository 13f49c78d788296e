//! Built-in site plugins.

pub mod google_maps;
pub mod indiamart;

use std::sync::Arc;

use crate::collect::Collector;

pub use google_maps::GoogleMaps;
pub use indiamart::IndiaMart;

/// Every plugin shipped with the engine, in registration order.
pub fn builtin() -> Vec<Arc<dyn Collector>> {
    vec![Arc::new(GoogleMaps), Arc::new(IndiaMart)]
}
