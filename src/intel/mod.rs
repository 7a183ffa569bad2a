//! London live intelligence: weather, air quality, roads and tube.
//!
//! Live data needs a full OpenWeather + TfL credential set and four
//! successful calls; anything less yields a simulated snapshot.

pub mod fetch;
pub mod mock;
pub mod transform;
pub mod types;
pub mod upstream;
pub mod widget;

pub use fetch::fetch_london_data;
pub use types::{AirQuality, AqiStatus, FallbackReason, IntelReading, LondonData, Traffic, TubeLine, Weather};
pub use upstream::{Endpoint, HttpUpstream, Upstream, UpstreamError};
pub use widget::{IntelSnapshot, IntelWidget};
