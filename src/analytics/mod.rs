//! # Analytics
//!
//! Per-app analytics handles with user properties, locally recorded events and optional
//! forwarding through the GA4 Measurement Protocol.
//!
//! [`is_supported`] decides whether analytics should run at all; the [`enricher`] attaches the
//! client's public IP address as the `clientIp` user property in production builds.

mod api;
pub mod enricher;
pub mod error;
mod support;
mod transport;

pub use api::{get_analytics, Analytics, AnalyticsEvent};
pub use enricher::{enrich, enrich_now, EnrichOutcome, IpLookup, IpifyLookup};
pub use error::{AnalyticsError, AnalyticsErrorCode, AnalyticsResult};
pub use support::{
    is_supported, DefaultSupportProbe, StaticSupport, SupportProbe, ANALYTICS_DISABLED_ENV,
};
pub use transport::{
    MeasurementProtocolConfig, MeasurementProtocolDispatcher, MeasurementProtocolEndpoint,
};
