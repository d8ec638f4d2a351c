//! Runtime and environment helpers shared by every component.

pub mod environment;
pub mod runtime;

pub use environment::{is_browser, BuildMode, APP_MODE_ENV};
pub use runtime::spawn_detached;
