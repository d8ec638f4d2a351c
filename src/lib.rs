//! # firebase-app-shell
//!
//! Environment-aware initialization of a Firebase backend (app, Auth, Realtime Database and
//! Analytics) plus typed helpers to read and merge-update single database fields.
//!
//! Start with [`backend::init_backend`], which looks the environment up in the
//! [`config::ConfigRegistry`], reuses or creates the app and returns a [`backend::Backend`]
//! holding every handle. Analytics is probed in the background; use
//! [`backend::Backend::analytics_ready`] to wait for it.
//!
//! Field access goes through [`fields::get_field_value`] and [`fields::update_field_value`].

pub mod analytics;
pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod database;
pub mod fields;
pub mod logger;
pub mod platform;
