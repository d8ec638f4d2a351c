//! # Auth
//!
//! Email/password authentication against the Identity Toolkit REST API. The handle is created
//! synchronously per app; network calls happen only when signing in or refreshing tokens. The
//! Realtime Database attaches the current ID token to its REST requests.

mod api;
mod error;
mod model;

#[doc(inline)]
pub use api::{
    auth_for_app, Auth, AuthEndpoints, DEFAULT_IDENTITY_TOOLKIT_ENDPOINT,
    DEFAULT_SECURE_TOKEN_ENDPOINT,
};

pub(crate) use api::existing_auth;

#[doc(inline)]
pub use error::{AuthError, AuthResult};

#[doc(inline)]
pub use model::User;
