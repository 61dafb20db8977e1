//! Shared GCP plumbing (token acquisition)

pub mod auth;

pub use auth::AccessTokenProvider;
