//! # envault-remote
//!
//! HTTP implementation of the [`envault_sync::Remote`] and
//! [`envault_sync::FileSource`] seams, built on reqwest.
//!
//! ```text
//! POST https://<server>/api/v1/apps/<env>/setup/<token>
//! POST https://<server>/api/v1/apps/<env>/update          (Bearer <authToken>)
//! GET  https://<server>/api/v1/apps/<env>/download/<token>/file/<uuid>
//! ```

pub mod client;

pub use client::{app_url, EnvaultClient, HttpFileSource, CONNECT_TIMEOUT};
