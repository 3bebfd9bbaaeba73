//! mailbridge - backend proxy for a webmail client.
//!
//! This library provides the HTTP surface that forwards browser requests to
//! Microsoft Graph, a generative-text service, and a CRM, including the
//! streaming relay that pipes incremental generation output to the client.

pub mod config;
pub mod error;
pub mod proxy;
pub mod upstream;

pub use config::Config;
pub use error::{Error, Result};
