//! Clients for the external services the proxy forwards to.
//!
//! Each client is a cheap clone over a shared [`reqwest::Client`], constructed
//! once at startup and handed to handlers through axum state.

pub mod crm;
pub mod genai;
pub mod graph;
pub(crate) mod sse;

pub use crm::CrmClient;
pub use genai::GenAiClient;
pub use graph::GraphClient;
