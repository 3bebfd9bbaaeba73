//! HTTP proxy server module.
//!
//! This module provides the JSON API the browser client talks to and forwards
//! each request to the mail provider, the generation service, or the CRM.

mod assist;
mod crm;
mod folders;
mod mail;
pub mod relay;
mod server;
mod subscriptions;
pub mod types;

pub use server::{create_router, run_server, AppState, RequestId};
