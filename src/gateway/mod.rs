//! HTTP gateway
//!
//! Exposes the processing agent and the memory store as a JSON API.

mod handler;
mod server;

pub use handler::{build_app, ApiError};
pub use server::{Gateway, GatewayBuilder, GatewayState, GatewayStatus};
