//! Vertex AI transports for Recast.
//!
//! All transports implement the `recast_core::BackendTransport` trait.
//! The router picks a transport per request shape: the prediction client
//! for fresh requests, the raw REST transport for cached requests and
//! cache creation (the prediction API has no cache support).

pub mod api;
pub mod auth;
pub mod endpoint;
mod http;
pub mod prediction;
pub mod rest;
pub mod router;

pub use auth::{GcloudCredentials, StaticToken};
pub use endpoint::VertexEndpoint;
pub use prediction::PredictionClient;
pub use rest::RestTransport;
pub use router::TransportRouter;
