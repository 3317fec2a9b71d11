//! Typed client for an Odoo JSON-RPC forwarding proxy.
//!
//! A [`Dispatcher`] posts an [`OdooRequest`](rpc::OdooRequest) to
//! `{endpoint}/api/odoo` and hands back the [`RpcEnvelope`](rpc::RpcEnvelope).
//! Failures of the call itself are [`ForwardError`]s; errors reported by Odoo
//! stay inside the envelope.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod rpc;

pub use config::ConnectionSettings;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{ConfigError, EnvelopeError, ForwardError, RawResponse};
