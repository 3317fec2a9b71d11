//! HTTP transport seam used by the dispatcher.
//!
//! The dispatcher only talks to a [`Transport`]. The platform-standard
//! implementation is [`ReqwestTransport`], available with the
//! `reqwest-transport` feature (enabled by default).

#[cfg(feature = "reqwest-transport")]
mod client;
mod transport;

#[cfg(feature = "reqwest-transport")]
pub use client::ReqwestTransport;
#[cfg(test)]
pub use transport::MockTransport;
pub use transport::{HttpRequest, HttpResponse, ResponseBody, Transport, default_transport};
