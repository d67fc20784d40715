//! # netscope-intercept
//!
//! Transparent request interceptors feeding a [`netscope_core::LogStore`].
//!
//! This crate provides:
//! - [`InterceptedFetch`], wrapping a single-call [`FetchTransport`]
//! - [`InterceptedXhr`], wrapping a stateful open/header/send [`XhrTransport`]
//! - reqwest-backed transports ([`ReqwestTransport`], [`ReqwestXhr`])
//! - [`Interceptors`], the explicit installation step, plus an optional
//!   process-wide [`install`]
//! - environment-driven [`InterceptConfig`]
//!
//! Interception never changes what the caller observes: responses and
//! errors of the wrapped transport come back unchanged, and a failure to
//! snapshot headers or bodies only leaves the corresponding log field unset.
//!
//! # Example
//!
//! ```rust,no_run
//! use netscope_intercept::{InterceptConfig, Interceptors, RequestInit};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let interceptors = Interceptors::new(InterceptConfig::from_env())?;
//!     let _sub = interceptors.store().subscribe(|| println!("log changed"));
//!
//!     let fetch = interceptors.fetch();
//!     let response = fetch
//!         .fetch("https://example.com/api", Some(RequestInit::new().method("GET")))
//!         .await?;
//!     println!("{} -> {}", response.url, response.status);
//!
//!     for entry in interceptors.store().snapshot().iter() {
//!         println!("{} {} {}", entry.method, entry.url, entry.state);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fetch;
pub mod install;
pub mod transport;
pub mod xhr;

pub use config::{ConfigError, InterceptConfig};
pub use fetch::InterceptedFetch;
pub use install::{install, installed, Interceptors};
pub use transport::{
    FetchRequest, FetchResponse, FetchTransport, RequestInit, RequestTarget, ReqwestTransport,
    TransportError,
};
pub use xhr::{InterceptedXhr, ReqwestXhr, XhrEvent, XhrEventKind, XhrResponse, XhrTransport};
