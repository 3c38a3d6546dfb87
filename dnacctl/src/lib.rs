//! Catalyst Centre API client
//!
//! This library provides the session manager, request dispatcher, and task
//! poller used by the `dnacctl` tool.
//!
//! # Public API
//!
//! The primary public API is [`client::Dnac`], an authenticated session
//! that sends calls through a [`transport::Transport`]. Configuration types
//! for the CLI are available via [`config::CliConfig`] and
//! [`config::ConfigBuilder`].
//!
//! ```no_run
//! use dnacctl::client::Dnac;
//! use dnac_core::ClientOptions;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = ClientOptions::default().with_verify_ssl(false);
//! let mut dnac = Dnac::new("https://sandboxdnac.cisco.com", options)?;
//! dnac.login("devnetuser", "password").await?;
//!
//! let sites = dnac.get("site").param("limit", 10).await?;
//! println!("{}", sites);
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Authenticated session and request dispatch.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// Task polling.
pub mod poller;

/// HTTP transport abstraction.
pub mod transport;

pub use client::{ApiCall, Dnac};
pub use poller::CompletedTask;
pub use transport::{HttpTransport, Transport};

#[cfg(test)]
pub mod test_utils;
