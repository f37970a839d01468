//! Cairn SCM gateway
//!
//! Session/command client for the SCM server's integration API. A session is
//! opened with a [`Connector`], used for the project lookup and the
//! checkpoint, then closed.
//!
//! # Example
//!
//! ```no_run
//! use cairn_client::{ApiConnector, Connector};
//! use cairn_core::settings::{ConnectionSettings, Secret};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cairn_client::GatewayError> {
//!     let settings = ConnectionSettings {
//!         integration_host: String::new(),
//!         integration_port: 0,
//!         host: "scm.example.com".to_string(),
//!         port: 7001,
//!         user_name: "builder".to_string(),
//!         password: Secret::new("secret"),
//!         secure: true,
//!         configuration_name: "main".to_string(),
//!     };
//!
//!     let mut session = ApiConnector::new().open(&settings).await?;
//!     let project = session.resolve_project("main").await?;
//!     let result = session.checkpoint(&project, "nightly-42").await?;
//!     println!("New revision: {}", result.resultant_revision_id);
//!     session.close().await
//! }
//! ```

pub mod command;
pub mod error;
pub mod response;
pub mod session;

// Re-export commonly used types
pub use command::Command;
pub use error::{CommandError, GatewayError, Result};
pub use response::{Field, Response, WorkItem};
pub use session::{ApiConnector, ApiSession, Connector, ScmSession};
