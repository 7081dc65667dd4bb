//! Taqyon Bridge - live object bridge between a native host and a web renderer
//!
//! The host registers named objects exposing properties, methods and signals.
//! The renderer receives a schema snapshot of every object, mirrors it in a
//! [`Proxy`], calls methods remotely and is kept current through change
//! notifications, all over a message transport with no shared memory.

pub mod backend;
pub mod config;
pub mod host;
pub mod protocol;
pub mod renderer;
pub mod transport;

mod error;

pub use config::BridgeConfig;
pub use error::{Error, ErrorCode, ErrorInfo, Result};
pub use host::{Emitter, Host, Interface, NativeObject, Property};
pub use protocol::{Message, ObjectSchema};
pub use renderer::{ListenerId, Proxy, Renderer};

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` is honored; the configured filter is added as a default directive.
pub fn init_tracing(config: &BridgeConfig) -> Result<()> {
    let directive: Directive = config
        .log_filter
        .parse()
        .map_err(|e| Error::Config(format!("Invalid log filter {:?}: {}", config.log_filter, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))
}

