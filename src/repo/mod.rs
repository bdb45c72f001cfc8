//! Session management
//!
//! A [`Session`] is a live, authenticated connection to one workspace of one
//! repository. [`connect`] selects the connection strategy from the
//! configured transport: an embedded local engine or a remote davex client.

pub mod davex;
pub mod local;
pub mod node;
pub mod xml;

pub use node::{Node, Property, PropertyType, SYSTEM_NODE};

use crate::config::{Config, Transport};
use crate::error::Result;
use std::io::{Read, Write};

/// Subtree serialization encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Full fidelity: property types and multi-value ordering preserved
    SystemView,
    /// Human-readable: properties flattened to string attributes
    DocumentView,
}

/// Rule applied when an imported node's identity matches an existing node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Remove the existing node and keep the incoming one
    ReplaceExisting,
    /// Fail the import on the first identity collision
    Throw,
}

/// One authenticated workspace connection.
///
/// Mutations (`remove_node`, `import`) live in the session's transient space
/// until `save` persists them; `logout` discards whatever was not saved.
/// Every session must be released with `logout` exactly once.
pub trait Session {
    /// Serialize the subtree at `path` into `sink`, recursively, binaries
    /// included
    fn export(&mut self, path: &str, format: ExportFormat, sink: &mut dyn Write) -> Result<()>;

    /// Load a serialized subtree from `source` at `path`, auto-detecting the
    /// encoding
    fn import(&mut self, path: &str, source: &mut dyn Read, policy: CollisionPolicy)
    -> Result<()>;

    /// Names of the root node's direct children
    fn root_child_names(&mut self) -> Result<Vec<String>>;

    /// Remove a direct child of the root node
    fn remove_node(&mut self, name: &str) -> Result<()>;

    /// Persist pending changes
    fn save(&mut self) -> Result<()>;

    /// Release the session, discarding unsaved changes
    fn logout(&mut self) -> Result<()>;
}

/// Open an authenticated session using the configured transport
pub fn connect(config: &Config) -> Result<Box<dyn Session>> {
    match &config.transport {
        Transport::Local {
            config: engine_config,
            home,
        } => {
            let repository = local::LocalRepository::open(engine_config, home)?;
            let session = repository.login(&config.username, &config.password, &config.workspace)?;
            Ok(Box::new(session))
        }
        Transport::Davex { storage } => {
            let client = davex::DavexClient::new(storage.clone());
            let session = client.login(&config.username, &config.password, &config.workspace)?;
            Ok(Box::new(session))
        }
    }
}
