//! # Jack
//!
//! Whole-repository import/export for JCR content repositories: serialize
//! the tree at a configured base path to a file, or replace repository
//! contents from a previously exported file.
//!
//! ## Features
//!
//! - System view and document view export, format auto-detection on import
//! - Clear-before-import that never touches the reserved `jcr:system` node
//! - Local embedded engine and remote davex transport behind one session
//!   seam
//! - Bundled defaults overridable with `key=value` arguments
//!
//! ## Example
//!
//! ```no_run
//! use jack::config::Config;
//! use jack::repo;
//!
//! let config = Config::from_overrides(&["workspace=staging".to_string()])?;
//! let mut session = repo::connect(&config)?;
//! let names = session.root_child_names()?;
//! session.logout()?;
//! println!("root children: {names:?}");
//! # Ok::<(), jack::error::JackError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod repo;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity
pub fn setup_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
