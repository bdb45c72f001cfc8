//! Core operations of the import/export tool
//!
//! Contains the exporter and importer, each a thin procedure over an open
//! repository session.

pub mod exporter;
pub mod importer;

pub use exporter::Exporter;
pub use importer::Importer;
