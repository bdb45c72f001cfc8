//! Command-line argument parsing and validation

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Whole-repository import/export tool for JCR content repositories
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "jack")]
pub struct Args {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace repository contents from an exported file (format
    /// auto-detected)
    Import {
        /// File to load
        file: PathBuf,

        /// Configuration overrides
        #[arg(value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Export the repository in the system view encoding
    Export {
        /// Destination file; must not exist yet
        file: PathBuf,

        /// Configuration overrides
        #[arg(value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Export the repository in the document view encoding
    #[command(name = "exportdocument")]
    ExportDocument {
        /// Destination file; must not exist yet
        file: PathBuf,

        /// Configuration overrides
        #[arg(value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Anything else: accepted, reported, and performed as a no-op
    #[command(external_subcommand)]
    Other(Vec<String>),
}

impl Args {
    /// The `key=value` overrides of the parsed command
    pub fn overrides(&self) -> &[String] {
        match &self.command {
            Command::Import { overrides, .. }
            | Command::Export { overrides, .. }
            | Command::ExportDocument { overrides, .. } => overrides,
            // raw argv: command name, file, then overrides
            Command::Other(argv) => argv.get(2..).unwrap_or(&[]),
        }
    }

    /// The file argument of the parsed command
    pub fn file(&self) -> Option<&Path> {
        match &self.command {
            Command::Import { file, .. }
            | Command::Export { file, .. }
            | Command::ExportDocument { file, .. } => Some(file),
            Command::Other(argv) => argv.get(1).map(Path::new),
        }
    }
}

/// Parse command line arguments.
///
/// An unrecognized command still needs a file argument to proceed; without
/// one this is a plain usage error.
pub fn parse_args() -> Args {
    let args = Args::parse();
    if let Command::Other(argv) = &args.command {
        if argv.len() < 2 {
            println!("usage: jack (import|export|exportdocument) <file> [key=value ...]");
            std::process::exit(2);
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let args = Args::try_parse_from(["jack", "import", "in.xml"]).unwrap();
        assert!(!args.debug);
        assert!(matches!(args.command, Command::Import { .. }));
        assert_eq!(args.file(), Some(Path::new("in.xml")));
        assert!(args.overrides().is_empty());
    }

    #[test]
    fn test_parse_export_with_overrides() {
        let args = Args::try_parse_from([
            "jack",
            "export",
            "out.xml",
            "repository-base-xpath=/content",
            "workspace=staging",
        ])
        .unwrap();
        match args.command {
            Command::Export { ref overrides, .. } => {
                assert_eq!(overrides.len(), 2);
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_parse_exportdocument_name() {
        let args = Args::try_parse_from(["jack", "exportdocument", "out.xml"]).unwrap();
        assert!(matches!(args.command, Command::ExportDocument { .. }));
    }

    #[test]
    fn test_parse_debug_flag() {
        let args = Args::try_parse_from(["jack", "--debug", "export", "out.xml"]).unwrap();
        assert!(args.debug);
    }

    #[test]
    fn test_unrecognized_command_is_captured() {
        let args = Args::try_parse_from(["jack", "frobnicate", "file.xml", "workspace=w"]).unwrap();
        match args.command {
            Command::Other(ref argv) => {
                assert_eq!(argv[0], "frobnicate");
                assert_eq!(args.file(), Some(Path::new("file.xml")));
                assert_eq!(args.overrides(), ["workspace=w".to_string()]);
            }
            _ => panic!("Expected external subcommand"),
        }
    }

    #[test]
    fn test_missing_file_is_a_parse_error() {
        assert!(Args::try_parse_from(["jack", "import"]).is_err());
        assert!(Args::try_parse_from(["jack"]).is_err());
    }
}
