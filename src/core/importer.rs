//! Subtree import
//!
//! Replaces the contents of the target subtree with the contents of a
//! previously exported file: clear everything but the reserved system node,
//! load the file, commit.

use crate::{
    config::Config,
    error::{JackError, Result},
    repo::{CollisionPolicy, SYSTEM_NODE, Session},
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Importer over an open session
pub struct Importer<'a> {
    config: &'a Config,
}

impl<'a> Importer<'a> {
    /// Create a new importer for the given configuration
    #[must_use]
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Replace the target subtree with the contents of `file`.
    ///
    /// The clear phase commits after every removed child, so a failure
    /// partway through leaves the destination partially cleared. The final
    /// commit persists the loaded tree; if it fails, the import is reported
    /// as failed with no rollback of the earlier phases.
    #[instrument(skip(self, session))]
    pub fn import(&self, session: &mut dyn Session, file: &Path) -> Result<()> {
        if !file.exists() {
            return Err(JackError::validation(format!(
                "File {} not existing, can not import",
                file.display()
            )));
        }

        self.clear_and_load(session, file)
            .map_err(|e| JackError::import(file, self.config.base_path.as_str(), e))?;

        session
            .save()
            .map_err(|e| JackError::repository_with("Failed to save the imported repository", e))?;

        info!("Imported the repository from {}", file.display());
        Ok(())
    }

    fn clear_and_load(&self, session: &mut dyn Session, file: &Path) -> Result<()> {
        for name in session.root_child_names()? {
            if name == SYSTEM_NODE {
                continue;
            }
            debug!("Removing node {name}");
            session.remove_node(&name)?;
            // one commit per removed child
            session.save()?;
        }

        let source = File::open(file).map_err(|e| JackError::file_system("open", file, e))?;
        let mut source = BufReader::new(source);
        session.import(
            &self.config.base_path,
            &mut source,
            CollisionPolicy::ReplaceExisting,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::ExportFormat;
    use std::fs;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn config() -> Config {
        Config::from_overrides(&[]).unwrap()
    }

    /// A session that must never be reached
    struct UnreachableSession;

    impl Session for UnreachableSession {
        fn export(
            &mut self,
            _path: &str,
            _format: ExportFormat,
            _sink: &mut dyn Write,
        ) -> Result<()> {
            panic!("repository was called despite a failed precondition");
        }
        fn import(
            &mut self,
            _path: &str,
            _source: &mut dyn Read,
            _policy: CollisionPolicy,
        ) -> Result<()> {
            panic!("repository was called despite a failed precondition");
        }
        fn root_child_names(&mut self) -> Result<Vec<String>> {
            panic!("repository was called despite a failed precondition");
        }
        fn remove_node(&mut self, _name: &str) -> Result<()> {
            panic!("repository was called despite a failed precondition");
        }
        fn save(&mut self) -> Result<()> {
            panic!("repository was called despite a failed precondition");
        }
        fn logout(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Records the order of repository calls
    #[derive(Default)]
    struct RecordingSession {
        children: Vec<String>,
        calls: Vec<String>,
    }

    impl Session for RecordingSession {
        fn export(
            &mut self,
            _path: &str,
            _format: ExportFormat,
            _sink: &mut dyn Write,
        ) -> Result<()> {
            unreachable!()
        }
        fn import(
            &mut self,
            path: &str,
            _source: &mut dyn Read,
            policy: CollisionPolicy,
        ) -> Result<()> {
            self.calls.push(format!("import {path} {policy:?}"));
            Ok(())
        }
        fn root_child_names(&mut self) -> Result<Vec<String>> {
            self.calls.push("list".to_string());
            Ok(self.children.clone())
        }
        fn remove_node(&mut self, name: &str) -> Result<()> {
            self.calls.push(format!("remove {name}"));
            Ok(())
        }
        fn save(&mut self) -> Result<()> {
            self.calls.push("save".to_string());
            Ok(())
        }
        fn logout(&mut self) -> Result<()> {
            self.calls.push("logout".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_missing_source_is_refused_before_any_repository_call() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let err = Importer::new(&config)
            .import(&mut UnreachableSession, &temp.path().join("missing.xml"))
            .unwrap_err();
        assert!(err.to_string().contains("not existing"));
    }

    #[test]
    fn test_clear_skips_system_node_and_commits_per_child() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("in.xml");
        fs::write(&file, r#"<sv:node sv:name="jcr:root"/>"#).unwrap();

        let mut session = RecordingSession {
            children: vec![
                "alpha".to_string(),
                SYSTEM_NODE.to_string(),
                "beta".to_string(),
            ],
            ..Default::default()
        };
        let config = config();
        Importer::new(&config).import(&mut session, &file).unwrap();

        assert_eq!(
            session.calls,
            vec![
                "list",
                "remove alpha",
                "save",
                "remove beta",
                "save",
                "import / ReplaceExisting",
                "save",
            ]
        );
    }
}
