//! Embedded local engine
//!
//! The smallest engine that makes the import/export recipe real: a node tree
//! per workspace, held in memory for the session lifetime (the transient
//! space) and persisted as JSON under the configured home directory on
//! `save`. Engine configuration is a JSON file with an optional user table;
//! when the table is absent any credentials are accepted.

use crate::error::{JackError, Result};
use crate::repo::node::{Node, ROOT_NODE, SYSTEM_NODE};
use crate::repo::xml;
use crate::repo::{CollisionPolicy, ExportFormat, Session};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Engine configuration loaded from the `jackrabbit-config` file
#[derive(Debug, Deserialize)]
struct EngineConfig {
    /// Login name to password; absent means any credentials are accepted
    #[serde(default)]
    users: Option<BTreeMap<String, String>>,
}

/// An embedded repository bound to local filesystem paths
#[derive(Debug)]
pub struct LocalRepository {
    config: EngineConfig,
    home: PathBuf,
}

impl LocalRepository {
    /// Open the engine: read its configuration file and make sure the data
    /// folder exists
    pub fn open(config_path: &Path, home: &Path) -> Result<Self> {
        let text = fs::read_to_string(config_path)
            .map_err(|e| JackError::file_system("read engine configuration", config_path, e))?;
        let config: EngineConfig = serde_json::from_str(&text).map_err(|e| {
            JackError::repository_with(
                format!("Invalid engine configuration {}", config_path.display()),
                e,
            )
        })?;
        fs::create_dir_all(home)
            .map_err(|e| JackError::file_system("create data folder", home, e))?;
        Ok(Self {
            config,
            home: home.to_path_buf(),
        })
    }

    /// Authenticate and open a workspace. A workspace that has never been
    /// saved starts out as a fresh tree.
    pub fn login(self, username: &str, password: &str, workspace: &str) -> Result<LocalSession> {
        if let Some(users) = &self.config.users {
            if users.get(username).map(String::as_str) != Some(password) {
                return Err(JackError::repository(format!(
                    "Login failed for user {username}"
                )));
            }
        }

        let path = self.home.join(format!("{workspace}.json"));
        let root = if path.exists() {
            let text = fs::read_to_string(&path)
                .map_err(|e| JackError::file_system("read workspace", &path, e))?;
            serde_json::from_str(&text).map_err(|e| {
                JackError::repository_with(format!("Corrupt workspace file {}", path.display()), e)
            })?
        } else {
            debug!("Workspace {workspace} has no saved state, starting fresh");
            Node::new_workspace_root()
        };

        Ok(LocalSession {
            path,
            root,
            live: true,
        })
    }
}

/// A session against the embedded engine
#[derive(Debug)]
pub struct LocalSession {
    path: PathBuf,
    root: Node,
    live: bool,
}

impl LocalSession {
    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(JackError::repository("Session already closed"))
        }
    }

    fn node_at(&self, path: &str) -> Result<&Node> {
        self.root
            .node_at_path(path)
            .ok_or_else(|| JackError::repository(format!("No node at {path}")))
    }

    /// Insert one subtree under the target node, honoring the collision
    /// policy for every identity carried by the incoming subtree
    fn insert_subtree(&mut self, path: &str, node: Node, policy: CollisionPolicy) -> Result<()> {
        let mut uuids = Vec::new();
        collect_uuids(&node, &mut uuids);
        for uuid in uuids {
            if self.root.contains_uuid(&uuid) {
                match policy {
                    CollisionPolicy::ReplaceExisting => {
                        debug!("Replacing existing node with uuid {uuid}");
                        self.root.remove_by_uuid(&uuid);
                    }
                    CollisionPolicy::Throw => {
                        return Err(JackError::repository(format!(
                            "A node with uuid {uuid} already exists"
                        )));
                    }
                }
            }
        }

        let target = self
            .root
            .node_at_path_mut(path)
            .ok_or_else(|| JackError::repository(format!("No node at {path}")))?;
        target.children.push(node);
        Ok(())
    }
}

fn collect_uuids(node: &Node, uuids: &mut Vec<String>) {
    if let Some(uuid) = node.uuid() {
        uuids.push(uuid.to_string());
    }
    for child in &node.children {
        collect_uuids(child, uuids);
    }
}

impl Session for LocalSession {
    fn export(&mut self, path: &str, format: ExportFormat, sink: &mut dyn Write) -> Result<()> {
        self.ensure_live()?;
        let node = self.node_at(path)?;
        match format {
            ExportFormat::SystemView => xml::write_system_view(node, sink),
            ExportFormat::DocumentView => xml::write_document_view(node, sink),
        }
    }

    fn import(
        &mut self,
        path: &str,
        source: &mut dyn Read,
        policy: CollisionPolicy,
    ) -> Result<()> {
        self.ensure_live()?;
        self.node_at(path)?;
        let incoming = xml::read_tree(BufReader::new(source))?;

        if incoming.name == ROOT_NODE {
            // a whole-workspace snapshot: merge its children into the target,
            // replacing same-name children; the engine keeps its own system
            // subtree
            for child in incoming.children {
                if child.name == SYSTEM_NODE {
                    continue;
                }
                let target = self
                    .root
                    .node_at_path_mut(path)
                    .ok_or_else(|| JackError::repository(format!("No node at {path}")))?;
                target.remove_child(&child.name);
                self.insert_subtree(path, child, policy)?;
            }
            Ok(())
        } else {
            self.insert_subtree(path, incoming, policy)
        }
    }

    fn root_child_names(&mut self) -> Result<Vec<String>> {
        self.ensure_live()?;
        Ok(self.root.children.iter().map(|c| c.name.clone()).collect())
    }

    fn remove_node(&mut self, name: &str) -> Result<()> {
        self.ensure_live()?;
        if name == SYSTEM_NODE {
            return Err(JackError::repository(format!("{SYSTEM_NODE} is protected")));
        }
        if self.root.remove_child(name) {
            Ok(())
        } else {
            Err(JackError::repository(format!("No node named {name}")))
        }
    }

    fn save(&mut self) -> Result<()> {
        self.ensure_live()?;
        let json = serde_json::to_string_pretty(&self.root)
            .map_err(|e| JackError::repository_with("Failed to serialize workspace", e))?;
        // write-then-rename so a failed save never corrupts the workspace
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| JackError::file_system("write workspace", &tmp, e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| JackError::file_system("replace workspace", &self.path, e))?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.live = false;
        Ok(())
    }
}
