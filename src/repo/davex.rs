//! Remote davex client
//!
//! A thin blocking HTTP client bound to a remoting endpoint. Export and
//! import pass serialized bytes through opaquely; node removals are batched
//! client-side and flushed as one JSON diff on `save`, in the batched style
//! of the remoting protocol.

use crate::error::{JackError, Result};
use crate::repo::{CollisionPolicy, ExportFormat, Session};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use std::io::{Read, Write};
use tracing::debug;
use url::Url;

/// A remote client bound to a `storage` base URL
#[derive(Debug)]
pub struct DavexClient {
    storage: Url,
    client: Client,
}

impl DavexClient {
    /// Bind a client to the remoting endpoint
    pub fn new(storage: Url) -> Self {
        Self {
            storage,
            client: Client::new(),
        }
    }

    /// Authenticate against a workspace by probing its URL
    pub fn login(self, username: &str, password: &str, workspace: &str) -> Result<DavexSession> {
        let base = workspace_url(&self.storage, workspace)?;
        let response = self
            .client
            .get(base.clone())
            .basic_auth(username, Some(password))
            .send()
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(DavexSession {
                client: self.client,
                base,
                username: username.to_string(),
                password: password.to_string(),
                pending_removals: Vec::new(),
                live: true,
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(JackError::repository(
                format!("Login failed for user {username}"),
            )),
            StatusCode::NOT_FOUND => Err(JackError::repository(format!(
                "No such workspace {workspace}"
            ))),
            status => Err(JackError::repository(format!(
                "Workspace probe failed with status {status}"
            ))),
        }
    }
}

/// A session speaking to a remote workspace
#[derive(Debug)]
pub struct DavexSession {
    client: Client,
    base: Url,
    username: String,
    password: String,
    pending_removals: Vec<String>,
    live: bool,
}

impl DavexSession {
    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(JackError::repository("Session already closed"))
        }
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn check(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(JackError::repository(format!(
                "{operation} failed with status {status} for {}",
                response.url()
            )))
        }
    }
}

fn transport_error(e: reqwest::Error) -> JackError {
    JackError::repository_with("Transport failure", e)
}

/// `{storage}/{workspace}`, tolerating a trailing slash on the base
fn workspace_url(storage: &Url, workspace: &str) -> Result<Url> {
    let mut url = storage.clone();
    url.path_segments_mut()
        .map_err(|()| JackError::config(format!("storage URL {storage} cannot have a path")))?
        .pop_if_empty()
        .push(workspace);
    Ok(url)
}

/// Workspace URL extended with the segments of a repository path
fn node_url(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| JackError::config(format!("invalid workspace URL {base}")))?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            segments.push(segment);
        }
    }
    Ok(url)
}

impl Session for DavexSession {
    fn export(&mut self, path: &str, format: ExportFormat, sink: &mut dyn Write) -> Result<()> {
        self.ensure_live()?;
        let view = match format {
            ExportFormat::SystemView => "system",
            ExportFormat::DocumentView => "document",
        };
        let url = node_url(&self.base, path)?;
        debug!("GET {url} view={view}");
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[("view", view)])
            .send()
            .map_err(transport_error)?;
        let mut response = Self::check(response, "Export")?;
        response.copy_to(sink).map_err(transport_error)?;
        Ok(())
    }

    fn import(
        &mut self,
        path: &str,
        source: &mut dyn Read,
        policy: CollisionPolicy,
    ) -> Result<()> {
        self.ensure_live()?;
        let behavior = match policy {
            CollisionPolicy::ReplaceExisting => "replace",
            CollisionPolicy::Throw => "throw",
        };
        let mut body = Vec::new();
        source
            .read_to_end(&mut body)
            .map_err(|e| JackError::repository_with("Failed to read import stream", e))?;

        let url = node_url(&self.base, path)?;
        debug!("POST {url} uuid-behavior={behavior} ({} bytes)", body.len());
        let response = self
            .request(reqwest::Method::POST, url)
            .query(&[("uuid-behavior", behavior)])
            .body(body)
            .send()
            .map_err(transport_error)?;
        Self::check(response, "Import")?;
        Ok(())
    }

    fn root_child_names(&mut self) -> Result<Vec<String>> {
        self.ensure_live()?;
        let response = self
            .request(reqwest::Method::GET, self.base.clone())
            .query(&[("children", "1")])
            .send()
            .map_err(transport_error)?;
        let response = Self::check(response, "Child listing")?;
        response
            .json::<Vec<String>>()
            .map_err(|e| JackError::repository_with("Invalid child listing response", e))
    }

    fn remove_node(&mut self, name: &str) -> Result<()> {
        self.ensure_live()?;
        // batched; durable once the diff is flushed by save
        self.pending_removals.push(format!("/{name}"));
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.pending_removals.is_empty() {
            return Ok(());
        }
        let batch = serde_json::json!({ "remove": self.pending_removals });
        debug!("POST {} batch of {} removals", self.base, self.pending_removals.len());
        let response = self
            .request(reqwest::Method::POST, self.base.clone())
            .json(&batch)
            .send()
            .map_err(transport_error)?;
        Self::check(response, "Save")?;
        self.pending_removals.clear();
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.pending_removals.clear();
        self.live = false;
        Ok(())
    }
}
