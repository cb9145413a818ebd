//! A directory of three files acting as the editing surfaces.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::session::SessionHost;
use crate::app::transport::{Destination, Location};
use crate::domain::model::{DocumentKind, Documents};
use crate::infra::config::Config;

const STATE_FILE: &str = ".datatemplate/state.toml";

/// Facts about the workspace that outlive a single session.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkspaceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_import: Option<String>,
}

/// Session host backed by `data.csv`, `template.j2` and `vars.yml` in a directory.
///
/// Edits are buffered in memory. Once the session installs its unload guard, [`close`] writes
/// them back; without the guard nothing was edited and closing leaves the files alone.
///
/// [`close`]: WorkspaceHost::close
#[derive(Debug)]
pub struct WorkspaceHost {
    root: PathBuf,
    files: [PathBuf; 3],
    documents: Documents,
    modified: [bool; 3],
    base_url: Url,
    focused: Option<DocumentKind>,
    visible_location: Option<String>,
    persist_on_close: bool,
    opened: Vec<Url>,
    state: WorkspaceState,
}

impl WorkspaceHost {
    /// Open the workspace at `root`. Missing files read as empty documents.
    pub fn open(root: impl Into<PathBuf>, config: &Config) -> Result<Self> {
        let root = root.into();
        let names = &config.workspace;
        let files = [
            root.join(&names.data_file),
            root.join(&names.template_file),
            root.join(&names.vars_file),
        ];

        let mut documents = Documents::default();
        for (kind, path) in DocumentKind::ALL.into_iter().zip(files.iter()) {
            documents.set(kind, read_document(path)?);
        }
        let state = read_state(&root.join(STATE_FILE))?;
        debug!(root = %root.display(), "opened workspace");

        Ok(Self {
            root,
            files,
            documents,
            modified: [false; 3],
            base_url: config.share.base_url()?,
            focused: None,
            visible_location: None,
            persist_on_close: false,
            opened: Vec::new(),
            state,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a document.
    pub fn path(&self, kind: DocumentKind) -> &Path {
        &self.files[index(kind)]
    }

    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    pub fn is_modified(&self) -> bool {
        self.modified.iter().any(|flag| *flag)
    }

    /// Document most recently given focus after an error.
    pub fn focused(&self) -> Option<DocumentKind> {
        self.focused
    }

    /// Location shown after the query was consumed, if it was.
    pub fn visible_location(&self) -> Option<&str> {
        self.visible_location.as_deref()
    }

    /// URLs of every destination opened so far.
    pub fn opened(&self) -> &[Url] {
        &self.opened
    }

    /// File name of the last bundle imported into this workspace.
    pub fn last_import(&self) -> Option<&str> {
        self.state.last_import.as_deref()
    }

    /// Remember an imported file name for later sessions.
    pub fn record_import(&mut self, file_name: &str) -> Result<()> {
        self.state.last_import = Some(file_name.to_owned());
        let path = self.root.join(STATE_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string(&self.state).context("failed to serialize workspace state")?;
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(file = file_name, "recorded import");
        Ok(())
    }

    /// Write modified documents to disk, returning the paths written.
    pub fn save(&mut self) -> Result<Vec<PathBuf>> {
        if !self.is_modified() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.root).with_context(|| {
            format!("failed to create workspace directory {}", self.root.display())
        })?;

        let mut written = Vec::new();
        for kind in DocumentKind::ALL {
            let slot = index(kind);
            if !self.modified[slot] {
                continue;
            }
            let path = &self.files[slot];
            fs::write(path, self.documents.get(kind))
                .with_context(|| format!("failed to write {}", path.display()))?;
            self.modified[slot] = false;
            written.push(path.clone());
        }
        info!(files = written.len(), "saved workspace");
        Ok(written)
    }

    /// End the session. Persists edits if the unload guard was installed.
    pub fn close(mut self) -> Result<Vec<PathBuf>> {
        if self.persist_on_close {
            return self.save();
        }
        if self.is_modified() {
            warn!("closing workspace with unsaved changes");
        }
        Ok(Vec::new())
    }
}

impl SessionHost for WorkspaceHost {
    fn document(&self, kind: DocumentKind) -> String {
        self.documents.get(kind).to_owned()
    }

    fn set_document(&mut self, kind: DocumentKind, text: String) {
        if self.documents.get(kind) != text {
            self.modified[index(kind)] = true;
        }
        self.documents.set(kind, text);
    }

    fn focus(&mut self, kind: DocumentKind) {
        self.focused = Some(kind);
    }

    fn replace_location(&mut self, location: &Location) {
        debug!(path = location.path(), "query consumed");
        self.visible_location = Some(location.path().to_owned());
    }

    fn install_unload_guard(&mut self) {
        self.persist_on_close = true;
    }

    fn open(&mut self, destination: &Destination) {
        match destination.to_url(&self.base_url) {
            Ok(url) => {
                info!(page = %destination.page, "opening destination");
                self.opened.push(url);
            }
            Err(err) => warn!(page = %destination.page, error = %err, "invalid destination"),
        }
    }
}

fn index(kind: DocumentKind) -> usize {
    match kind {
        DocumentKind::Data => 0,
        DocumentKind::Template => 1,
        DocumentKind::Vars => 2,
    }
}

fn read_state(path: &Path) -> Result<WorkspaceState> {
    if !path.exists() {
        return Ok(WorkspaceState::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_document(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_read_as_empty() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("template.j2"), "{{ x }}")?;
        let host = WorkspaceHost::open(temp.path(), &Config::default())?;
        assert_eq!(host.document(DocumentKind::Template), "{{ x }}");
        assert_eq!(host.document(DocumentKind::Data), "");
        assert!(!host.is_modified());
        Ok(())
    }

    #[test]
    fn close_without_guard_discards_edits() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut host = WorkspaceHost::open(temp.path(), &Config::default())?;
        host.set_document(DocumentKind::Vars, "a: 1".into());
        assert!(host.is_modified());
        assert!(host.close()?.is_empty());
        assert!(!temp.path().join("vars.yml").exists());
        Ok(())
    }

    #[test]
    fn guarded_close_writes_only_changed_documents() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("data.csv"), "a\n1")?;
        let mut host = WorkspaceHost::open(temp.path(), &Config::default())?;
        host.set_document(DocumentKind::Data, "a\n1".into());
        host.set_document(DocumentKind::Template, "{{ a }}".into());
        host.install_unload_guard();

        let written = host.close()?;
        assert_eq!(written, vec![temp.path().join("template.j2")]);
        assert_eq!(fs::read_to_string(temp.path().join("template.j2"))?, "{{ a }}");
        Ok(())
    }

    #[test]
    fn recorded_import_is_seen_by_the_next_open() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut host = WorkspaceHost::open(temp.path(), &Config::default())?;
        assert_eq!(host.last_import(), None);
        host.record_import("site.dt")?;
        drop(host);

        let reopened = WorkspaceHost::open(temp.path(), &Config::default())?;
        assert_eq!(reopened.last_import(), Some("site.dt"));
        assert!(!reopened.is_modified());
        Ok(())
    }

    #[test]
    fn opened_destinations_resolve_against_base_url() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut host = WorkspaceHost::open(temp.path(), &Config::default())?;
        host.open(&Destination::new("dt.html"));
        assert_eq!(host.opened()[0].as_str(), "http://127.0.0.1:8080/dt.html");
        Ok(())
    }
}
