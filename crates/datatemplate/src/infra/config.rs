//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".datatemplate/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub share: Share,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub normalize: Normalize,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub workspace: Workspace,
}

/// Where share links and hand-off pages point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    #[serde(default = "Share::default_base_url")]
    pub base_url: String,
    #[serde(default = "Share::default_output_page")]
    pub output_page: String,
    #[serde(default = "Share::default_export_page")]
    pub export_page: String,
}

impl Share {
    fn default_base_url() -> String {
        "http://127.0.0.1:8080/".to_owned()
    }

    fn default_output_page() -> String {
        "output.html".into()
    }

    fn default_export_page() -> String {
        "dt.html".into()
    }

    /// Parsed base URL.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .with_context(|| format!("invalid share base_url '{}'", self.base_url))
    }
}

impl Default for Share {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            output_page: Self::default_output_page(),
            export_page: Self::default_export_page(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    #[serde(default)]
    charset: Option<String>,
}

impl Transport {
    fn default_charset() -> &'static str {
        "utf-8"
    }

    pub fn charset(&self) -> String {
        self.charset
            .clone()
            .unwrap_or_else(|| Self::default_charset().to_owned())
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            charset: Some(Self::default_charset().to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalize {
    #[serde(default)]
    data_tab_width: Option<usize>,
    #[serde(default)]
    text_tab_width: Option<usize>,
}

impl Normalize {
    fn default_tab_width() -> usize {
        2
    }

    pub fn data_tab_width(&self) -> usize {
        self.data_tab_width.unwrap_or_else(Self::default_tab_width)
    }

    pub fn text_tab_width(&self) -> usize {
        self.text_tab_width.unwrap_or_else(Self::default_tab_width)
    }
}

impl Default for Normalize {
    fn default() -> Self {
        Self {
            data_tab_width: Some(Self::default_tab_width()),
            text_tab_width: Some(Self::default_tab_width()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    clear_after_secs: Option<u64>,
}

impl Status {
    fn default_clear_after_secs() -> u64 {
        5
    }

    pub fn clear_after_secs(&self) -> u64 {
        self.clear_after_secs
            .unwrap_or_else(Self::default_clear_after_secs)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self {
            clear_after_secs: Some(Self::default_clear_after_secs()),
        }
    }
}

/// File names of the three documents inside a workspace directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default = "Workspace::default_data_file")]
    pub data_file: String,
    #[serde(default = "Workspace::default_template_file")]
    pub template_file: String,
    #[serde(default = "Workspace::default_vars_file")]
    pub vars_file: String,
}

impl Workspace {
    fn default_data_file() -> String {
        "data.csv".into()
    }

    fn default_template_file() -> String {
        "template.j2".into()
    }

    fn default_vars_file() -> String {
        "vars.yml".into()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            data_file: Self::default_data_file(),
            template_file: Self::default_template_file(),
            vars_file: Self::default_vars_file(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    base_url: Option<String>,
    charset: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            base_url: env::var("DATATEMPLATE_BASE_URL").ok(),
            charset: env::var("DATATEMPLATE_CHARSET").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(base_url: &str, charset: &str) -> Self {
        Self {
            base_url: Some(base_url.to_owned()),
            charset: Some(charset.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration for the current directory.
    pub fn load() -> Result<Self> {
        let cwd = env::current_dir()?;
        Self::load_from(&cwd)
    }

    /// Load configuration from defaults, user/global config, the config of the repository
    /// containing `start`, and env overrides.
    pub fn load_from(start: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let start = absolute_start(start, &env::current_dir()?);
        let workspace = Some(workspace_config_path(&start));
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            share: merge_share(self.share, other.share),
            transport: merge_transport(self.transport, other.transport),
            normalize: merge_normalize(self.normalize, other.normalize),
            status: merge_status(self.status, other.status),
            workspace: merge_workspace(self.workspace, other.workspace),
        }
    }
}

fn merge_share(base: Share, overlay: Share) -> Share {
    Share {
        base_url: choose(base.base_url, overlay.base_url, Share::default_base_url),
        output_page: choose(
            base.output_page,
            overlay.output_page,
            Share::default_output_page,
        ),
        export_page: choose(
            base.export_page,
            overlay.export_page,
            Share::default_export_page,
        ),
    }
}

fn merge_transport(mut base: Transport, overlay: Transport) -> Transport {
    if let Some(value) = overlay.charset {
        base.charset = Some(value);
    }
    base
}

fn merge_normalize(mut base: Normalize, overlay: Normalize) -> Normalize {
    if let Some(value) = overlay.data_tab_width {
        base.data_tab_width = Some(value);
    }
    if let Some(value) = overlay.text_tab_width {
        base.text_tab_width = Some(value);
    }
    base
}

fn merge_status(mut base: Status, overlay: Status) -> Status {
    if let Some(value) = overlay.clear_after_secs {
        base.clear_after_secs = Some(value);
    }
    base
}

fn merge_workspace(base: Workspace, overlay: Workspace) -> Workspace {
    Workspace {
        data_file: choose(
            base.data_file,
            overlay.data_file,
            Workspace::default_data_file,
        ),
        template_file: choose(
            base.template_file,
            overlay.template_file,
            Workspace::default_template_file,
        ),
        vars_file: choose(
            base.vars_file,
            overlay.vars_file,
            Workspace::default_vars_file,
        ),
    }
}

fn choose(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() {
        overlay
    } else {
        base
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("datatemplate/config.toml"))
}

/// Relative starts resolve against `cwd` so the repository search can climb above it.
fn absolute_start(start: &Path, cwd: &Path) -> PathBuf {
    if start.is_absolute() {
        start.to_path_buf()
    } else {
        cwd.join(start)
    }
}

fn workspace_config_path(start: &Path) -> PathBuf {
    let root = find_repo_root(start).unwrap_or_else(|| start.to_path_buf());
    root.join(DEFAULT_WORKSPACE_CONFIG_PATH)
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(base_url) = env.base_url {
        config.share.base_url = base_url;
    }
    if let Some(charset) = env.charset {
        config.transport.charset = Some(charset);
    }
    config
}
