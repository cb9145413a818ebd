//! Export of the live documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::codec::serialize;
use crate::domain::model::{DocumentKind, Documents};
use crate::infra::clipboard::Clipboard;

const PAGE_TEMPLATE_NAME: &str = "dt_page";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Tagged text bundle, the format accepted by import and paste.
    Dt,
    /// `dt.yml` document for the command line renderer.
    Yaml,
    /// JSON object with `data`, `template` and `vars` keys.
    Json,
    /// Standalone HTML page showing each document.
    Html,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Dt => "dt",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }

    /// Recommended file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Dt => "dt",
            ExportFormat::Yaml => "yml",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportFormatParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dt" | "tagged" | "text" => Ok(ExportFormat::Dt),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "json" => Ok(ExportFormat::Json),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(ExportFormatParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Error returned when parsing an [`ExportFormat`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExportFormatParseError {
    #[error("unknown export format '{0}'")]
    UnknownFormat(String),
}

/// Runtime options controlling export behavior.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub title: Option<String>,
    pub output_path: Option<PathBuf>,
    pub copy_to_clipboard: bool,
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            title: None,
            output_path: None,
            copy_to_clipboard: false,
        }
    }
}

/// Result of an export operation.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub rendered: String,
    pub output_path: Option<PathBuf>,
    pub copied_to_clipboard: bool,
}

/// Responsible for rendering the documents and writing artifacts.
pub struct Exporter {
    env: Environment<'static>,
    clipboard: Mutex<Clipboard>,
}

impl Exporter {
    /// Create a new exporter with the page template loaded.
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
            clipboard: Mutex::new(Clipboard::new()),
        })
    }

    /// Render the documents in the requested format.
    pub fn render(&self, documents: &Documents, options: &ExportOptions) -> Result<String> {
        match options.format {
            ExportFormat::Dt => Ok(serialize(&documents.to_bundle())),
            ExportFormat::Yaml => serde_yaml::to_string(&DtFile::from(documents))
                .context("failed to serialize dt.yml"),
            ExportFormat::Json => serde_json::to_string_pretty(&documents.to_bundle())
                .context("failed to serialize bundle as JSON"),
            ExportFormat::Html => self.render_page(documents, options),
        }
    }

    /// Render the documents and persist/copy outputs based on options.
    pub fn export(&self, documents: &Documents, options: &ExportOptions) -> Result<ExportResult> {
        let rendered = self.render(documents, options)?;

        if let Some(path) = &options.output_path {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create export directory: {}", parent.display())
                })?;
            }
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write export output to {}", path.display()))?;
        }

        if options.copy_to_clipboard {
            self.clipboard
                .lock()
                .map_err(|_| anyhow!("clipboard lock poisoned"))?
                .copy(&rendered)
                .context("failed to copy export to clipboard")?;
        }

        Ok(ExportResult {
            rendered,
            output_path: options.output_path.clone(),
            copied_to_clipboard: options.copy_to_clipboard,
        })
    }

    fn render_page(&self, documents: &Documents, options: &ExportOptions) -> Result<String> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format export timestamp")?;
        let context = PageContext {
            title: options
                .title
                .clone()
                .unwrap_or_else(|| "DataTemplate".to_owned()),
            generated_at,
            documents: DocumentKind::ALL
                .into_iter()
                .map(|kind| PageDocument {
                    name: kind.tag(),
                    text: documents.get(kind).to_owned(),
                })
                .collect(),
        };

        let template = self
            .env
            .get_template(PAGE_TEMPLATE_NAME)
            .map_err(|err| anyhow!("missing page template: {err}"))?;
        template
            .render(&context)
            .map_err(|err| anyhow!("failed to render export page: {err}"))
    }
}

/// File name for an export, reusing the last imported file's stem when there is one.
pub fn default_file_name(last_file_name: Option<&str>, format: ExportFormat) -> PathBuf {
    match last_file_name
        .map(Path::new)
        .and_then(|path| path.file_stem())
        .filter(|stem| !stem.is_empty())
    {
        Some(stem) => PathBuf::from(stem).with_extension(format.extension()),
        None => PathBuf::from(format!("datatemplate.{}", format.extension())),
    }
}

/// Escape text for embedding in markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn quote(value: String) -> String {
    escape_markup(&value)
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_filter("quote", quote);
    env.add_template(PAGE_TEMPLATE_NAME, DEFAULT_PAGE_TEMPLATE)
        .map_err(|err| anyhow!("failed to register export page template: {err}"))?;
    Ok(env)
}

/// `dt.yml` layout: a top-level `dt` mapping.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct DtFile {
    dt: DtSection,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct DtSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vars: Option<String>,
}

impl From<&Documents> for DtFile {
    fn from(documents: &Documents) -> Self {
        let non_empty = |text: &str| (!text.is_empty()).then(|| text.to_owned());
        Self {
            dt: DtSection {
                data: non_empty(&documents.data),
                template: documents.template.clone(),
                vars: non_empty(&documents.vars),
            },
        }
    }
}

#[derive(Serialize)]
struct PageContext {
    title: String,
    generated_at: String,
    documents: Vec<PageDocument>,
}

#[derive(Serialize)]
struct PageDocument {
    name: &'static str,
    text: String,
}

const DEFAULT_PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ title | quote }}</title>
</head>
<body>
<p>Exported {{ generated_at }}</p>
{% for document in documents %}
<h2>{{ document.name }}</h2>
<pre>{{ document.text | quote }}</pre>
{% endfor %}
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn documents() -> Documents {
        Documents {
            data: "host,ip\nr1,10.0.0.1".into(),
            template: "<b>{{ host }}</b>".into(),
            vars: String::new(),
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_markup(r#"a & b < c > "d" 'e'"#),
            "a &amp; b &lt; c &gt; &quot;d&quot; &apos;e&apos;"
        );
        assert_eq!(escape_markup("plain"), "plain");
    }

    #[test]
    fn dt_export_keeps_every_document() {
        let exporter = Exporter::new().unwrap();
        let rendered = exporter
            .render(&documents(), &ExportOptions::new(ExportFormat::Dt))
            .unwrap();
        assert!(rendered.starts_with("<data.csv>\nhost,ip\n"));
        assert!(rendered.ends_with("<vars.yml>\n\n</vars.yml>\n"));
    }

    #[test]
    fn yaml_export_matches_dt_layout() {
        let exporter = Exporter::new().unwrap();
        let rendered = exporter
            .render(&documents(), &ExportOptions::new(ExportFormat::Yaml))
            .unwrap();
        let parsed: DtFile = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed, DtFile::from(&documents()));
        assert_eq!(parsed.dt.vars, None);
        assert!(!rendered.contains("vars"));
    }

    #[test]
    fn html_export_escapes_document_text() {
        let exporter = Exporter::new().unwrap();
        let mut options = ExportOptions::new(ExportFormat::Html);
        options.title = Some("site \"east\"".into());
        let rendered = exporter.render(&documents(), &options).unwrap();
        assert!(rendered.contains("<title>site &quot;east&quot;</title>"));
        assert!(rendered.contains("<pre>&lt;b&gt;{{ host }}&lt;/b&gt;</pre>"));
        assert!(rendered.contains("<h2>template.j2</h2>"));
    }

    #[test]
    fn default_file_name_reuses_import_stem() {
        assert_eq!(
            default_file_name(Some("routers.dt"), ExportFormat::Yaml),
            PathBuf::from("routers.yml")
        );
        assert_eq!(
            default_file_name(None, ExportFormat::Html),
            PathBuf::from("datatemplate.html")
        );
    }

    #[test]
    fn parses_format_aliases() {
        assert_eq!("YML".parse::<ExportFormat>(), Ok(ExportFormat::Yaml));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
