//! Domain models for bundles and the live document triple.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One of the three documents edited together as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Tabular data, one header row followed by records.
    Data,
    /// Jinja template rendered once per data row.
    Template,
    /// YAML variables shared by every row.
    Vars,
}

impl DocumentKind {
    /// Every kind in emission order.
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Data,
        DocumentKind::Template,
        DocumentKind::Vars,
    ];

    /// Tag name used by the tagged text format.
    pub fn tag(&self) -> &'static str {
        match self {
            DocumentKind::Data => "data.csv",
            DocumentKind::Template => "template.j2",
            DocumentKind::Vars => "vars.yml",
        }
    }

    /// Query parameter carrying this document in a URL.
    pub fn param(&self) -> &'static str {
        match self {
            DocumentKind::Data => "data",
            DocumentKind::Template => "template",
            DocumentKind::Vars => "vars",
        }
    }

    /// Look up a kind by its query parameter name.
    pub fn from_param(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.param() == name)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

/// The unit of exchange between channels.
///
/// Every field is optional. An absent field means "leave as-is" when overlaid and "clear" when
/// fully loaded, while `Some(String::new())` is always a deliberate clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<String>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for a single field.
    pub fn with(mut self, kind: DocumentKind, text: impl Into<String>) -> Self {
        self.set(kind, Some(text.into()));
        self
    }

    pub fn get(&self, kind: DocumentKind) -> Option<&str> {
        self.slot(kind).as_deref()
    }

    pub fn set(&mut self, kind: DocumentKind, text: Option<String>) {
        *self.slot_mut(kind) = text;
    }

    /// Returns `true` when no field is present.
    pub fn is_empty(&self) -> bool {
        DocumentKind::ALL.iter().all(|kind| self.get(*kind).is_none())
    }

    /// Present fields in emission order.
    pub fn fields(&self) -> impl Iterator<Item = (DocumentKind, &str)> + '_ {
        DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|text| (kind, text)))
    }

    fn slot(&self, kind: DocumentKind) -> &Option<String> {
        match kind {
            DocumentKind::Data => &self.data,
            DocumentKind::Template => &self.template,
            DocumentKind::Vars => &self.vars,
        }
    }

    fn slot_mut(&mut self, kind: DocumentKind) -> &mut Option<String> {
        match kind {
            DocumentKind::Data => &mut self.data,
            DocumentKind::Template => &mut self.template,
            DocumentKind::Vars => &mut self.vars,
        }
    }
}

/// Snapshot of the live documents, all three always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documents {
    pub data: String,
    pub template: String,
    pub vars: String,
}

impl Documents {
    pub fn get(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Data => &self.data,
            DocumentKind::Template => &self.template,
            DocumentKind::Vars => &self.vars,
        }
    }

    pub fn set(&mut self, kind: DocumentKind, text: String) {
        match kind {
            DocumentKind::Data => self.data = text,
            DocumentKind::Template => self.template = text,
            DocumentKind::Vars => self.vars = text,
        }
    }

    /// Bundle carrying every document, including empty ones.
    pub fn to_bundle(&self) -> Bundle {
        Bundle {
            data: Some(self.data.clone()),
            template: Some(self.template.clone()),
            vars: Some(self.vars.clone()),
        }
    }
}
