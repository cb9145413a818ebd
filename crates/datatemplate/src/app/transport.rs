//! URL sharing, query restore, and hand-off destinations.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Url, form_urlencoded};

use crate::app::codec::TransportCodec;
use crate::domain::errors::{DataTemplateError, EncodingError};
use crate::domain::model::{Bundle, DocumentKind, Documents};

/// Data must show word characters on two different lines: a header and at least one row.
static TABULAR_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9A-Za-z_][^\r\n\x{2028}\x{2029}]*[\r\n]+[^\r\n\x{2028}\x{2029}]*[0-9A-Za-z_]")
        .expect("tabular shape pattern")
});

/// Decoded query parameters keyed by lower-cased name.
///
/// When a key repeats, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    values: HashMap<String, String>,
}

impl QueryParameters {
    pub fn parse(query: &str) -> Self {
        let values = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.to_lowercase(), value.into_owned()))
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether any of `data`, `template`, `vars` is present.
    pub fn has_bundle_fields(&self) -> bool {
        DocumentKind::ALL
            .iter()
            .any(|kind| self.values.contains_key(kind.param()))
    }

    /// Decode the bundle carried by the query, if any field is present.
    ///
    /// Every present field is decoded before anything is returned, so a failure leaves nothing
    /// half applied.
    pub fn decode_bundle(&self, codec: &TransportCodec) -> Result<Option<Bundle>, EncodingError> {
        if !self.has_bundle_fields() {
            return Ok(None);
        }
        let fields = DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind.param()).map(|value| (kind, value)));
        codec.decode_fields(fields).map(Some)
    }
}

/// The address the session was opened from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Option<String>,
}

impl Location {
    /// Split a URL, or a bare path, into its path and query. Fragments are dropped.
    pub fn parse(raw: &str) -> Self {
        let without_fragment = raw.split_once('#').map_or(raw, |(head, _)| head);
        match without_fragment.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                query: Some(query.to_string()),
            },
            None => Self {
                path: without_fragment.to_string(),
                query: None,
            },
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// A `?` is present, even with nothing after it.
    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    pub fn query_parameters(&self) -> QueryParameters {
        self.query
            .as_deref()
            .map(QueryParameters::parse)
            .unwrap_or_default()
    }

    pub fn strip_query(&mut self) {
        self.query = None;
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::parse("/")
    }
}

/// A page opened in a new browsing context, with its query payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub page: String,
    pub params: Vec<(String, String)>,
}

impl Destination {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Resolve against `base`, form-encoding the parameters.
    pub fn to_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.join(&self.page)?;
        url.set_query(None);
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(
                self.params
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }
}

/// Build a share link that restores `bundle` when opened.
pub fn share_url(
    base: &Url,
    codec: &TransportCodec,
    bundle: &Bundle,
) -> Result<Url, EncodingError> {
    let pairs = codec.encode_bundle(bundle)?;
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url)
}

/// Destination for the rendering engine carrying all three encoded documents.
pub fn generate_destination(
    page: &str,
    codec: &TransportCodec,
    documents: &Documents,
) -> Result<Destination, EncodingError> {
    let pairs = codec.encode_bundle(&documents.to_bundle())?;
    Ok(pairs
        .into_iter()
        .fold(Destination::new(page), |dest, (name, value)| {
            dest.with_param(name, value)
        }))
}

/// Shape checks run before generate or export. Data is checked first.
pub fn validate_for_generate(documents: &Documents) -> Result<(), DataTemplateError> {
    if !documents.data.is_empty() && !TABULAR_SHAPE.is_match(&documents.data) {
        return Err(DataTemplateError::EmptyDataShape);
    }
    if documents.template.is_empty() {
        return Err(DataTemplateError::MissingTemplate);
    }
    Ok(())
}
