//! Recognising bundles inside arbitrary text.
//!
//! Grammar, read direction:
//!
//! ```text
//! text    := any* (section any*)*
//! section := "<" tag ">" body "</" tag ">"     ; tag names case-insensitive
//! tag     := "data.csv" | "template.j2" | "vars.yml"
//! body    := shortest run of any character, newlines included
//! ```
//!
//! Sections are optional and unordered. A text is a bundle attempt as soon as any opening tag
//! appears; closing tags are only needed to extract a field.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::errors::DataTemplateError;
use crate::domain::model::{Bundle, DocumentKind};

// Tag names fold ASCII case only; Unicode folding would accept `ſ` for `s` and `K` for `k`.
static TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?i-u:data\.csv|template\.j2|vars\.yml)>").expect("trigger pattern")
});

static SECTIONS: Lazy<[(DocumentKind, Regex); 3]> = Lazy::new(|| {
    DocumentKind::ALL.map(|kind| {
        let tag = regex::escape(kind.tag());
        let pattern = format!(r"(?s)<(?i-u:{tag})>(.*?)</(?i-u:{tag})>");
        (kind, Regex::new(&pattern).expect("section pattern"))
    })
});

/// Whether `text` contains at least one opening bundle tag.
pub fn is_bundle_attempt(text: &str) -> bool {
    TRIGGER.is_match(text)
}

/// Extract a bundle from `text`.
///
/// Returns `Ok(None)` only when no opening tag exists and `strict` is off, which is the paste
/// path where most clipboard content is ordinary text. In strict mode the same case is
/// [`DataTemplateError::InvalidFormat`]. Once triggered the result is always a bundle, possibly
/// with every field absent.
pub fn detect(text: &str, strict: bool) -> Result<Option<Bundle>, DataTemplateError> {
    if !is_bundle_attempt(text) {
        debug!(strict, "no bundle tags found");
        return if strict {
            Err(DataTemplateError::InvalidFormat)
        } else {
            Ok(None)
        };
    }

    let mut bundle = Bundle::new();
    for (kind, pattern) in SECTIONS.iter() {
        if let Some(body) = pattern.captures(text).and_then(|caps| caps.get(1)) {
            bundle.set(*kind, Some(body.as_str().trim().to_string()));
        }
    }
    debug!(
        data = bundle.data.is_some(),
        template = bundle.template.is_some(),
        vars = bundle.vars.is_some(),
        "bundle detected"
    );
    Ok(Some(bundle))
}
