//! Whitespace canonicalisation applied when a document enters the session.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::model::{Bundle, DocumentKind, Documents};
use crate::infra::config::Config;

static LEADING_INDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mR)^[ \t]+").expect("leading indent pattern"));

const DEFAULT_TAB_WIDTH: usize = 2;

/// Field-specific whitespace transforms.
///
/// The rendering engine and YAML are whitespace sensitive, while pasted material mixes tabs and
/// spaces freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNormalizer {
    data_tab_width: usize,
    text_tab_width: usize,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            data_tab_width: DEFAULT_TAB_WIDTH,
            text_tab_width: DEFAULT_TAB_WIDTH,
        }
    }
}

impl TextNormalizer {
    pub fn new(data_tab_width: usize, text_tab_width: usize) -> Self {
        Self {
            data_tab_width,
            text_tab_width,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.normalize.data_tab_width(),
            config.normalize.text_tab_width(),
        )
    }

    /// Normalise text destined for the given document.
    pub fn normalize<'a>(&self, kind: DocumentKind, text: &'a str) -> Cow<'a, str> {
        match kind {
            DocumentKind::Data => self.normalize_data(text),
            DocumentKind::Template | DocumentKind::Vars => self.expand_tabs(text),
        }
    }

    /// Rewrite each line's leading whitespace run as spaces, counting tabs as
    /// `data_tab_width`. Whitespace after the first non-blank character is left alone.
    pub fn normalize_data<'a>(&self, text: &'a str) -> Cow<'a, str> {
        LEADING_INDENT.replace_all(text, |caps: &Captures<'_>| {
            let width: usize = caps[0]
                .chars()
                .map(|ch| if ch == '\t' { self.data_tab_width } else { 1 })
                .sum();
            " ".repeat(width)
        })
    }

    /// Replace every tab with `text_tab_width` spaces.
    pub fn expand_tabs<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if text.contains('\t') {
            Cow::Owned(text.replace('\t', &" ".repeat(self.text_tab_width)))
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Normalise every present field of a bundle.
    pub fn normalize_bundle(&self, bundle: &Bundle) -> Bundle {
        let mut normalized = Bundle::new();
        for (kind, text) in bundle.fields() {
            normalized.set(kind, Some(self.normalize(kind, text).into_owned()));
        }
        normalized
    }

    pub fn normalize_documents(&self, documents: &Documents) -> Documents {
        let mut normalized = Documents::default();
        for kind in DocumentKind::ALL {
            normalized.set(kind, self.normalize(kind, documents.get(kind)).into_owned());
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_indent_counts_tabs_as_two() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_data("\t \tA,B"), "     A,B");
    }

    #[test]
    fn data_keeps_inner_whitespace() {
        let normalizer = TextNormalizer::default();
        let text = "a,\tb\n\tc, d\n";
        assert_eq!(normalizer.normalize_data(text), "a,\tb\n  c, d\n");
    }

    #[test]
    fn data_handles_whitespace_only_lines() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_data("x\n\t\ny"), "x\n  \ny");
    }

    #[test]
    fn data_lines_may_end_in_a_bare_carriage_return() {
        let normalizer = TextNormalizer::default();
        assert_eq!(normalizer.normalize_data("h\r\tr1\r\n\tr2"), "h\r  r1\r\n  r2");
    }

    #[test]
    fn template_tabs_become_two_spaces() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.normalize(DocumentKind::Template, "a\tb"),
            "a  b"
        );
        assert_eq!(
            normalizer.normalize(DocumentKind::Vars, "\tkey: 1"),
            "  key: 1"
        );
    }

    #[test]
    fn untouched_text_is_borrowed() {
        let normalizer = TextNormalizer::default();
        assert!(matches!(normalizer.expand_tabs("plain"), Cow::Borrowed(_)));
        assert!(matches!(normalizer.normalize_data("a,b"), Cow::Borrowed(_)));
    }

    #[test]
    fn custom_widths_apply() {
        let normalizer = TextNormalizer::new(4, 3);
        assert_eq!(normalizer.normalize_data("\tx"), "    x");
        assert_eq!(normalizer.expand_tabs("\t"), "   ");
    }

    #[test]
    fn bundle_normalisation_keeps_absent_fields_absent() {
        let normalizer = TextNormalizer::default();
        let bundle = Bundle::new().with(DocumentKind::Template, "\t{{ x }}");
        let normalized = normalizer.normalize_bundle(&bundle);
        assert_eq!(normalized.template.as_deref(), Some("  {{ x }}"));
        assert_eq!(normalized.data, None);
        assert_eq!(normalized.vars, None);
    }
}
