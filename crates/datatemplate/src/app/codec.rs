//! Tagged text serialisation and the per-field base64 transport encoding.

use std::str::FromStr;

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::errors::EncodingError;
use crate::domain::model::{Bundle, DocumentKind};

/// Decoder mirroring browser `atob`: padding optional, trailing bits tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Serialise the present fields of a bundle to the tagged text format.
///
/// Fields are always emitted as data, template, vars regardless of how the bundle was built.
pub fn serialize(bundle: &Bundle) -> String {
    let mut out = String::new();
    for (kind, text) in bundle.fields() {
        let tag = kind.tag();
        out.push('<');
        out.push_str(tag);
        out.push_str(">\n");
        out.push_str(text);
        out.push_str("\n</");
        out.push_str(tag);
        out.push_str(">\n");
    }
    out
}

/// Byte representation used before base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportCharset {
    /// UTF-8 bytes; every string encodes.
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// One byte per character, compatible with `btoa`/`atob`.
    Latin1,
}

impl TransportCharset {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportCharset::Utf8 => "utf-8",
            TransportCharset::Latin1 => "latin1",
        }
    }
}

impl FromStr for TransportCharset {
    type Err = CharsetParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TransportCharset::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TransportCharset::Latin1),
            other => Err(CharsetParseError::Unknown(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`TransportCharset`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CharsetParseError {
    #[error("unknown transport charset '{0}'")]
    Unknown(String),
}

/// Encodes and decodes bundle fields for URLs and the generate hand-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCodec {
    charset: TransportCharset,
}

impl TransportCodec {
    pub fn new(charset: TransportCharset) -> Self {
        Self { charset }
    }

    pub fn charset(&self) -> TransportCharset {
        self.charset
    }

    pub fn encode_field(&self, kind: DocumentKind, text: &str) -> Result<String, EncodingError> {
        match self.charset {
            TransportCharset::Utf8 => Ok(STANDARD.encode(text.as_bytes())),
            TransportCharset::Latin1 => {
                let mut bytes = Vec::with_capacity(text.len());
                for ch in text.chars() {
                    let byte = u8::try_from(u32::from(ch)).map_err(|_| {
                        EncodingError::Unrepresentable {
                            field: kind.param().to_string(),
                            ch,
                        }
                    })?;
                    bytes.push(byte);
                }
                Ok(STANDARD.encode(bytes))
            }
        }
    }

    pub fn decode_field(&self, kind: DocumentKind, value: &str) -> Result<String, EncodingError> {
        // Form-style query decoding turns '+' into a space; base64 never contains spaces.
        let cleaned: String = value
            .chars()
            .map(|ch| if ch == ' ' { '+' } else { ch })
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect();

        let bytes = LENIENT
            .decode(cleaned.as_bytes())
            .map_err(|err| EncodingError::InvalidBase64 {
                field: kind.param().to_string(),
                reason: err.to_string(),
            })?;

        match self.charset {
            TransportCharset::Utf8 => String::from_utf8(bytes).map_err(|_| {
                EncodingError::InvalidText {
                    field: kind.param().to_string(),
                }
            }),
            TransportCharset::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }

    /// Encode every present field into `(parameter, value)` pairs in emission order.
    pub fn encode_bundle(
        &self,
        bundle: &Bundle,
    ) -> Result<Vec<(&'static str, String)>, EncodingError> {
        bundle
            .fields()
            .map(|(kind, text)| Ok((kind.param(), self.encode_field(kind, text)?)))
            .collect()
    }

    /// Decode encoded fields into a bundle. The first failure aborts the whole decode.
    pub fn decode_fields<'a, I>(&self, fields: I) -> Result<Bundle, EncodingError>
    where
        I: IntoIterator<Item = (DocumentKind, &'a str)>,
    {
        let mut bundle = Bundle::new();
        for (kind, value) in fields {
            bundle.set(kind, Some(self.decode_field(kind, value)?));
        }
        Ok(bundle)
    }
}
