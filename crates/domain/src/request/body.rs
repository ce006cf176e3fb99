//! Request body variants, one per body mode.

use serde::{Deserialize, Serialize};

use super::KeyValue;

/// A multipart form part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MultipartField {
    /// A plain text part.
    Text {
        /// Part name.
        name: String,
        /// Part value.
        value: String,
        /// Whether the part is sent.
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    /// A part whose content is read from a file.
    File {
        /// Part name.
        name: String,
        /// File path, relative to the collection root unless absolute.
        path: String,
        /// Whether the part is sent.
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

const fn default_enabled() -> bool {
    true
}

impl MultipartField {
    /// The part name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }

    /// Whether the part is sent.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        match self {
            Self::Text { enabled, .. } | Self::File { enabled, .. } => *enabled,
        }
    }
}

/// HTTP request body selected by its mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Plain text.
    Text {
        /// Raw content.
        text: String,
    },
    /// XML document.
    Xml {
        /// Raw content.
        xml: String,
    },
    /// SPARQL query.
    Sparql {
        /// Raw content.
        sparql: String,
    },
    /// JSON document, kept as text so placeholders may appear anywhere.
    Json {
        /// Raw content.
        json: String,
    },
    /// `application/x-www-form-urlencoded` fields.
    FormUrlEncoded {
        /// Ordered fields.
        fields: Vec<KeyValue>,
    },
    /// `multipart/form-data` parts.
    Multipart {
        /// Ordered parts.
        fields: Vec<MultipartField>,
    },
}

impl RequestBody {
    /// Creates a JSON body.
    #[must_use]
    pub fn json(content: impl Into<String>) -> Self {
        Self::Json {
            json: content.into(),
        }
    }

    /// Creates a plain text body.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            text: content.into(),
        }
    }

    /// The wire name of the mode.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Text { .. } => "text",
            Self::Xml { .. } => "xml",
            Self::Sparql { .. } => "sparql",
            Self::Json { .. } => "json",
            Self::FormUrlEncoded { .. } => "form-url-encoded",
            Self::Multipart { .. } => "multipart",
        }
    }

    /// Whether nothing would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Text { text: s }
            | Self::Xml { xml: s }
            | Self::Sparql { sparql: s }
            | Self::Json { json: s } => s.is_empty(),
            Self::FormUrlEncoded { fields } => !fields.iter().any(|f| f.enabled),
            Self::Multipart { fields } => !fields.iter().any(MultipartField::is_enabled),
        }
    }

    /// Default `Content-Type` for this mode.
    ///
    /// Multipart returns the bare media type; the encoder appends the boundary.
    #[must_use]
    pub const fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Text { .. } => Some("text/plain"),
            Self::Xml { .. } => Some("application/xml"),
            Self::Sparql { .. } => Some("application/sparql-query"),
            Self::Json { .. } => Some("application/json"),
            Self::FormUrlEncoded { .. } => Some("application/x-www-form-urlencoded"),
            Self::Multipart { .. } => Some("multipart/form-data"),
        }
    }

    /// Raw text of text-like modes.
    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Text { text: s }
            | Self::Xml { xml: s }
            | Self::Sparql { sparql: s }
            | Self::Json { json: s } => Some(s),
            _ => None,
        }
    }
}
