//! Discord webhook payloads.
//!
//! Every subscriber callback receives a JSON [`Webhook`] body. Renderers
//! build the body and wrap it into a [`PreparedHook`] for delivery.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Maximum number of fields rendered into one embed.
pub const MAX_FIELDS_PER_EMBED: usize = 16;

/// Embed color used by calendar and timeline messages.
pub const COLOR_DARK: u32 = 3684408;

/// Embed color used by content-feed messages.
pub const COLOR_WHITE: u32 = 16777215;

/// Outbound message body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    pub username: String,
    pub avatar_url: String,
}

/// Rich block inside a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    /// Create an empty embed with a color.
    pub fn new(color: u32) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<EmbedField>) -> Self {
        self.fields = fields;
        self
    }
}

/// Name/value pair rendered inside an embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

impl Image {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A serialized message addressed to one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedHook {
    /// Callback URL.
    pub callback: String,
    /// JSON body.
    pub body: String,
}

impl PreparedHook {
    /// Serialize a Discord message for a callback.
    pub fn discord(callback: impl Into<String>, webhook: &Webhook) -> Result<Self> {
        Ok(Self {
            callback: callback.into(),
            body: serde_json::to_string(webhook)?,
        })
    }

    /// Parse the body back into a message.
    pub fn webhook(&self) -> Result<Webhook> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Shorten `text` to at most `max` characters.
///
/// The cut happens at the last space inside the limit and ` ...` is
/// appended. Text without any space inside the limit is cut hard.
pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let end = text
        .char_indices()
        .nth(max)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..end];
    let cut = head.rfind(' ').unwrap_or(end);

    format!("{} ...", &head[..cut])
}
