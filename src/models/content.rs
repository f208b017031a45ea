//! Content models
//!
//! This module defines the polymorphic content machinery:
//! - `ContentKind` - the fixed set of content types (text, video, image, file)
//! - `ContentPayload` - the type-specific payload as a tagged union
//! - `ContentItem` - a concrete item row (owner, title, timestamps + payload)
//! - `Content` - the ordered slot joining a module position to one item
//!
//! A slot carries an explicit kind tag plus the item's identifier; the pair is
//! resolved through a kind-to-table dispatch in the content repository.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of content types a slot may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Inline text
    Text,
    /// External video URL
    Video,
    /// Uploaded image
    Image,
    /// Uploaded file
    File,
}

impl ContentKind {
    /// All kinds, in a stable order
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Text,
        ContentKind::Video,
        ContentKind::Image,
        ContentKind::File,
    ];

    /// The database table holding items of this kind
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Text => "text_contents",
            ContentKind::Video => "video_contents",
            ContentKind::Image => "image_contents",
            ContentKind::File => "file_contents",
        }
    }

    /// The payload column of this kind's table
    pub fn payload_column(&self) -> &'static str {
        match self {
            ContentKind::Text => "body",
            ContentKind::Video => "url",
            ContentKind::Image => "image_path",
            ContentKind::File => "file_path",
        }
    }

    /// The template name used by the external rendering collaborator.
    ///
    /// The mapping is deterministic by kind name.
    pub fn template_name(&self) -> String {
        format!("courses/content/{}.html", self)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Text => write!(f, "text"),
            ContentKind::Video => write!(f, "video"),
            ContentKind::Image => write!(f, "image"),
            ContentKind::File => write!(f, "file"),
        }
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ContentKind::Text),
            "video" => Ok(ContentKind::Video),
            "image" => Ok(ContentKind::Image),
            "file" => Ok(ContentKind::File),
            _ => Err(anyhow!("Invalid content kind: {}", s)),
        }
    }
}

/// Type-specific payload of a content item, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentPayload {
    /// Inline text body
    Text { body: String },
    /// External video URL
    Video { url: String },
    /// Path of an uploaded image
    Image { image_path: String },
    /// Path of an uploaded file
    File { file_path: String },
}

impl ContentPayload {
    /// The kind tag of this payload
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::Text { .. } => ContentKind::Text,
            ContentPayload::Video { .. } => ContentKind::Video,
            ContentPayload::Image { .. } => ContentKind::Image,
            ContentPayload::File { .. } => ContentKind::File,
        }
    }

    /// The raw payload value (body text, URL or path)
    pub fn value(&self) -> &str {
        match self {
            ContentPayload::Text { body } => body,
            ContentPayload::Video { url } => url,
            ContentPayload::Image { image_path } => image_path,
            ContentPayload::File { file_path } => file_path,
        }
    }
}

/// A concrete content item of one kind.
///
/// All kinds share owner, title and timestamps; the payload carries the
/// type-specific field. Owner, order and timestamps are system-assigned and
/// never part of user input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    /// Unique identifier (within the kind's table)
    pub id: i64,
    /// Owning instructor user ID
    pub owner_id: i64,
    /// Item title
    pub title: String,
    /// Type-specific payload
    #[serde(flatten)]
    pub payload: ContentPayload,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Create a new ContentItem with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(owner_id: i64, title: String, payload: ContentPayload) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            owner_id,
            title,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    /// The kind of this item
    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }
}

/// The ordered slot joining a module position to one concrete item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    /// Unique identifier
    pub id: i64,
    /// Parent module ID
    pub module_id: i64,
    /// Kind tag of the referenced item
    pub kind: ContentKind,
    /// Identifier of the referenced item within its kind's table
    pub item_id: i64,
    /// Position within the module (unique per module)
    pub sort_order: i32,
}

/// A slot together with its resolved item, for content listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentWithItem {
    /// The slot
    #[serde(flatten)]
    pub content: Content,
    /// The resolved item
    pub item: ContentItem,
}

/// Input for creating a content item (and its slot)
#[derive(Debug, Clone)]
pub struct CreateContentInput {
    /// Item title
    pub title: String,
    /// Type-specific payload
    pub payload: ContentPayload,
}

/// Input for updating an existing content item
///
/// Editing an item never touches its slot.
#[derive(Debug, Clone)]
pub struct UpdateContentInput {
    /// New title
    pub title: String,
    /// New payload (must be of the item's kind)
    pub payload: ContentPayload,
}
