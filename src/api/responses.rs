//! Shared API response types
//!
//! This module contains common response structures used across multiple API
//! endpoints to ensure consistency and reduce code duplication.

use serde::Serialize;

use crate::models::{Content, ContentItem, ContentWithItem};

/// Response of the reorder endpoints
#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub saved: &'static str,
}

impl SavedResponse {
    pub fn ok() -> Self {
        Self { saved: "OK" }
    }
}

/// Response of the enrollment endpoint
#[derive(Debug, Serialize)]
pub struct EnrolledResponse {
    pub enrolled: bool,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// A content slot with its item and the template the renderer should use
/// for it. The template name is derived from the kind; rendering itself is
/// an external collaborator.
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    #[serde(flatten)]
    pub content: Content,
    pub item: ContentItem,
    pub template: String,
}

impl From<ContentWithItem> for ContentResponse {
    fn from(value: ContentWithItem) -> Self {
        let template = value.content.kind.template_name();
        Self {
            content: value.content,
            item: value.item,
            template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, ContentPayload};

    #[test]
    fn test_content_response_includes_template() {
        let with_item = ContentWithItem {
            content: Content {
                id: 1,
                module_id: 2,
                kind: ContentKind::Video,
                item_id: 3,
                sort_order: 0,
            },
            item: ContentItem::new(
                1,
                "Video".to_string(),
                ContentPayload::Video {
                    url: "https://example.com/v".to_string(),
                },
            ),
        };

        let response = ContentResponse::from(with_item);
        assert_eq!(response.template, "courses/content/video.html");
    }

    #[test]
    fn test_user_response_omits_password_hash() {
        let user = crate::models::User::new(
            "ada".to_string(),
            "ada@example.com".to_string(),
            "secret-hash".to_string(),
        );

        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("ada"));
    }
}
