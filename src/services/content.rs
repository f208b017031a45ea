//! Content service
//!
//! Implements polymorphic content authoring for modules:
//! - Two-step creation: validate and persist the type-specific item, then
//!   create the joining slot (only for brand-new items)
//! - Editing an existing item in place, preserving its slot
//! - Cascading deletion (item first, then slot)
//! - Bulk reordering of slots
//!
//! Kind names arriving from the outside are resolved against the fixed
//! `ContentKind` set; anything else is a validation error.

use crate::db::repositories::{ContentRepository, ModuleRepository};
use crate::models::{
    ContentItem, ContentKind, ContentWithItem, CreateContentInput, Module, UpdateContentInput,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for content service operations
#[derive(Debug, thiserror::Error)]
pub enum ContentServiceError {
    /// Module, slot or item not found (or not owned by the caller)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Content service for module content authoring
pub struct ContentService {
    module_repo: Arc<dyn ModuleRepository>,
    content_repo: Arc<dyn ContentRepository>,
}

impl ContentService {
    /// Create a new content service
    pub fn new(
        module_repo: Arc<dyn ModuleRepository>,
        content_repo: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            module_repo,
            content_repo,
        }
    }

    /// Resolve a kind name from a request path.
    ///
    /// Only the fixed set (text, video, image, file) is accepted.
    pub fn resolve_kind(name: &str) -> Result<ContentKind, ContentServiceError> {
        name.parse().map_err(|_| {
            ContentServiceError::ValidationError(format!(
                "kind: '{}' is not one of text, video, image, file",
                name
            ))
        })
    }

    /// List a module's contents (with resolved items) for the course owner
    pub async fn list_for_owner(
        &self,
        module_id: i64,
        owner_id: i64,
    ) -> Result<(Module, Vec<ContentWithItem>), ContentServiceError> {
        let module = self.require_owned_module(module_id, owner_id).await?;

        let contents = self
            .content_repo
            .list_with_items_by_module(module_id)
            .await
            .context("Failed to list module contents")?;

        Ok((module, contents))
    }

    /// Get one item for editing, scoped to its owner
    pub async fn get_item_for_owner(
        &self,
        kind: ContentKind,
        item_id: i64,
        owner_id: i64,
    ) -> Result<ContentItem, ContentServiceError> {
        self.content_repo
            .get_item_for_owner(kind, item_id, owner_id)
            .await
            .context("Failed to get content item")?
            .ok_or(ContentServiceError::NotFound("Content item"))
    }

    /// Create a brand-new item and its slot in the given module.
    ///
    /// The item is validated and persisted first; the slot is created second
    /// with an auto-assigned position. Owner, order and timestamps are
    /// system-assigned.
    pub async fn create(
        &self,
        module_id: i64,
        owner_id: i64,
        kind: ContentKind,
        input: CreateContentInput,
    ) -> Result<ContentWithItem, ContentServiceError> {
        self.require_owned_module(module_id, owner_id).await?;
        validate_input(kind, &input.title, input.payload.kind())?;

        let item = self
            .content_repo
            .create_item(&ContentItem::new(owner_id, input.title, input.payload))
            .await
            .context("Failed to create content item")?;

        let slot = self
            .content_repo
            .create_slot(module_id, kind, item.id)
            .await
            .context("Failed to create content slot")?;

        Ok(ContentWithItem {
            content: slot,
            item,
        })
    }

    /// Edit an existing item in place.
    ///
    /// The slot is left untouched: position and module membership survive
    /// edits.
    pub async fn update_item(
        &self,
        kind: ContentKind,
        item_id: i64,
        owner_id: i64,
        input: UpdateContentInput,
    ) -> Result<ContentItem, ContentServiceError> {
        validate_input(kind, &input.title, input.payload.kind())?;

        let mut item = self.get_item_for_owner(kind, item_id, owner_id).await?;
        item.title = input.title;
        item.payload = input.payload;

        let updated = self
            .content_repo
            .update_item(&item)
            .await
            .context("Failed to update content item")?;
        if !updated {
            return Err(ContentServiceError::NotFound("Content item"));
        }

        Ok(item)
    }

    /// Delete a slot and its referenced item.
    ///
    /// The item row is removed first, then the slot, in one transaction;
    /// neither can be left orphaned.
    pub async fn delete(&self, content_id: i64, owner_id: i64) -> Result<(), ContentServiceError> {
        let slot = self
            .content_repo
            .get_slot_for_owner(content_id, owner_id)
            .await
            .context("Failed to get content slot")?
            .ok_or(ContentServiceError::NotFound("Content"))?;

        self.content_repo
            .delete_slot(&slot)
            .await
            .context("Failed to delete content")?;

        Ok(())
    }

    /// Apply a bulk reorder mapping `{content id -> new position}`.
    ///
    /// Identifiers that do not resolve to an owned slot are skipped without
    /// error. Returns the number of slots actually moved.
    pub async fn reorder(
        &self,
        owner_id: i64,
        order: HashMap<i64, i32>,
    ) -> Result<usize, ContentServiceError> {
        let mut moved = 0;
        for (id, sort_order) in order {
            let updated = self
                .content_repo
                .update_order_for_owner(id, owner_id, sort_order)
                .await
                .context("Failed to update content order")?;
            if updated {
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn require_owned_module(
        &self,
        module_id: i64,
        owner_id: i64,
    ) -> Result<Module, ContentServiceError> {
        self.module_repo
            .get_by_id_for_owner(module_id, owner_id)
            .await
            .context("Failed to get module")?
            .ok_or(ContentServiceError::NotFound("Module"))
    }
}

/// Shared field validation for create and update
fn validate_input(
    kind: ContentKind,
    title: &str,
    payload_kind: ContentKind,
) -> Result<(), ContentServiceError> {
    if title.trim().is_empty() {
        return Err(ContentServiceError::ValidationError(
            "title: must not be empty".to_string(),
        ));
    }

    if payload_kind != kind {
        return Err(ContentServiceError::ValidationError(format!(
            "payload: expected {} payload, got {}",
            kind, payload_kind
        )));
    }

    Ok(())
}
