//! Content repository
//!
//! Database operations for content slots and their polymorphic items.
//!
//! A slot row carries a kind tag plus an item id; the pair is resolved to a
//! concrete row through `ContentKind::table()` / `payload_column()` - a
//! dispatch table, not reflection. Deleting a slot removes the referenced
//! item first and the slot second, inside one transaction, so neither can be
//! orphaned.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Content, ContentItem, ContentKind, ContentPayload, ContentWithItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Content repository trait
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Persist a new content item in its kind's table
    async fn create_item(&self, item: &ContentItem) -> Result<ContentItem>;

    /// Get an item by kind and id
    async fn get_item(&self, kind: ContentKind, id: i64) -> Result<Option<ContentItem>>;

    /// Get an item only if it is owned by the given user
    async fn get_item_for_owner(
        &self,
        kind: ContentKind,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<ContentItem>>;

    /// Update an item's title and payload, scoped to its owner;
    /// returns false when no owned row matched
    async fn update_item(&self, item: &ContentItem) -> Result<bool>;

    /// Create the slot joining a module position to an item.
    ///
    /// The position is the next free sort_order within the module, computed
    /// inside the INSERT statement.
    async fn create_slot(&self, module_id: i64, kind: ContentKind, item_id: i64)
        -> Result<Content>;

    /// Get a slot by id
    async fn get_slot(&self, id: i64) -> Result<Option<Content>>;

    /// Get a slot only if its course is owned by the given user
    async fn get_slot_for_owner(&self, id: i64, owner_id: i64) -> Result<Option<Content>>;

    /// List a module's slots ordered by position
    async fn list_by_module(&self, module_id: i64) -> Result<Vec<Content>>;

    /// List a module's slots with their resolved items, ordered by position
    async fn list_with_items_by_module(&self, module_id: i64) -> Result<Vec<ContentWithItem>>;

    /// Delete a slot and its referenced item (item first, then slot, in one
    /// transaction)
    async fn delete_slot(&self, slot: &Content) -> Result<()>;

    /// Set the position of a slot owned (through its module's course) by the
    /// given user; returns false when no owned row matched
    async fn update_order_for_owner(&self, id: i64, owner_id: i64, sort_order: i32)
        -> Result<bool>;
}

/// SQLx-based content repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxContentRepository {
    pool: DynDatabasePool,
}

impl SqlxContentRepository {
    /// Create a new SQLx content repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn create_item(&self, item: &ContentItem) -> Result<ContentItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_item_sqlite(self.pool.as_sqlite().unwrap(), item).await,
            DatabaseDriver::Mysql => create_item_mysql(self.pool.as_mysql().unwrap(), item).await,
        }
    }

    async fn get_item(&self, kind: ContentKind, id: i64) -> Result<Option<ContentItem>> {
        let sql = format!(
            "SELECT id, owner_id, title, {col}, created_at, updated_at FROM {table} WHERE id = ?",
            col = kind.payload_column(),
            table = kind.table(),
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get content item")?;
                Ok(row.map(|r| row_to_item_sqlite(&r, kind)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get content item")?;
                Ok(row.map(|r| row_to_item_mysql(&r, kind)))
            }
        }
    }

    async fn get_item_for_owner(
        &self,
        kind: ContentKind,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<ContentItem>> {
        let sql = format!(
            "SELECT id, owner_id, title, {col}, created_at, updated_at FROM {table} \
             WHERE id = ? AND owner_id = ?",
            col = kind.payload_column(),
            table = kind.table(),
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get content item for owner")?;
                Ok(row.map(|r| row_to_item_sqlite(&r, kind)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get content item for owner")?;
                Ok(row.map(|r| row_to_item_mysql(&r, kind)))
            }
        }
    }

    async fn update_item(&self, item: &ContentItem) -> Result<bool> {
        let kind = item.kind();
        let sql = format!(
            "UPDATE {table} SET title = ?, {col} = ?, updated_at = ? \
             WHERE id = ? AND owner_id = ?",
            col = kind.payload_column(),
            table = kind.table(),
        );
        let now = Utc::now();
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(&item.title)
                .bind(item.payload.value())
                .bind(now)
                .bind(item.id)
                .bind(item.owner_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update content item")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(&item.title)
                .bind(item.payload.value())
                .bind(now)
                .bind(item.id)
                .bind(item.owner_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update content item")?
                .rows_affected(),
        };
        Ok(result > 0)
    }

    async fn create_slot(
        &self,
        module_id: i64,
        kind: ContentKind,
        item_id: i64,
    ) -> Result<Content> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_slot_sqlite(self.pool.as_sqlite().unwrap(), module_id, kind, item_id).await
            }
            DatabaseDriver::Mysql => {
                create_slot_mysql(self.pool.as_mysql().unwrap(), module_id, kind, item_id).await
            }
        }
    }

    async fn get_slot(&self, id: i64) -> Result<Option<Content>> {
        let sql = "SELECT id, module_id, kind, item_id, sort_order FROM contents WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get content slot")?;
                row.map(|r| row_to_slot_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get content slot")?;
                row.map(|r| row_to_slot_mysql(&r)).transpose()
            }
        }
    }

    async fn get_slot_for_owner(&self, id: i64, owner_id: i64) -> Result<Option<Content>> {
        let sql = r#"
            SELECT ct.id, ct.module_id, ct.kind, ct.item_id, ct.sort_order
            FROM contents ct
            JOIN modules m ON m.id = ct.module_id
            JOIN courses c ON c.id = m.course_id
            WHERE ct.id = ? AND c.owner_id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get content slot for owner")?;
                row.map(|r| row_to_slot_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get content slot for owner")?;
                row.map(|r| row_to_slot_mysql(&r)).transpose()
            }
        }
    }

    async fn list_by_module(&self, module_id: i64) -> Result<Vec<Content>> {
        let sql = "SELECT id, module_id, kind, item_id, sort_order FROM contents \
                   WHERE module_id = ? ORDER BY sort_order";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(module_id)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list content slots")?;
                rows.iter().map(row_to_slot_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(module_id)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list content slots")?;
                rows.iter().map(row_to_slot_mysql).collect()
            }
        }
    }

    async fn list_with_items_by_module(&self, module_id: i64) -> Result<Vec<ContentWithItem>> {
        let slots = self.list_by_module(module_id).await?;

        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            let item = self
                .get_item(slot.kind, slot.item_id)
                .await?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "Dangling content slot {}: no {} item {}",
                        slot.id,
                        slot.kind,
                        slot.item_id
                    )
                })?;
            result.push(ContentWithItem {
                content: slot,
                item,
            });
        }

        Ok(result)
    }

    async fn delete_slot(&self, slot: &Content) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_slot_sqlite(self.pool.as_sqlite().unwrap(), slot).await
            }
            DatabaseDriver::Mysql => delete_slot_mysql(self.pool.as_mysql().unwrap(), slot).await,
        }
    }

    async fn update_order_for_owner(
        &self,
        id: i64,
        owner_id: i64,
        sort_order: i32,
    ) -> Result<bool> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UPDATE_ORDER_OWNED_SQL)
                .bind(sort_order)
                .bind(id)
                .bind(owner_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to update content order")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(UPDATE_ORDER_OWNED_SQL)
                .bind(sort_order)
                .bind(id)
                .bind(owner_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to update content order")?
                .rows_affected(),
        };
        Ok(result > 0)
    }
}

/// INSERT that computes the next position in the same statement.
const INSERT_SLOT_SQL: &str = r#"
    INSERT INTO contents (module_id, kind, item_id, sort_order)
    SELECT ?, ?, ?, COALESCE(MAX(sort_order) + 1, 0)
    FROM contents WHERE module_id = ?
"#;

const UPDATE_ORDER_OWNED_SQL: &str = r#"
    UPDATE contents SET sort_order = ?
    WHERE id = ?
      AND module_id IN (
          SELECT m.id FROM modules m
          JOIN courses c ON c.id = m.course_id
          WHERE c.owner_id = ?
      )
"#;

// SQLite implementations

async fn create_item_sqlite(pool: &SqlitePool, item: &ContentItem) -> Result<ContentItem> {
    let kind = item.kind();
    let sql = format!(
        "INSERT INTO {table} (owner_id, title, {col}, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
        col = kind.payload_column(),
        table = kind.table(),
    );
    let now = Utc::now();

    let result = sqlx::query(&sql)
        .bind(item.owner_id)
        .bind(&item.title)
        .bind(item.payload.value())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create content item")?;

    Ok(ContentItem {
        id: result.last_insert_rowid(),
        owner_id: item.owner_id,
        title: item.title.clone(),
        payload: item.payload.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn create_slot_sqlite(
    pool: &SqlitePool,
    module_id: i64,
    kind: ContentKind,
    item_id: i64,
) -> Result<Content> {
    let result = sqlx::query(INSERT_SLOT_SQL)
        .bind(module_id)
        .bind(kind.to_string())
        .bind(item_id)
        .bind(module_id)
        .execute(pool)
        .await
        .context("Failed to create content slot")?;

    let id = result.last_insert_rowid();
    let row = sqlx::query("SELECT id, module_id, kind, item_id, sort_order FROM contents WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to read back content slot")?;

    row_to_slot_sqlite(&row)
}

async fn delete_slot_sqlite(pool: &SqlitePool, slot: &Content) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // Item first, slot second
    let item_sql = format!("DELETE FROM {} WHERE id = ?", slot.kind.table());
    sqlx::query(&item_sql)
        .bind(slot.item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete content item")?;

    sqlx::query("DELETE FROM contents WHERE id = ?")
        .bind(slot.id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete content slot")?;

    tx.commit().await.context("Failed to commit content delete")?;
    Ok(())
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow, kind: ContentKind) -> ContentItem {
    let value: String = row.get(kind.payload_column());
    ContentItem {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        payload: payload_from_value(kind, value),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_slot_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Content> {
    let kind_str: String = row.get("kind");
    let kind = ContentKind::from_str(&kind_str)
        .with_context(|| format!("Invalid content kind in database: {}", kind_str))?;

    Ok(Content {
        id: row.get("id"),
        module_id: row.get("module_id"),
        kind,
        item_id: row.get("item_id"),
        sort_order: row.get("sort_order"),
    })
}

// MySQL implementations

async fn create_item_mysql(pool: &MySqlPool, item: &ContentItem) -> Result<ContentItem> {
    let kind = item.kind();
    let sql = format!(
        "INSERT INTO {table} (owner_id, title, {col}, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
        col = kind.payload_column(),
        table = kind.table(),
    );
    let now = Utc::now();

    let result = sqlx::query(&sql)
        .bind(item.owner_id)
        .bind(&item.title)
        .bind(item.payload.value())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create content item")?;

    Ok(ContentItem {
        id: result.last_insert_id() as i64,
        owner_id: item.owner_id,
        title: item.title.clone(),
        payload: item.payload.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn create_slot_mysql(
    pool: &MySqlPool,
    module_id: i64,
    kind: ContentKind,
    item_id: i64,
) -> Result<Content> {
    let result = sqlx::query(INSERT_SLOT_SQL)
        .bind(module_id)
        .bind(kind.to_string())
        .bind(item_id)
        .bind(module_id)
        .execute(pool)
        .await
        .context("Failed to create content slot")?;

    let id = result.last_insert_id() as i64;
    let row = sqlx::query("SELECT id, module_id, kind, item_id, sort_order FROM contents WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to read back content slot")?;

    row_to_slot_mysql(&row)
}

async fn delete_slot_mysql(pool: &MySqlPool, slot: &Content) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let item_sql = format!("DELETE FROM {} WHERE id = ?", slot.kind.table());
    sqlx::query(&item_sql)
        .bind(slot.item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete content item")?;

    sqlx::query("DELETE FROM contents WHERE id = ?")
        .bind(slot.id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete content slot")?;

    tx.commit().await.context("Failed to commit content delete")?;
    Ok(())
}

fn row_to_item_mysql(row: &sqlx::mysql::MySqlRow, kind: ContentKind) -> ContentItem {
    let value: String = row.get(kind.payload_column());
    ContentItem {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        payload: payload_from_value(kind, value),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_slot_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Content> {
    let kind_str: String = row.get("kind");
    let kind = ContentKind::from_str(&kind_str)
        .with_context(|| format!("Invalid content kind in database: {}", kind_str))?;

    Ok(Content {
        id: row.get("id"),
        module_id: row.get("module_id"),
        kind,
        item_id: row.get("item_id"),
        sort_order: row.get("sort_order"),
    })
}

/// Rebuild a payload from its kind tag and stored value
fn payload_from_value(kind: ContentKind, value: String) -> ContentPayload {
    match kind {
        ContentKind::Text => ContentPayload::Text { body: value },
        ContentKind::Video => ContentPayload::Video { url: value },
        ContentKind::Image => ContentPayload::Image { image_path: value },
        ContentKind::File => ContentPayload::File { file_path: value },
    }
}
