//! Module repository
//!
//! Database operations for course modules, including the self-maintaining
//! positional index.
//!
//! When a module is created without an explicit position, the next free
//! sort_order within its course is computed inside the INSERT statement
//! itself (`SELECT COALESCE(MAX(sort_order) + 1, 0) ...`), so the read and
//! the write are a single statement rather than an application-level
//! read-then-write.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Module;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Module repository trait
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Create a new module.
    ///
    /// A negative `sort_order` on the input means "assign the next free
    /// position within the course"; a non-negative value is stored as-is.
    async fn create(&self, module: &Module) -> Result<Module>;

    /// Get module by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Module>>;

    /// Get a module only if its course is owned by the given user
    async fn get_by_id_for_owner(&self, id: i64, owner_id: i64) -> Result<Option<Module>>;

    /// List a course's modules ordered by position
    async fn list_by_course(&self, course_id: i64) -> Result<Vec<Module>>;

    /// Update a module's title and description, scoped to its course;
    /// returns false when no matching row exists
    async fn update(&self, module: &Module) -> Result<bool>;

    /// Delete a module, scoped to a course; returns false when no matching
    /// row exists
    async fn delete(&self, id: i64, course_id: i64) -> Result<bool>;

    /// Set the position of a module owned (through its course) by the given
    /// user; returns false when no owned row matched
    async fn update_order_for_owner(&self, id: i64, owner_id: i64, sort_order: i32)
        -> Result<bool>;
}

/// SQLx-based module repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxModuleRepository {
    pool: DynDatabasePool,
}

impl SqlxModuleRepository {
    /// Create a new SQLx module repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModuleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModuleRepository for SqlxModuleRepository {
    async fn create(&self, module: &Module) -> Result<Module> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), module).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), module).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Module>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_id_for_owner(&self, id: i64, owner_id: i64) -> Result<Option<Module>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_for_owner_sqlite(self.pool.as_sqlite().unwrap(), id, owner_id).await
            }
            DatabaseDriver::Mysql => {
                get_for_owner_mysql(self.pool.as_mysql().unwrap(), id, owner_id).await
            }
        }
    }

    async fn list_by_course(&self, course_id: i64) -> Result<Vec<Module>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_course_sqlite(self.pool.as_sqlite().unwrap(), course_id).await
            }
            DatabaseDriver::Mysql => {
                list_by_course_mysql(self.pool.as_mysql().unwrap(), course_id).await
            }
        }
    }

    async fn update(&self, module: &Module) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), module).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), module).await,
        }
    }

    async fn delete(&self, id: i64, course_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sqlite(self.pool.as_sqlite().unwrap(), id, course_id).await
            }
            DatabaseDriver::Mysql => {
                delete_mysql(self.pool.as_mysql().unwrap(), id, course_id).await
            }
        }
    }

    async fn update_order_for_owner(
        &self,
        id: i64,
        owner_id: i64,
        sort_order: i32,
    ) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_order_sqlite(self.pool.as_sqlite().unwrap(), id, owner_id, sort_order).await
            }
            DatabaseDriver::Mysql => {
                update_order_mysql(self.pool.as_mysql().unwrap(), id, owner_id, sort_order).await
            }
        }
    }
}

/// INSERT that computes the next position in the same statement.
/// The aggregate subselect returns exactly one row, 0 for an empty course.
const INSERT_AUTO_ORDER_SQL: &str = r#"
    INSERT INTO modules (course_id, title, description, sort_order)
    SELECT ?, ?, ?, COALESCE(MAX(sort_order) + 1, 0)
    FROM modules WHERE course_id = ?
"#;

const INSERT_EXPLICIT_ORDER_SQL: &str =
    "INSERT INTO modules (course_id, title, description, sort_order) VALUES (?, ?, ?, ?)";

const UPDATE_ORDER_OWNED_SQL: &str = r#"
    UPDATE modules SET sort_order = ?
    WHERE id = ?
      AND course_id IN (SELECT id FROM courses WHERE owner_id = ?)
"#;

// SQLite implementations

async fn create_sqlite(pool: &SqlitePool, module: &Module) -> Result<Module> {
    let result = if module.sort_order < 0 {
        sqlx::query(INSERT_AUTO_ORDER_SQL)
            .bind(module.course_id)
            .bind(&module.title)
            .bind(&module.description)
            .bind(module.course_id)
            .execute(pool)
            .await
            .context("Failed to create module")?
    } else {
        sqlx::query(INSERT_EXPLICIT_ORDER_SQL)
            .bind(module.course_id)
            .bind(&module.title)
            .bind(&module.description)
            .bind(module.sort_order)
            .execute(pool)
            .await
            .context("Failed to create module")?
    };

    let id = result.last_insert_rowid();
    get_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Module not found after insert"))
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Module>> {
    let row = sqlx::query(
        "SELECT id, course_id, title, description, sort_order FROM modules WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get module")?;

    Ok(row.map(|r| row_to_module_sqlite(&r)))
}

async fn get_for_owner_sqlite(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<Option<Module>> {
    let row = sqlx::query(
        r#"
        SELECT m.id, m.course_id, m.title, m.description, m.sort_order
        FROM modules m
        JOIN courses c ON c.id = m.course_id
        WHERE m.id = ? AND c.owner_id = ?
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get module for owner")?;

    Ok(row.map(|r| row_to_module_sqlite(&r)))
}

async fn list_by_course_sqlite(pool: &SqlitePool, course_id: i64) -> Result<Vec<Module>> {
    let rows = sqlx::query(
        "SELECT id, course_id, title, description, sort_order FROM modules \
         WHERE course_id = ? ORDER BY sort_order",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
    .context("Failed to list modules")?;

    Ok(rows.iter().map(row_to_module_sqlite).collect())
}

async fn update_sqlite(pool: &SqlitePool, module: &Module) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE modules SET title = ?, description = ? WHERE id = ? AND course_id = ?",
    )
    .bind(&module.title)
    .bind(&module.description)
    .bind(module.id)
    .bind(module.course_id)
    .execute(pool)
    .await
    .context("Failed to update module")?;

    Ok(result.rows_affected() > 0)
}

async fn delete_sqlite(pool: &SqlitePool, id: i64, course_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM modules WHERE id = ? AND course_id = ?")
        .bind(id)
        .bind(course_id)
        .execute(pool)
        .await
        .context("Failed to delete module")?;

    Ok(result.rows_affected() > 0)
}

async fn update_order_sqlite(
    pool: &SqlitePool,
    id: i64,
    owner_id: i64,
    sort_order: i32,
) -> Result<bool> {
    let result = sqlx::query(UPDATE_ORDER_OWNED_SQL)
        .bind(sort_order)
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .context("Failed to update module order")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_module_sqlite(row: &sqlx::sqlite::SqliteRow) -> Module {
    Module {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
    }
}

// MySQL implementations

async fn create_mysql(pool: &MySqlPool, module: &Module) -> Result<Module> {
    let result = if module.sort_order < 0 {
        sqlx::query(INSERT_AUTO_ORDER_SQL)
            .bind(module.course_id)
            .bind(&module.title)
            .bind(&module.description)
            .bind(module.course_id)
            .execute(pool)
            .await
            .context("Failed to create module")?
    } else {
        sqlx::query(INSERT_EXPLICIT_ORDER_SQL)
            .bind(module.course_id)
            .bind(&module.title)
            .bind(&module.description)
            .bind(module.sort_order)
            .execute(pool)
            .await
            .context("Failed to create module")?
    };

    let id = result.last_insert_id() as i64;
    get_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Module not found after insert"))
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Module>> {
    let row = sqlx::query(
        "SELECT id, course_id, title, description, sort_order FROM modules WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get module")?;

    Ok(row.map(|r| row_to_module_mysql(&r)))
}

async fn get_for_owner_mysql(pool: &MySqlPool, id: i64, owner_id: i64) -> Result<Option<Module>> {
    let row = sqlx::query(
        r#"
        SELECT m.id, m.course_id, m.title, m.description, m.sort_order
        FROM modules m
        JOIN courses c ON c.id = m.course_id
        WHERE m.id = ? AND c.owner_id = ?
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get module for owner")?;

    Ok(row.map(|r| row_to_module_mysql(&r)))
}

async fn list_by_course_mysql(pool: &MySqlPool, course_id: i64) -> Result<Vec<Module>> {
    let rows = sqlx::query(
        "SELECT id, course_id, title, description, sort_order FROM modules \
         WHERE course_id = ? ORDER BY sort_order",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
    .context("Failed to list modules")?;

    Ok(rows.iter().map(row_to_module_mysql).collect())
}

async fn update_mysql(pool: &MySqlPool, module: &Module) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE modules SET title = ?, description = ? WHERE id = ? AND course_id = ?",
    )
    .bind(&module.title)
    .bind(&module.description)
    .bind(module.id)
    .bind(module.course_id)
    .execute(pool)
    .await
    .context("Failed to update module")?;

    Ok(result.rows_affected() > 0)
}

async fn delete_mysql(pool: &MySqlPool, id: i64, course_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM modules WHERE id = ? AND course_id = ?")
        .bind(id)
        .bind(course_id)
        .execute(pool)
        .await
        .context("Failed to delete module")?;

    Ok(result.rows_affected() > 0)
}

async fn update_order_mysql(
    pool: &MySqlPool,
    id: i64,
    owner_id: i64,
    sort_order: i32,
) -> Result<bool> {
    let result = sqlx::query(UPDATE_ORDER_OWNED_SQL)
        .bind(sort_order)
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .context("Failed to update module order")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_module_mysql(row: &sqlx::mysql::MySqlRow) -> Module {
    Module {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
    }
}
