//! Module service
//!
//! Implements module authoring for a course:
//! - Batch editing of a course's module set (create, edit and delete any
//!   number of modules in one submission)
//! - Bulk reordering from drag-and-drop requests
//!
//! Both entry points are ownership-scoped through the module's course.
//! Reorder requests silently skip identifiers that do not resolve to an
//! owned module.

use crate::db::repositories::{CourseRepository, ModuleRepository};
use crate::models::{Module, ModuleSetInput};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for module service operations
#[derive(Debug, thiserror::Error)]
pub enum ModuleServiceError {
    /// Course or module not found (or not owned by the caller)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Module service for course structure authoring
pub struct ModuleService {
    course_repo: Arc<dyn CourseRepository>,
    module_repo: Arc<dyn ModuleRepository>,
}

impl ModuleService {
    /// Create a new module service
    pub fn new(
        course_repo: Arc<dyn CourseRepository>,
        module_repo: Arc<dyn ModuleRepository>,
    ) -> Self {
        Self {
            course_repo,
            module_repo,
        }
    }

    /// List a course's modules for its owner
    pub async fn list_for_owner(
        &self,
        course_id: i64,
        owner_id: i64,
    ) -> Result<Vec<Module>, ModuleServiceError> {
        self.require_owned_course(course_id, owner_id).await?;

        let modules = self
            .module_repo
            .list_by_course(course_id)
            .await
            .context("Failed to list modules")?;
        Ok(modules)
    }

    /// Apply a batch edit to a course's module set.
    ///
    /// Entries without an id create new modules (position auto-assigned
    /// unless given); entries with an id edit existing modules; ids in the
    /// delete list are removed. Returns the resulting module list in order.
    pub async fn update_course_modules(
        &self,
        course_id: i64,
        owner_id: i64,
        input: ModuleSetInput,
    ) -> Result<Vec<Module>, ModuleServiceError> {
        self.require_owned_course(course_id, owner_id).await?;

        for (index, item) in input.modules.iter().enumerate() {
            if item.title.trim().is_empty() {
                return Err(ModuleServiceError::ValidationError(format!(
                    "modules[{}].title: must not be empty",
                    index
                )));
            }
        }

        for id in &input.delete {
            // Unknown ids fall through; the course scope blocks foreign rows
            self.module_repo
                .delete(*id, course_id)
                .await
                .context("Failed to delete module")?;
        }

        for item in input.modules {
            match item.id {
                Some(id) => {
                    let module = Module {
                        id,
                        course_id,
                        title: item.title,
                        description: item.description,
                        sort_order: 0,
                    };
                    let updated = self
                        .module_repo
                        .update(&module)
                        .await
                        .context("Failed to update module")?;
                    if !updated {
                        return Err(ModuleServiceError::NotFound("Module"));
                    }
                    if let Some(sort_order) = item.sort_order {
                        self.module_repo
                            .update_order_for_owner(id, owner_id, sort_order)
                            .await
                            .context("Failed to update module order")?;
                    }
                }
                None => {
                    let mut module = Module::new(course_id, item.title, item.description);
                    if let Some(sort_order) = item.sort_order {
                        module.sort_order = sort_order;
                    }
                    self.module_repo
                        .create(&module)
                        .await
                        .context("Failed to create module")?;
                }
            }
        }

        let modules = self
            .module_repo
            .list_by_course(course_id)
            .await
            .context("Failed to list modules")?;
        Ok(modules)
    }

    /// Apply a bulk reorder mapping `{module id -> new position}`.
    ///
    /// Identifiers that do not resolve to a module owned (through its
    /// course) by the caller are skipped without error. Returns the number
    /// of modules actually moved.
    pub async fn reorder(
        &self,
        owner_id: i64,
        order: HashMap<i64, i32>,
    ) -> Result<usize, ModuleServiceError> {
        let mut moved = 0;
        for (id, sort_order) in order {
            let updated = self
                .module_repo
                .update_order_for_owner(id, owner_id, sort_order)
                .await
                .context("Failed to update module order")?;
            if updated {
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn require_owned_course(
        &self,
        course_id: i64,
        owner_id: i64,
    ) -> Result<(), ModuleServiceError> {
        self.course_repo
            .get_by_id_for_owner(course_id, owner_id)
            .await
            .context("Failed to get course")?
            .ok_or(ModuleServiceError::NotFound("Course"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCourseRepository, SqlxModuleRepository, SqlxSubjectRepository, SqlxUserRepository,
        SubjectRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Course, ModuleItemInput, Subject, User};

    struct Fixture {
        service: ModuleService,
        course_id: i64,
        owner_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let owner = users
            .create(&User::new(
                "teacher".to_string(),
                "teacher@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let subjects = SqlxSubjectRepository::new(pool.clone());
        let subject = subjects
            .create(&Subject::new("Math".to_string(), "math".to_string()))
            .await
            .unwrap();

        let course_repo = SqlxCourseRepository::boxed(pool.clone());
        let course = course_repo
            .create(&Course::new(
                owner.id,
                subject.id,
                "Algebra".to_string(),
                "algebra".to_string(),
                "Overview".to_string(),
            ))
            .await
            .unwrap();

        Fixture {
            service: ModuleService::new(course_repo, SqlxModuleRepository::boxed(pool)),
            course_id: course.id,
            owner_id: owner.id,
        }
    }

    fn new_module(title: &str) -> ModuleItemInput {
        ModuleItemInput {
            id: None,
            title: title.to_string(),
            description: String::new(),
            sort_order: None,
        }
    }

    #[tokio::test]
    async fn test_batch_create_assigns_sequential_orders() {
        let f = setup().await;

        let modules = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id,
                ModuleSetInput {
                    modules: vec![new_module("One"), new_module("Two"), new_module("Three")],
                    delete: vec![],
                },
            )
            .await
            .unwrap();

        let orders: Vec<i32> = modules.iter().map(|m| m.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_batch_edit_and_delete_in_one_submission() {
        let f = setup().await;

        let modules = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id,
                ModuleSetInput {
                    modules: vec![new_module("One"), new_module("Two")],
                    delete: vec![],
                },
            )
            .await
            .unwrap();

        let modules = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id,
                ModuleSetInput {
                    modules: vec![
                        ModuleItemInput {
                            id: Some(modules[0].id),
                            title: "One renamed".to_string(),
                            description: "desc".to_string(),
                            sort_order: None,
                        },
                        new_module("Three"),
                    ],
                    delete: vec![modules[1].id],
                },
            )
            .await
            .unwrap();

        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].title, "One renamed");
        assert_eq!(modules[1].title, "Three");
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_title() {
        let f = setup().await;

        let err = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id,
                ModuleSetInput {
                    modules: vec![new_module("")],
                    delete: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_batch_requires_course_ownership() {
        let f = setup().await;

        let err = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id + 1,
                ModuleSetInput {
                    modules: vec![new_module("One")],
                    delete: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleServiceError::NotFound("Course")));
    }

    #[tokio::test]
    async fn test_reorder_swaps_positions() {
        let f = setup().await;

        let modules = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id,
                ModuleSetInput {
                    modules: vec![new_module("One"), new_module("Two"), new_module("Three")],
                    delete: vec![],
                },
            )
            .await
            .unwrap();

        // Swap the first and last modules
        let mut order = HashMap::new();
        order.insert(modules[0].id, 2);
        order.insert(modules[2].id, 0);

        let moved = f.service.reorder(f.owner_id, order).await.unwrap();
        assert_eq!(moved, 2);

        let after = f
            .service
            .list_for_owner(f.course_id, f.owner_id)
            .await
            .unwrap();
        assert_eq!(after[0].id, modules[2].id);
        assert_eq!(after[1].id, modules[1].id);
        assert_eq!(after[2].id, modules[0].id);
    }

    #[tokio::test]
    async fn test_reorder_silently_skips_foreign_and_unknown_ids() {
        let f = setup().await;

        let modules = f
            .service
            .update_course_modules(
                f.course_id,
                f.owner_id,
                ModuleSetInput {
                    modules: vec![new_module("One")],
                    delete: vec![],
                },
            )
            .await
            .unwrap();

        let mut order = HashMap::new();
        order.insert(modules[0].id, 3);
        order.insert(9999, 0); // unknown id

        // Unknown id is skipped, not an error
        let moved = f.service.reorder(f.owner_id, order.clone()).await.unwrap();
        assert_eq!(moved, 1);

        // Foreign caller moves nothing
        let moved = f.service.reorder(f.owner_id + 1, order).await.unwrap();
        assert_eq!(moved, 0);
    }
}
