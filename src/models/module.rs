//! Module model
//!
//! A module is an ordered chapter of a course. Order values are unique per
//! course and are assigned automatically at creation time when unspecified.

use serde::{Deserialize, Serialize};

/// Module entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    /// Unique identifier
    pub id: i64,
    /// Parent course ID
    pub course_id: i64,
    /// Module title
    pub title: String,
    /// Module description
    pub description: String,
    /// Position within the course (unique per course)
    pub sort_order: i32,
}

impl Module {
    /// Create a new Module with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    /// A sort_order of -1 means "assign the next free position on insert".
    pub fn new(course_id: i64, title: String, description: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            course_id,
            title,
            description,
            sort_order: -1,
        }
    }
}

/// One entry of a module batch submission.
///
/// Entries without an id create new modules; entries with an id edit the
/// existing module.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleItemInput {
    /// Existing module ID (absent for new modules)
    pub id: Option<i64>,
    /// Module title
    pub title: String,
    /// Module description
    #[serde(default)]
    pub description: String,
    /// Explicit position (absent means auto-assign for new modules)
    pub sort_order: Option<i32>,
}

/// A batch edit of a course's module set.
///
/// Mirrors a formset submission: any number of modules created, edited and
/// deleted in one request.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleSetInput {
    /// Modules to create or edit
    #[serde(default)]
    pub modules: Vec<ModuleItemInput>,
    /// IDs of modules to delete
    #[serde(default)]
    pub delete: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_new() {
        let module = Module::new(5, "Intro".to_string(), "First steps".to_string());

        assert_eq!(module.id, 0);
        assert_eq!(module.course_id, 5);
        assert_eq!(module.sort_order, -1);
    }
}
