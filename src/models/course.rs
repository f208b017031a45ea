//! Course model
//!
//! This module defines the Course entity and related input types.
//!
//! A course is owned by exactly one instructor, belongs to one subject, and
//! carries a set of enrolled students through the enrollments relation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Course entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// Unique identifier
    pub id: i64,
    /// Owning instructor user ID
    pub owner_id: i64,
    /// Subject this course belongs to
    pub subject_id: i64,
    /// Course title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Short description shown in the catalog
    pub overview: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Create a new Course with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(
        owner_id: i64,
        subject_id: i64,
        title: String,
        slug: String,
        overview: String,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            owner_id,
            subject_id,
            title,
            slug,
            overview,
            created_at: Utc::now(),
        }
    }
}

/// Course with its module count for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseWithModuleCount {
    /// The course itself
    #[serde(flatten)]
    pub course: Course,
    /// Number of modules in this course
    pub total_modules: i64,
}

impl CourseWithModuleCount {
    /// Create a new CourseWithModuleCount
    pub fn new(course: Course, total_modules: i64) -> Self {
        Self {
            course,
            total_modules,
        }
    }
}

/// Input for creating a new course
///
/// The owner is never part of the input; it is injected from the
/// authenticated caller at save time.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseInput {
    /// Subject ID
    pub subject_id: i64,
    /// Course title
    pub title: String,
    /// URL-friendly slug (generated from the title when omitted)
    pub slug: Option<String>,
    /// Short description
    pub overview: String,
}

/// Input for updating a course
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourseInput {
    /// New subject ID (optional)
    pub subject_id: Option<i64>,
    /// New title (optional)
    pub title: Option<String>,
    /// New slug (optional)
    pub slug: Option<String>,
    /// New overview (optional)
    pub overview: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_new() {
        let course = Course::new(
            1,
            2,
            "Linear Algebra".to_string(),
            "linear-algebra".to_string(),
            "Vectors and matrices".to_string(),
        );

        assert_eq!(course.id, 0);
        assert_eq!(course.owner_id, 1);
        assert_eq!(course.subject_id, 2);
        assert_eq!(course.slug, "linear-algebra");
    }

    #[test]
    fn test_course_with_module_count() {
        let course = Course::new(1, 1, "T".into(), "t".into(), "o".into());
        let counted = CourseWithModuleCount::new(course.clone(), 3);

        assert_eq!(counted.course, course);
        assert_eq!(counted.total_modules, 3);
    }
}
