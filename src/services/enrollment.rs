//! Enrollment service
//!
//! Implements the student side of the platform:
//! - Enrolling in a course (idempotent set membership)
//! - Listing the caller's enrolled courses
//! - Serving a course's module contents to enrolled students only
//!
//! The catalog is public; content access is what enrollment gates.

use crate::db::repositories::{ContentRepository, CourseRepository, ModuleRepository};
use crate::models::{ContentWithItem, Course, Module};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Error types for enrollment service operations
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentServiceError {
    /// Course or module not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Caller is not enrolled in the course
    #[error("Not enrolled in this course")]
    NotEnrolled,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A course as seen by an enrolled student: modules plus the contents of the
/// selected module.
#[derive(Debug)]
pub struct StudentCourseView {
    pub course: Course,
    pub modules: Vec<Module>,
    /// The selected module and its contents; `None` when the course has no
    /// modules yet
    pub current: Option<(Module, Vec<ContentWithItem>)>,
}

/// Enrollment service
pub struct EnrollmentService {
    course_repo: Arc<dyn CourseRepository>,
    module_repo: Arc<dyn ModuleRepository>,
    content_repo: Arc<dyn ContentRepository>,
}

impl EnrollmentService {
    /// Create a new enrollment service
    pub fn new(
        course_repo: Arc<dyn CourseRepository>,
        module_repo: Arc<dyn ModuleRepository>,
        content_repo: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            course_repo,
            module_repo,
            content_repo,
        }
    }

    /// Enroll a student in a course.
    ///
    /// Enrolling twice is not an error; the enrollment set keeps exactly one
    /// membership per (student, course) pair.
    pub async fn enroll(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> Result<Course, EnrollmentServiceError> {
        let course = self
            .course_repo
            .get_by_id(course_id)
            .await
            .context("Failed to get course")?
            .ok_or(EnrollmentServiceError::NotFound("Course"))?;

        self.course_repo
            .enroll(course_id, student_id)
            .await
            .context("Failed to enroll")?;

        Ok(course)
    }

    /// List the courses the student is enrolled in, newest first
    pub async fn list_courses(
        &self,
        student_id: i64,
    ) -> Result<Vec<Course>, EnrollmentServiceError> {
        let courses = self
            .course_repo
            .list_enrolled(student_id)
            .await
            .context("Failed to list enrolled courses")?;
        Ok(courses)
    }

    /// Whether the student is enrolled in the course
    pub async fn is_enrolled(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> Result<bool, EnrollmentServiceError> {
        let enrolled = self
            .course_repo
            .is_enrolled(course_id, student_id)
            .await
            .context("Failed to check enrollment")?;
        Ok(enrolled)
    }

    /// A course's module contents for an enrolled student.
    ///
    /// `module_id` selects which module's contents to include; the first
    /// module is selected when omitted. Non-enrolled callers are rejected.
    pub async fn course_content(
        &self,
        course_id: i64,
        student_id: i64,
        module_id: Option<i64>,
    ) -> Result<StudentCourseView, EnrollmentServiceError> {
        let course = self
            .course_repo
            .get_by_id(course_id)
            .await
            .context("Failed to get course")?
            .ok_or(EnrollmentServiceError::NotFound("Course"))?;

        if !self
            .course_repo
            .is_enrolled(course_id, student_id)
            .await
            .context("Failed to check enrollment")?
        {
            return Err(EnrollmentServiceError::NotEnrolled);
        }

        let modules = self
            .module_repo
            .list_by_course(course_id)
            .await
            .context("Failed to list modules")?;

        let selected = match module_id {
            Some(id) => Some(
                modules
                    .iter()
                    .find(|m| m.id == id)
                    .cloned()
                    .ok_or(EnrollmentServiceError::NotFound("Module"))?,
            ),
            None => modules.first().cloned(),
        };

        let current = match selected {
            Some(module) => {
                let contents = self
                    .content_repo
                    .list_with_items_by_module(module.id)
                    .await
                    .context("Failed to list module contents")?;
                Some((module, contents))
            }
            None => None,
        };

        Ok(StudentCourseView {
            course,
            modules,
            current,
        })
    }
}
