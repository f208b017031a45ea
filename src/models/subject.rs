//! Subject model
//!
//! This module defines the Subject entity for the Eduva course platform.
//! A subject groups courses by topic; many courses reference one subject.

use serde::{Deserialize, Serialize};

/// Subject entity representing a course topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    /// Unique identifier
    pub id: i64,
    /// Subject title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

impl Subject {
    /// Create a new Subject with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(title: String, slug: String) -> Self {
        Self { id: 0, title, slug }
    }
}

/// Subject with its course count for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectWithCourseCount {
    /// The subject itself
    #[serde(flatten)]
    pub subject: Subject,
    /// Number of courses under this subject
    pub total_courses: i64,
}

impl SubjectWithCourseCount {
    /// Create a new SubjectWithCourseCount
    pub fn new(subject: Subject, total_courses: i64) -> Self {
        Self {
            subject,
            total_courses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_new() {
        let subject = Subject::new("Mathematics".to_string(), "mathematics".to_string());

        assert_eq!(subject.id, 0);
        assert_eq!(subject.title, "Mathematics");
        assert_eq!(subject.slug, "mathematics");
    }

    #[test]
    fn test_subject_with_course_count() {
        let subject = Subject::new("Music".to_string(), "music".to_string());
        let counted = SubjectWithCourseCount::new(subject.clone(), 7);

        assert_eq!(counted.subject, subject);
        assert_eq!(counted.total_courses, 7);
    }
}
