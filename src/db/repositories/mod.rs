//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod content;
pub mod course;
pub mod module;
pub mod session;
pub mod subject;
pub mod user;

pub use content::{ContentRepository, SqlxContentRepository};
pub use course::{CourseRepository, SqlxCourseRepository};
pub use module::{ModuleRepository, SqlxModuleRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subject::{SqlxSubjectRepository, SubjectRepository};
pub use user::{SqlxUserRepository, UserRepository};
