//! Data models
//!
//! This module contains all data structures used throughout the Eduva course
//! platform. Models represent:
//! - Database entities (Subject, Course, Module, Content, content items, User, Session)
//! - API request/response types
//! - Internal data transfer objects

mod content;
mod course;
mod module;
mod session;
mod subject;
mod user;

pub use content::{
    Content, ContentItem, ContentKind, ContentPayload, ContentWithItem, CreateContentInput,
    UpdateContentInput,
};
pub use course::{Course, CourseWithModuleCount, CreateCourseInput, UpdateCourseInput};
pub use module::{Module, ModuleItemInput, ModuleSetInput};
pub use session::Session;
pub use subject::{Subject, SubjectWithCourseCount};
pub use user::User;
