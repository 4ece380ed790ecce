//! Run inputs
//!
//! This module loads the two fixed inputs of a harvest run:
//! - The course list (CSV), optionally narrowed by a lesson filter and a limit
//! - The credential pool that sizes every batch
//!
//! Both are loaded once at startup and treated as immutable afterwards.

mod courses;
mod credentials;

pub use courses::{
    apply_lesson_filter, apply_limit, course_slug, load_courses, load_lesson_filter,
    parse_courses, parse_lesson_filter, Course,
};
pub use credentials::{Credential, CredentialPool};
