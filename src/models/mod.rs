//! Data models
//!
//! This module contains the data structures used throughout Coursechat:
//! - Database entities (User, Course, Post)
//! - Session token pairs handed to clients
//! - Internal input types

mod course;
mod post;
mod session;
mod user;

pub use course::{Course, CourseDetail, CourseRole, CreateCourseInput, InvalidRole, Membership};
pub use post::{CreatePostInput, Post};
pub use session::SessionTokens;
pub use user::{Profile, SessionState, UpdateProfileInput, User, UserSummary};
