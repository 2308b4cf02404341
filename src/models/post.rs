//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A free-text post in a course discussion.
///
/// Posts carry no author; they are deleted together with their course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub course_id: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub course_id: i64,
    pub comment: String,
}
