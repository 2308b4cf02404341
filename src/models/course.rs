//! Course model
//!
//! A course owns its posts and relates to users through three disjoint
//! membership sets: students, teaching assistants and banned users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Post, UserSummary};

/// Course entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique identifier
    pub id: i64,
    /// Course code, e.g. "CS 1110"
    pub code: String,
    /// Course title
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A course with everything attached to it
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub posts: Vec<Post>,
    pub tas: Vec<UserSummary>,
    pub students: Vec<UserSummary>,
    pub banned: Vec<UserSummary>,
}

/// Input for creating a course
#[derive(Debug, Clone)]
pub struct CreateCourseInput {
    pub code: String,
    pub name: String,
}

/// Row kind in the membership join table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    Student,
    Ta,
    Banned,
}

impl Membership {
    pub const ALL: [Membership; 3] = [Membership::Student, Membership::Ta, Membership::Banned];

    pub fn as_str(&self) -> &'static str {
        match self {
            Membership::Student => "student",
            Membership::Ta => "ta",
            Membership::Banned => "banned",
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a user may enroll into. Banned is never self-selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseRole {
    Student,
    Ta,
}

impl From<CourseRole> for Membership {
    fn from(role: CourseRole) -> Self {
        match role {
            CourseRole::Student => Membership::Student,
            CourseRole::Ta => Membership::Ta,
        }
    }
}

impl fmt::Display for CourseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Membership::from(*self).fmt(f)
    }
}

/// Error for an enrollment role outside the recognized vocabulary
#[derive(Debug, thiserror::Error)]
#[error("Did not choose between student or ta")]
pub struct InvalidRole;

impl FromStr for CourseRole {
    type Err = InvalidRole;

    /// Exact match only: "student" or "ta"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(CourseRole::Student),
            "ta" => Ok(CourseRole::Ta),
            _ => Err(InvalidRole),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_role_from_str() {
        assert_eq!(CourseRole::from_str("student").unwrap(), CourseRole::Student);
        assert_eq!(CourseRole::from_str("ta").unwrap(), CourseRole::Ta);
        assert!(CourseRole::from_str("instructor").is_err());
        assert!(CourseRole::from_str("banned").is_err());
        assert!(CourseRole::from_str("Student").is_err());
        assert!(CourseRole::from_str("").is_err());
    }

    #[test]
    fn test_invalid_role_message() {
        let err = CourseRole::from_str("prof").unwrap_err();
        assert_eq!(err.to_string(), "Did not choose between student or ta");
    }

    #[test]
    fn test_role_maps_to_membership() {
        assert_eq!(Membership::from(CourseRole::Student), Membership::Student);
        assert_eq!(Membership::from(CourseRole::Ta), Membership::Ta);
        assert_eq!(CourseRole::Ta.to_string(), "ta");
    }
}
