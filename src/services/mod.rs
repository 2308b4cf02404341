//! Services layer - Business logic
//!
//! This module contains the business logic of Coursechat.
//! Services are responsible for:
//! - Implementing the authentication and access rules
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod access;
pub mod course;
pub mod password;
pub mod session;
pub mod token;
pub mod user;

pub use access::{AccessControl, AccessError};
pub use course::{CourseService, CourseServiceError};
pub use password::PasswordHasher;
pub use session::{LoginInput, RegisterInput, SessionError, SessionManager};
pub use token::{RandomTokenGenerator, TokenSource};
pub use user::{UserProfile, UserService, UserServiceError};
