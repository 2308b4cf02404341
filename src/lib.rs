//! Coursechat - A course discussion backend
//!
//! This library provides the core functionality for the Coursechat service:
//! paired session/update token authentication, course membership rules and
//! the course/post data it guards.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
