//! DevNest - backend for a developer community platform
//!
//! Posts, code snippets (public and versioned private ones), issues with
//! solutions, threaded comments, votes, reactions, tags, collections and
//! follow-based post suggestions, served as a JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
