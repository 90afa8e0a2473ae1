//! Shared infrastructure for the survey click-tracking services
//!
//! This crate provides the pieces every service needs: PostgreSQL
//! connection pooling and configuration, health checks, and the shared
//! database error type. Domain logic lives in the service crates.

pub mod database;
pub mod error;
