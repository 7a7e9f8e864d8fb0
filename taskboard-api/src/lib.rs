//! # Taskboard+ API Server Library
//!
//! This library provides the core functionality for the Taskboard+ API server.
//!
//! ## Modules
//!
//! - `app`: Application state, store wiring and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `identity`: OAuth identity providers
//! - `middleware`: HTTP-only middleware
//! - `routes`: Page and API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
