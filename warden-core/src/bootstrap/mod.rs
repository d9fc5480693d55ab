//! Bootstrap module for wiring the permission layer
//!
//! This module handles:
//! - Database pool initialization
//! - Cache backend selection
//! - Service initialization and dependency injection

pub mod database;
pub mod services;

pub use database::init_database;
pub use services::{init_services, Services};
