//! Core types and services for mongo-mcp.
//!
//! This crate owns the query pipeline (option sanitizing, bounded execution,
//! text rendering), the connection handle shared by the transports, and the
//! `MongoDB` and in-memory store implementations.

pub mod query;
pub mod render;
pub mod services;
pub mod store;
