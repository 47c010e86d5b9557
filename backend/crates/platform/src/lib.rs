//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared web-service foundations:
//! - Password hashing (bcrypt, validated work factor)
//! - CORS layer configuration (defaults and merge over `tower-http`)
//! - Environment configuration for both

pub mod config;
pub mod cors;
pub mod password;
