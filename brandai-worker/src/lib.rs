//! # BrandAI Worker Library
//!
//! Background maintenance for the BrandAI entitlement engine, embedded in the
//! process that owns the engine so both see the same accounts and sessions.
//!
//! ## Modules
//!
//! - `sweeper`: Periodic purge of expired sessions and spent tokens, and bulk
//!   trial expiry
//! - `telemetry`: Tracing subscriber setup for the host process

pub mod sweeper;
pub mod telemetry;
