//! Unit tests for configuration loading and precedence.
//!
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, repository, and window resolution tests
//! - `validation`: Range checks and derived policies

mod field_resolution;
mod helpers;
