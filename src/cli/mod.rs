//! CLI operation handlers.
//!
//! - [`seed`]: Wires configuration into the seeding pipeline and runs it
//!
//! Output formatting utilities are in [`output`].

pub mod output;
pub mod seed;
