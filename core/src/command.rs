//! # Command Layer
//!
//! Short Persian (or English) phrases in, localized replies out.
//! [`parse`] is a pure keyword mapper; [`CommandExecutor`] resolves the
//! intent against the catalog and drives the device through its adapter.

mod executor;
pub mod keywords;
pub mod normalize;
mod parser;
pub mod responses;

pub use executor::{CommandExecutor, CommandOutcome, resolve, step_brightness};
pub use parser::{Action, ParsedIntent, parse};
