//! Type definitions for Stellari
//!
//! Form schema, industry templates and the persona aggregate.

mod form;
mod industry;
mod persona;

pub use form::*;
pub use industry::*;
pub use persona::*;
