//! Persona construction and export
//!
//! Pure functions over the persona aggregate: building the next saved shape
//! from a form submission, replaying an old version for rollback, and
//! rendering the markdown export.

mod export;
mod history;

pub use export::{export_file_name, persona_markdown, to_markdown};
pub use history::{next_persona, replay_version};
