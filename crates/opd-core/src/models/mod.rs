//! Domain models for clinic visits.

mod form;
mod record;

pub use form::*;
pub use record::*;
