//! Custom report templates extracted from an uploaded document.
//!
//! A template is produced once by an external extraction call and is
//! immutable afterwards. [`reduce_sections`] turns its outline into the
//! list of sections that each get one generation step.

mod model;
mod reducer;

pub use model::{SkknSection, SkknTemplate, render_structure};
pub use reducer::reduce_sections;
