//! Gemini model IDs known to work with the streaming client.
//!
//! | Model ID | Tier | Notes |
//! |----------|------|-------|
//! | `gemini-3-pro-preview` | Preview | Strongest long-form writing |
//! | `gemini-3-flash-preview` | Preview fast | |
//! | `gemini-2.5-pro` | Stable | Better for long reports, slower |
//! | `gemini-2.5-flash` | Stable default | Fast, budget-friendly (default) |
//! | `gemini-2.5-flash-lite` | Stable lite | Lightest option |
//!
//! Reference: <https://ai.google.dev/gemini-api/docs/models>
//!
//! When the default changes, update `DEFAULT_MODEL` in `skkn-core/src/config.rs`
//! as well as this table.

pub use skkn_core::config::DEFAULT_MODEL;

pub const SUPPORTED_MODELS: &[&str] = &[
    "gemini-3-pro-preview",
    "gemini-3-flash-preview",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
];

pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}
