//! Completion backend implementations for toolclaw.
//!
//! All backends implement the `toolclaw_core::Provider` trait.
//! [`build_from_config`] selects one from the loaded configuration.

pub mod factory;
pub mod openai_compat;

pub use factory::{build_from_config, default_base_url};
pub use openai_compat::OpenAiCompatProvider;
