//! Picture letterboxing and document rendering.
//!
//! This crate provides:
//! - The letterbox compositor (pure resize/pad math plus encoding)
//! - Build-instructions document source assembly
//! - External renderer command building and execution with timeouts

pub mod compositor;
pub mod document;
pub mod error;
pub mod renderer;

pub use compositor::{compose_variant, compose_variants, letterbox, DerivedImage, LetterboxPlan, SourceImage};
pub use document::{build_instructions_markdown, InstructionsSource};
pub use error::{MediaError, MediaResult};
pub use renderer::{check_renderer, DocumentRenderer, PandocRenderer, RenderCommand, RendererRunner};
