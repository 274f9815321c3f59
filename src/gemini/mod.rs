//! Gemini REST client: text generation with Google Search grounding, structured JSON output, and Imagen covers.

pub mod client;
mod grounding;
pub mod types;

pub use client::{GeminiClient, GeminiError};
