//! Pipeline stages for report extraction.
//!
//! Each submodule implements one step; the batch runner in
//! [`crate::batch`] wires them together per report.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ fetch ──▶ extract ──▶ interpret ──▶ repair
//! (links)   (HTTP)    (pdfium)    (LLM call)    (JSON recovery)
//! ```
//!
//! 1. [`input`]     load the report list and decide which entries are usable
//! 2. [`fetch`]     download one URL; the content-type picks PDF or text
//! 3. [`extract`]   per-page PDF text via pdfium, inside `spawn_blocking`
//! 4. [`interpret`] prompt the model once and classify the outcome
//! 5. [`repair`]    recover a JSON object from the completion text
//!
//! [`llm`] holds the completion seam the interpreter talks to.

pub mod extract;
pub mod fetch;
pub mod input;
pub mod interpret;
pub mod llm;
pub mod repair;
