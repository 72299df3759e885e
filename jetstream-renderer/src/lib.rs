//! # jetstream-renderer
//!
//! Encodes Jetstream templates as CloudFormation JSON or YAML and renders
//! their markdown documentation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use jetstream_renderer::{GenerateOptions, Renderer};
//! use jetstream_core::Package;
//!
//! fn render_all(package: &Package) {
//!     if let Ok(renderer) = Renderer::new() {
//!         for template in package.iter() {
//!             if let Ok(body) = renderer.generate(template, &GenerateOptions::default()) {
//!                 println!("{}: {} bytes", template.name, body.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::DocumentContext;
pub use engine::{GenerateOptions, OutputFormat, Renderer, TemplateEngine, TOP_LEVEL_DICT_ORDER};
pub use error::RenderError;
