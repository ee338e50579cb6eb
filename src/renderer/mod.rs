//! SVG renderer for shapes and the first-frame scene
//!
//! Shapes are emitted as standalone SVG documents, one per definition. The
//! scene renderer nests the same shape groups under one `<g>` per instance.

pub mod color;
pub mod config;
pub mod path;
pub mod svg;

pub use color::{ColorChain, ColorTransforms};
pub use config::SvgConfig;
pub use svg::{render_scene, render_shape};
