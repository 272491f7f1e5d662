//! Map rendering.
//!
//! Both renderers follow the same shape: a canvas object accumulates a
//! list of typed layers, and a single final pass draws them in call order.

pub mod canvas;
pub mod color;
pub mod font;
pub mod html;
pub mod png;

pub use color::{parse_hex_color, to_hex, Colormap, Normalize, Rgb};
pub use html::{WebMap, WebMapOptions};
pub use png::{GridSpec, LegendEntry, StaticMap, Swatch};
