#![forbid(unsafe_code)]

//! Vertical image stacking with bounded peak memory.
//!
//! A merge runs in two passes over the ordered inputs: a probe pass that reads only
//! image sizes into a [`LayoutPlan`], then a composite pass that decodes one image at a
//! time into a single preallocated [`Canvas`].

pub mod assets {
    pub mod convert;
    pub mod decode;
}
pub mod config;
pub mod encode;
pub mod foundation {
    pub mod core;
    pub mod error;
}
pub mod inputs;
pub mod probe;
pub mod render {
    pub mod canvas;
    pub mod draw;
    pub mod pipeline;
}
pub mod source;

pub use assets::convert::ConversionCache;
pub use config::{MergeConfig, SeparatorStyle};
pub use encode::{OutputFormat, OutputTarget, write_canvas};
pub use foundation::core::{Dimension, LayoutPlan, MergeStage, ProgressEvent, Rgba8};
pub use foundation::error::{StackError, StackResult};
pub use inputs::InputSelector;
pub use probe::{aggregate, probe};
pub use render::canvas::{Canvas, allocate};
pub use render::pipeline::{ProgressFn, composite, merge};
pub use source::SourceFormat;
