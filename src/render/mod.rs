pub mod canvas;
pub mod easing;
pub mod engine;
pub mod entity;
pub mod shapes;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown {0} variant in stored mapping")]
    UnknownVariant(&'static str),
    #[error("cannot allocate a {width}x{height} drawing surface")]
    SurfaceAllocation { width: u32, height: u32 },
}
