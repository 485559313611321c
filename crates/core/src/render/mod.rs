//! Contracts between the engine and the external render surface.

use serde::{Deserialize, Serialize};

use crate::{Result, Rgba, TextCue};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub diameter: f32,
}

/// Everything a surface needs to draw one frame. Recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Fill colour: the whole surface, or the shape when `geometry` is set.
    pub color: Rgba,
    /// Colour behind the shape, if the animation draws one.
    pub background: Option<Rgba>,
    pub geometry: Option<Geometry>,
}

impl RenderState {
    /// Frame shown while no stimulus is being rendered.
    pub fn blank() -> Self {
        Self {
            color: Rgba::rgb(0.1, 0.1, 0.1),
            background: None,
            geometry: None,
        }
    }
}

/// Surface the visual channel draws on. Implemented by the windowing layer.
pub trait RenderSurface: Send {
    fn present(&mut self, state: &RenderState) -> Result<()>;

    /// Shows a text cue until [`RenderSurface::clear_overlay`] is called.
    fn overlay_cue(&mut self, cue: &TextCue) -> Result<()>;

    fn clear_overlay(&mut self) -> Result<()> {
        Ok(())
    }

    /// Largest diameter a shape may take on this surface, in pixels.
    fn max_diameter(&self) -> f32;
}

/// Per-frame callback handed to the frame driver. Receives the frame delta in
/// seconds and returns the state that was presented, or `None` once the
/// session it belongs to is over.
pub type FrameCallback = Box<dyn FnMut(f64) -> Option<RenderState> + Send>;

/// Anything that drives frames, usually the window's vsync loop.
pub trait FrameSource {
    fn register_frame_callback(&mut self, callback: FrameCallback);
}
