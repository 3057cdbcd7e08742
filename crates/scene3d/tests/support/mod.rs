//! Shared helpers for the integration tests: software contexts, a recording
//! window and small test passes.

#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use scene3d::{
    ContextDescription, ContextProvider, GraphicContext, InData, OutData, PassIo, PipelineError,
    PortDescriptor, RenderPass, SwapInterval, WindowSurface,
};
use scene3d_core::{Capabilities, GraphicsError, PixelBuffer, Rect, Size, Texture};
use scene3d_sw::SoftwareProvider;

pub fn software_context(width: u32, height: u32) -> GraphicContext {
    GraphicContext::headless(Size::new(width, height))
}

pub fn context_with_description(size: Size, description: ContextDescription) -> GraphicContext {
    GraphicContext::new(
        ContextProvider::Software(SoftwareProvider::new(size)),
        description,
        None,
    )
}

/// Software context reporting only the given optional features.
pub fn limited_context(size: Size, framebuffer_blit: bool, float_textures: bool) -> GraphicContext {
    limited_context_with_description(
        size,
        ContextDescription::default(),
        framebuffer_blit,
        float_textures,
    )
}

pub fn limited_context_with_description(
    size: Size,
    description: ContextDescription,
    framebuffer_blit: bool,
    float_textures: bool,
) -> GraphicContext {
    let caps = Capabilities {
        framebuffer_blit,
        float_textures,
        ..Capabilities::software()
    };
    GraphicContext::new(
        ContextProvider::Software(SoftwareProvider::with_capabilities(size, caps)),
        description,
        None,
    )
}

/// Creates a texture holding `texels` exactly (row-major, top row first).
pub fn texture_from_texels(
    gc: &mut GraphicContext,
    size: Size,
    format: scene3d_core::TextureFormat,
    texels: &[[f32; 4]],
) -> Texture {
    let texture = gc.create_texture(size, format).unwrap();
    gc.software_mut()
        .unwrap()
        .write_texels(texture.id, texels)
        .unwrap();
    texture
}

pub fn texels(gc: &GraphicContext, texture: Texture) -> Vec<[f32; 4]> {
    gc.software().unwrap().texels(texture.id).unwrap().to_vec()
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Window surface that records what the driver asked of it.
///
/// Each swap logs a "wait tick" count: the refreshes the swap would wait for
/// under the interval in effect, `driver_default` while none was set.
#[derive(Debug)]
pub struct MockWindow {
    pub swap_control: bool,
    pub driver_default: u32,
    pub interval: Option<SwapInterval>,
    pub interval_calls: Vec<SwapInterval>,
    pub wait_ticks: Vec<u32>,
    pub fail_swaps: bool,
    pub layered: Vec<PixelBuffer>,
    pub regions: Vec<(Rect, PixelBuffer)>,
}

impl MockWindow {
    pub fn new() -> Self {
        Self {
            swap_control: true,
            driver_default: 1,
            interval: None,
            interval_calls: Vec::new(),
            wait_ticks: Vec::new(),
            fail_swaps: false,
            layered: Vec::new(),
            regions: Vec::new(),
        }
    }

    pub fn without_swap_control() -> Self {
        Self {
            swap_control: false,
            ..Self::new()
        }
    }

    pub fn swaps(&self) -> usize {
        self.wait_ticks.len()
    }
}

impl WindowSurface for MockWindow {
    fn supports_swap_control(&self) -> bool {
        self.swap_control
    }

    fn set_swap_interval(&mut self, interval: SwapInterval) -> Result<(), GraphicsError> {
        self.interval_calls.push(interval);
        self.interval = Some(interval);
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), GraphicsError> {
        if self.fail_swaps {
            return Err(GraphicsError::SwapFailed("surface lost".into()));
        }
        let ticks = self
            .interval
            .and_then(SwapInterval::refreshes)
            .unwrap_or(self.driver_default);
        self.wait_ticks.push(ticks);
        Ok(())
    }

    fn update_layered(&mut self, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        self.layered.push(pixels.clone());
        Ok(())
    }

    fn update_region(&mut self, rect: Rect, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        self.regions.push((rect, pixels.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

pub type RunLog = Rc<RefCell<Vec<usize>>>;

/// Graph node with up to eight `u64` inputs and one `u64` output. Records
/// its id in the shared log each time it runs, and optionally in a second
/// log when it is released.
pub struct NodePass {
    pub id: usize,
    name: String,
    inputs: usize,
    pub produce: bool,
    log: RunLog,
    released: Option<RunLog>,
}

impl NodePass {
    pub const INPUTS: [InData<u64>; 8] = [
        InData::new("in0"),
        InData::new("in1"),
        InData::new("in2"),
        InData::new("in3"),
        InData::new("in4"),
        InData::new("in5"),
        InData::new("in6"),
        InData::new("in7"),
    ];
    pub const OUT: OutData<u64> = OutData::new("out");

    pub fn new(id: usize, inputs: usize, log: &RunLog) -> Self {
        assert!(inputs <= Self::INPUTS.len());
        Self {
            id,
            name: format!("node{id}"),
            inputs,
            produce: true,
            log: Rc::clone(log),
            released: None,
        }
    }

    pub fn recording_release(mut self, released: &RunLog) -> Self {
        self.released = Some(Rc::clone(released));
        self
    }

    pub fn silent(mut self) -> Self {
        self.produce = false;
        self
    }
}

impl RenderPass for NodePass {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        Self::INPUTS[..self.inputs]
            .iter()
            .map(InData::descriptor)
            .chain(std::iter::once(Self::OUT.descriptor()))
            .collect()
    }

    fn run(&mut self, _gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        self.log.borrow_mut().push(self.id);
        let mut sum = 1u64;
        for port in &Self::INPUTS[..self.inputs] {
            sum = sum.wrapping_add(port.get(io)?);
        }
        if self.produce {
            Self::OUT.set(io, sum)?;
        }
        Ok(())
    }

    fn release(&mut self, _gc: &mut GraphicContext) {
        if let Some(released) = &self.released {
            released.borrow_mut().push(self.id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Publishes a fixed texture.
pub struct TexturePass {
    pub texture: Texture,
}

impl TexturePass {
    pub const TEXTURE: OutData<Texture> = OutData::new("texture");
}

impl RenderPass for TexturePass {
    fn name(&self) -> &str {
        "texture"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![Self::TEXTURE.descriptor()]
    }

    fn run(&mut self, _gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        Self::TEXTURE.set(io, self.texture)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
