//! glium backend over a GL context created and owned by the window layer.

use std::rc::Rc;
use std::sync::Once;

use scene3d_core::{GraphicsError, Size};

pub(crate) static GL_INIT_ONCE: Once = Once::new();

/// The window layer's side of a GL context.
///
/// The renderer never creates or destroys contexts; it only asks the host to
/// make its context current and to report the drawable size.
pub trait HostContext {
    fn make_current(&self) -> Result<(), GraphicsError>;

    fn is_current(&self) -> bool;

    /// Size of the default framebuffer in physical pixels.
    fn drawable_size(&self) -> Size;
}

pub(crate) struct HostGlBackend {
    host: Rc<dyn HostContext>,
}

impl std::fmt::Debug for HostGlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostGlBackend")
            .field("size", &self.host.drawable_size())
            .finish()
    }
}

impl HostGlBackend {
    /// GL function pointers are loaded exactly once via `gl_loader`.
    pub(crate) fn new(host: Rc<dyn HostContext>) -> Self {
        GL_INIT_ONCE.call_once(|| {
            gl_loader::init_gl();
            gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        });

        Self { host }
    }

    pub(crate) fn host(&self) -> &dyn HostContext {
        &*self.host
    }
}

/// # Safety
///
/// glium only calls into the backend while the host context is current on
/// this thread; [`crate::GlDevice::make_current`] must run before any frame.
unsafe impl glium::backend::Backend for HostGlBackend {
    fn swap_buffers(&self) -> Result<(), glium::SwapBuffersError> {
        // The window layer presents.
        Ok(())
    }

    unsafe fn get_proc_address(&self, symbol: &str) -> *const std::os::raw::c_void {
        gl_loader::get_proc_address(symbol).cast()
    }

    fn get_framebuffer_dimensions(&self) -> (u32, u32) {
        let size = self.host.drawable_size();
        (size.width, size.height)
    }

    fn is_current(&self) -> bool {
        self.host.is_current()
    }

    unsafe fn make_current(&self) {
        if let Err(err) = self.host.make_current() {
            tracing::error!("host failed to make context current: {err}");
        }
    }

    fn resize(&self, _new_size: (u32, u32)) {}
}
