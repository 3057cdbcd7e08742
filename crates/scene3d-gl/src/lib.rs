//! OpenGL providers built on glium.
//!
//! Use [`GlDevice::new`] with the window layer's [`HostContext`] to wrap a
//! context the host already created. [`GlDevice::into_legacy`] restricts the
//! device to the GL1 capability set.
//!
//! ### Warning
//!
//! The device issues raw `gl` calls for default-framebuffer read-back and
//! front-buffer blits, then resynchronises glium's state cache. Hosts that
//! also touch the context should enable state restoration after each frame.

mod device;
mod gl_backend;
pub mod glsl;
mod state;

pub use device::{GlDevice, GlProfile};
pub use gl_backend::HostContext;
