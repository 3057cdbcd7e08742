//! Resets the GL state the renderer touches, for hosts sharing the context.

/// Texture targets unbound during a reset.
const TEXTURE_TARGETS: [u32; 2] = [gl::TEXTURE_1D, gl::TEXTURE_2D];

/// Restore the defaults a host expects after the renderer ran.
///
/// This unbinds programs, textures and buffers, disables blending and
/// scissoring, rebinds the default framebuffer and resets the viewport.
///
/// # Safety
///
/// Must be called with a valid OpenGL context current. `has_vertex_arrays`
/// and `has_framebuffers` must reflect what the context supports.
pub(crate) unsafe fn reset_state(
    viewport: (u32, u32),
    has_vertex_arrays: bool,
    has_framebuffers: bool,
) {
    gl::UseProgram(0);

    let mut num_samplers = 0;
    gl::GetIntegerv(gl::MAX_TEXTURE_IMAGE_UNITS, &mut num_samplers);

    for target in TEXTURE_TARGETS {
        for sampler in 0..num_samplers {
            gl::ActiveTexture(gl::TEXTURE0 + sampler as u32);
            gl::BindTexture(target, 0);
        }
    }

    gl::ActiveTexture(gl::TEXTURE0);

    gl::BindBuffer(gl::ARRAY_BUFFER, 0);
    gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, 0);
    if has_vertex_arrays {
        gl::BindVertexArray(0);
    }

    gl::Disable(gl::BLEND);
    gl::BlendFunc(gl::ONE, gl::ZERO);
    gl::Disable(gl::SCISSOR_TEST);

    if has_framebuffers {
        gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
    }
    gl::Viewport(0, 0, viewport.0 as i32, viewport.1 as i32);
}

/// Copy a region of the back buffer to the front buffer.
///
/// `rect` is `(x, y, width, height)` with a bottom-left origin.
///
/// # Safety
///
/// Must be called with a valid OpenGL context current that supports
/// framebuffer blits.
pub(crate) unsafe fn blit_back_to_front((x, y, w, h): (i32, i32, i32, i32)) {
    gl::BindFramebuffer(gl::READ_FRAMEBUFFER, 0);
    gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, 0);
    gl::ReadBuffer(gl::BACK);
    gl::DrawBuffer(gl::FRONT);
    gl::BlitFramebuffer(
        x,
        y,
        x + w,
        y + h,
        x,
        y,
        x + w,
        y + h,
        gl::COLOR_BUFFER_BIT,
        gl::NEAREST,
    );
    gl::DrawBuffer(gl::BACK);
}

/// Read RGBA8 pixels from the default framebuffer, rows bottom-up.
///
/// # Safety
///
/// Must be called with a valid OpenGL context current; `out` must hold
/// `w * h * 4` bytes.
pub(crate) unsafe fn read_default_framebuffer(
    buffer: gl::types::GLenum,
    (x, y, w, h): (i32, i32, i32, i32),
    has_framebuffers: bool,
    out: &mut [u8],
) {
    if has_framebuffers {
        gl::BindFramebuffer(gl::READ_FRAMEBUFFER, 0);
    }
    gl::ReadBuffer(buffer);
    gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
    gl::ReadPixels(
        x,
        y,
        w,
        h,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        out.as_mut_ptr().cast(),
    );
}
