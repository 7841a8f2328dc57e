use std::ffi::{c_void, CStr};

use gl::types::{GLchar, GLenum, GLsizei, GLuint};

use crate::GlContext;

/// Routes `KHR_debug` messages into `tracing`, under the `gl` target.
///
/// Returns `false` when the driver does not expose the debug output, in which case nothing is installed.
pub fn hook_gl_to_tracing(gc: &GlContext) -> bool {
    let gl = gc.raw();
    if !gl.DebugMessageCallback.is_loaded() {
        tracing::debug!(target: "gl", "Debug output unavailable");
        return false;
    }
    unsafe {
        gl.Enable(gl::DEBUG_OUTPUT);
        gl.Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
        gl.DebugMessageCallback(Some(debug_callback), std::ptr::null());
    }
    true
}

fn source_name(source: GLenum) -> &'static str {
    match source {
        gl::DEBUG_SOURCE_API => "api",
        gl::DEBUG_SOURCE_WINDOW_SYSTEM => "window-system",
        gl::DEBUG_SOURCE_SHADER_COMPILER => "shader-compiler",
        gl::DEBUG_SOURCE_THIRD_PARTY => "third-party",
        gl::DEBUG_SOURCE_APPLICATION => "application",
        _ => "other",
    }
}

fn type_name(gltype: GLenum) -> &'static str {
    match gltype {
        gl::DEBUG_TYPE_ERROR => "error",
        gl::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "deprecated",
        gl::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "undefined-behavior",
        gl::DEBUG_TYPE_PORTABILITY => "portability",
        gl::DEBUG_TYPE_PERFORMANCE => "performance",
        gl::DEBUG_TYPE_MARKER => "marker",
        gl::DEBUG_TYPE_PUSH_GROUP => "push-group",
        gl::DEBUG_TYPE_POP_GROUP => "pop-group",
        _ => "other",
    }
}

extern "system" fn debug_callback(
    source: GLenum,
    gltype: GLenum,
    id: GLuint,
    severity: GLenum,
    length: GLsizei,
    message: *const GLchar,
    _user_param: *mut c_void,
) {
    if message.is_null() {
        return;
    }
    let message = if length >= 0 {
        let bytes = unsafe { std::slice::from_raw_parts(message.cast::<u8>(), length as usize) };
        String::from_utf8_lossy(bytes)
    } else {
        unsafe { CStr::from_ptr(message) }.to_string_lossy()
    };
    let source = source_name(source);
    let kind = type_name(gltype);
    match severity {
        gl::DEBUG_SEVERITY_HIGH => tracing::error!(target: "gl", %source, %kind, id, "{}", message),
        gl::DEBUG_SEVERITY_MEDIUM => tracing::warn!(target: "gl", %source, %kind, id, "{}", message),
        gl::DEBUG_SEVERITY_LOW => tracing::info!(target: "gl", %source, %kind, id, "{}", message),
        _ => tracing::debug!(target: "gl", %source, %kind, id, "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_names() {
        assert_eq!(source_name(gl::DEBUG_SOURCE_SHADER_COMPILER), "shader-compiler");
        assert_eq!(source_name(0), "other");
        assert_eq!(type_name(gl::DEBUG_TYPE_PERFORMANCE), "performance");
    }

    #[test]
    fn callback_accepts_sized_and_terminated_messages() {
        let text = b"buffer object 3 will use VIDEO memory\0";
        debug_callback(
            gl::DEBUG_SOURCE_API,
            gl::DEBUG_TYPE_OTHER,
            131185,
            gl::DEBUG_SEVERITY_NOTIFICATION,
            (text.len() - 1) as GLsizei,
            text.as_ptr().cast(),
            std::ptr::null_mut(),
        );
        debug_callback(
            gl::DEBUG_SOURCE_API,
            gl::DEBUG_TYPE_ERROR,
            1,
            gl::DEBUG_SEVERITY_HIGH,
            -1,
            text.as_ptr().cast(),
            std::ptr::null_mut(),
        );
        debug_callback(0, 0, 0, 0, 0, std::ptr::null(), std::ptr::null_mut());
    }
}
