use std::ffi::CStr;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use thiserror::Error;

use crate::Gl;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error, FromPrimitive)]
#[repr(u32)]
pub enum GlErrorKind {
    #[error("Provided enum value is not valid")]
    InvalidEnum = gl::INVALID_ENUM,
    #[error("Provided value is not valid")]
    InvalidValue = gl::INVALID_VALUE,
    #[error("Invalid OpenGL operation")]
    InvalidOperation = gl::INVALID_OPERATION,
    #[error("Stack Overflow")]
    StackOverflow = gl::STACK_OVERFLOW,
    #[error("Stack Underflow")]
    StackUnderflow = gl::STACK_UNDERFLOW,
    #[error("Out of memory")]
    OutOfMemory = gl::OUT_OF_MEMORY,
    #[error("Invalid OpenGL operation on the framebuffer")]
    InvalidFramebufferOperation = gl::INVALID_FRAMEBUFFER_OPERATION,
    #[error("Unknown OpenGL error")]
    UnknownError,
}

impl GlErrorKind {
    pub fn from_code(code: u32) -> Option<Self> {
        (code != gl::NO_ERROR).then(|| Self::from_u32(code).unwrap_or(Self::UnknownError))
    }

    pub fn current_error(gl: &Gl) -> Option<Self> {
        Self::from_code(unsafe { gl.GetError() })
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}{}", log_suffix(.info_log))]
pub struct OpenGLError {
    pub kind: GlErrorKind,
    pub info_log: Option<String>,
}

fn log_suffix(info_log: &Option<String>) -> String {
    info_log
        .as_ref()
        .map(|log| format!(": {}", log))
        .unwrap_or_default()
}

impl From<GlErrorKind> for OpenGLError {
    fn from(kind: GlErrorKind) -> Self {
        Self {
            kind,
            info_log: None,
        }
    }
}

impl OpenGLError {
    /// Error for a call that returned a null object name, picking up the pending GL error if any.
    pub fn null_object(gl: &Gl, what: &str) -> Self {
        Self {
            kind: GlErrorKind::current_error(gl).unwrap_or(GlErrorKind::UnknownError),
            info_log: Some(format!("glCreate{} returned 0", what)),
        }
    }

    pub fn guard(gl: &Gl) -> Result<(), Self> {
        match GlErrorKind::current_error(gl) {
            Some(kind) => Err(kind.into()),
            None => Ok(()),
        }
    }
}

/// Reads a driver string such as `gl::VERSION` or `gl::RENDERER`.
pub fn get_string(gl: &Gl, name: gl::types::GLenum) -> Result<String, OpenGLError> {
    let ptr = unsafe { gl.GetString(name) };
    if ptr.is_null() {
        return Err(GlErrorKind::current_error(gl)
            .unwrap_or(GlErrorKind::InvalidEnum)
            .into());
    }
    let value = unsafe { CStr::from_ptr(ptr.cast()) };
    Ok(value.to_string_lossy().into_owned())
}
