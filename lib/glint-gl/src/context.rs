use std::{ffi::{c_void, CString}, num::NonZeroU32};

use gl::types::{GLenum, GLint};
use glint::{GraphicsContext, StageKind, Uniform};

use crate::{api::{GlErrorKind, OpenGLError}, Gl};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ShaderType {
    Vertex = gl::VERTEX_SHADER,
    Fragment = gl::FRAGMENT_SHADER,
}

impl From<StageKind> for ShaderType {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Vertex => Self::Vertex,
            StageKind::Fragment => Self::Fragment,
        }
    }
}

/// Handle onto the OpenGL context current on this thread.
///
/// Clones share the same function table. Every call panics when made from another thread than the one
/// the context was loaded on.
#[derive(Debug, Clone)]
pub struct GlContext {
    gl: Gl,
}

impl GlContext {
    /// Loads the GL function pointers. The context must be current on the calling thread.
    pub fn load_with(loader: impl FnMut(&'static str) -> *const c_void) -> Self {
        Self {
            gl: crate::load_with(loader),
        }
    }

    /// Raw function table, for the calls this crate does not wrap.
    pub fn raw(&self) -> &gl::Gl {
        &self.gl
    }

    pub fn get_string(&self, name: GLenum) -> Result<String, OpenGLError> {
        crate::api::get_string(&self.gl, name)
    }

    pub fn guard(&self) -> Result<(), OpenGLError> {
        OpenGLError::guard(&self.gl)
    }

    fn shader_iv(&self, shader: NonZeroU32, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { self.gl.GetShaderiv(shader.get(), pname, &mut value) };
        value
    }

    fn program_iv(&self, program: NonZeroU32, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { self.gl.GetProgramiv(program.get(), pname, &mut value) };
        value
    }
}

/// Reads an info log of `len` bytes (terminator included) through `read`.
fn read_info_log(len: GLint, read: impl FnOnce(GLint, &mut GLint, *mut gl::types::GLchar)) -> String {
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u8; len as usize];
    let mut written = 0;
    read(len, &mut written, buf.as_mut_ptr().cast());
    buf.truncate(written.clamp(0, len) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

impl GraphicsContext for GlContext {
    type Program = NonZeroU32;
    type Stage = NonZeroU32;
    type UniformLocation = u32;
    type Err = OpenGLError;

    fn create_program(&self) -> Result<Self::Program, Self::Err> {
        NonZeroU32::new(unsafe { self.gl.CreateProgram() })
            .ok_or_else(|| OpenGLError::null_object(&self.gl, "Program"))
    }

    fn create_stage(&self, kind: StageKind) -> Result<Self::Stage, Self::Err> {
        let typ = ShaderType::from(kind);
        NonZeroU32::new(unsafe { self.gl.CreateShader(typ as _) })
            .ok_or_else(|| OpenGLError::null_object(&self.gl, "Shader"))
    }

    fn set_stage_source(&self, stage: Self::Stage, source: &str) {
        // Lengths are passed explicitly, the source does not need a NUL terminator.
        let ptr = source.as_ptr().cast::<gl::types::GLchar>();
        let len = source.len() as GLint;
        unsafe { self.gl.ShaderSource(stage.get(), 1, &ptr, &len) }
    }

    fn compile_stage(&self, stage: Self::Stage) {
        unsafe { self.gl.CompileShader(stage.get()) }
    }

    fn compile_status(&self, stage: Self::Stage) -> bool {
        self.shader_iv(stage, gl::COMPILE_STATUS) as gl::types::GLboolean == gl::TRUE
    }

    fn stage_info_log(&self, stage: Self::Stage) -> String {
        let len = self.shader_iv(stage, gl::INFO_LOG_LENGTH);
        read_info_log(len, |len, written, buf| unsafe {
            self.gl.GetShaderInfoLog(stage.get(), len, written, buf)
        })
    }

    fn attach_stage(&self, program: Self::Program, stage: Self::Stage) {
        unsafe { self.gl.AttachShader(program.get(), stage.get()) }
    }

    fn detach_stage(&self, program: Self::Program, stage: Self::Stage) {
        unsafe { self.gl.DetachShader(program.get(), stage.get()) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.LinkProgram(program.get()) }
    }

    fn link_status(&self, program: Self::Program) -> bool {
        self.program_iv(program, gl::LINK_STATUS) as gl::types::GLboolean == gl::TRUE
    }

    fn validate_program(&self, program: Self::Program) {
        unsafe { self.gl.ValidateProgram(program.get()) }
    }

    fn validate_status(&self, program: Self::Program) -> bool {
        self.program_iv(program, gl::VALIDATE_STATUS) as gl::types::GLboolean == gl::TRUE
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        let len = self.program_iv(program, gl::INFO_LOG_LENGTH);
        read_info_log(len, |len, written, buf| unsafe {
            self.gl.GetProgramInfoLog(program.get(), len, written, buf)
        })
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        let name = CString::new(name).ok()?;
        let loc = unsafe { self.gl.GetUniformLocation(program.get(), name.as_ptr()) };
        (loc >= 0).then_some(loc as _)
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.UseProgram(program.map_or(0, NonZeroU32::get)) }
    }

    fn set_uniform(&self, location: Self::UniformLocation, value: &Uniform) {
        let location = location as GLint;
        unsafe {
            match value {
                Uniform::Int(i) => self.gl.Uniform1i(location, *i),
                Uniform::Uint(i) => self.gl.Uniform1ui(location, *i),
                Uniform::Float(f) => self.gl.Uniform1f(location, *f),
                Uniform::Ivec2(v) => self.gl.Uniform2iv(location, 1, v.as_ptr()),
                Uniform::UIvec2(v) => self.gl.Uniform2uiv(location, 1, v.as_ptr()),
                Uniform::Vec2(v) => self.gl.Uniform2fv(location, 1, v.as_ptr()),
                Uniform::Ivec3(v) => self.gl.Uniform3iv(location, 1, v.as_ptr()),
                Uniform::UIvec3(v) => self.gl.Uniform3uiv(location, 1, v.as_ptr()),
                Uniform::Vec3(v) => self.gl.Uniform3fv(location, 1, v.as_ptr()),
                Uniform::Ivec4(v) => self.gl.Uniform4iv(location, 1, v.as_ptr()),
                Uniform::UIvec4(v) => self.gl.Uniform4uiv(location, 1, v.as_ptr()),
                Uniform::Vec4(v) => self.gl.Uniform4fv(location, 1, v.as_ptr()),
                Uniform::Mat2(m) => {
                    self.gl
                        .UniformMatrix2fv(location, 1, gl::FALSE, m.as_ptr().cast())
                }
                Uniform::Mat3(m) => {
                    self.gl
                        .UniformMatrix3fv(location, 1, gl::FALSE, m.as_ptr().cast())
                }
                Uniform::Mat4(m) => {
                    self.gl
                        .UniformMatrix4fv(location, 1, gl::FALSE, m.as_ptr().cast())
                }
            }
        }
        if let Some(kind) = GlErrorKind::current_error(&self.gl) {
            tracing::warn!(target: "gl", %location, glsl_type=value.glsl_type(), "Cannot set uniform: {}", kind);
        }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.DeleteProgram(program.get()) }
    }

    fn delete_stage(&self, stage: Self::Stage) {
        unsafe { self.gl.DeleteShader(stage.get()) }
    }
}
