use std::{ffi::c_void, sync::Arc};

pub use gl;

use thread_guard::ThreadGuard;

pub mod api;
pub mod context;
pub mod debug;
mod thread_guard;

pub use api::{GlErrorKind, OpenGLError};
pub use context::{GlContext, ShaderType};

type Gl = Arc<ThreadGuard<gl::Gl>>;

fn load_with(loader: impl FnMut(&'static str) -> *const c_void) -> Gl {
    let gl = gl::Gl::load_with(loader);
    Arc::new(ThreadGuard::new(gl))
}
