use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    path::Path,
};

use crate::{
    context::{GraphicsContext, StageKind},
    error::BuildError,
    source::{FsLoader, SourceLoader},
    uniform::Uniform,
};

pub const MODEL_UNIFORM: &str = "model";
pub const PROJECTION_UNIFORM: &str = "projection";

/// A linked vertex + fragment program owned by a single user.
///
/// The program is either unbuilt, holding no context resource, or built: linked and validated against the
/// context. A failed build always leaves the program unbuilt. The held resource is released on drop, which
/// must therefore happen while the context is still current.
pub struct ShaderProgram<G: GraphicsContext> {
    gc: G,
    program: Option<G::Program>,
    uniforms: RefCell<HashMap<String, Option<G::UniformLocation>>>,
}

impl<G: GraphicsContext> fmt::Debug for ShaderProgram<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("program", &self.program)
            .field("uniforms", &self.uniforms.borrow())
            .finish()
    }
}

impl<G: GraphicsContext> Drop for ShaderProgram<G> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<G: GraphicsContext + Clone> ShaderProgram<G> {
    pub fn new(gc: &G) -> Self {
        Self {
            gc: gc.clone(),
            program: None,
            uniforms: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_source(gc: &G, vertex: &str, fragment: &str) -> Result<Self, BuildError> {
        let mut this = Self::new(gc);
        this.build_from_source(vertex, fragment)?;
        Ok(this)
    }

    pub fn from_files(
        gc: &G,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> Result<Self, BuildError> {
        let mut this = Self::new(gc);
        this.build_from_files(vertex, fragment)?;
        Ok(this)
    }
}

impl<G: GraphicsContext> ShaderProgram<G> {
    /// Compiles, links and validates the two stages, replacing any program held before.
    ///
    /// On error the program is left unbuilt and no context object created during the attempt stays alive.
    pub fn build_from_source(&mut self, vertex: &str, fragment: &str) -> Result<(), BuildError> {
        self.release();
        let _span = tracing::debug_span!("build_program").entered();
        check_source(StageKind::Vertex, vertex)?;
        check_source(StageKind::Fragment, fragment)?;

        let program = self
            .gc
            .create_program()
            .map_err(|err| BuildError::Allocation(err.to_string()))?;
        tracing::debug!(?program, "Created program");
        match link_and_validate(&self.gc, program, vertex, fragment) {
            Ok(()) => {
                tracing::debug!(?program, "Program built");
                self.program = Some(program);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(?program, stage=%err.stage(), "Program build failed");
                self.gc.delete_program(program);
                Err(err)
            }
        }
    }

    pub fn build_from_files(
        &mut self,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> Result<(), BuildError> {
        self.build_from_files_with(&FsLoader::new(), vertex, fragment)
    }

    /// Reads both stages through `loader` before compiling anything; an unreadable path fails the build
    /// without touching the context.
    pub fn build_from_files_with(
        &mut self,
        loader: &impl SourceLoader,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> Result<(), BuildError> {
        self.release();
        let vertex = read_source(loader, vertex.as_ref())?;
        let fragment = read_source(loader, fragment.as_ref())?;
        self.build_from_source(&vertex, &fragment)
    }

    pub fn is_built(&self) -> bool {
        self.program.is_some()
    }

    pub fn handle(&self) -> Option<G::Program> {
        self.program
    }

    /// Looks up a uniform, caching the answer. Uniforms missing from the linked program, including those
    /// the compiler optimized away, resolve to `None`.
    pub fn resolve_uniform(&self, name: &str) -> Option<G::UniformLocation> {
        let program = self.program?;
        if let Some(location) = self.uniforms.borrow().get(name) {
            return *location;
        }
        let location = if name.contains('\0') {
            None
        } else {
            self.gc.uniform_location(program, name)
        };
        if location.is_none() {
            tracing::debug!(%name, ?program, "Uniform not found");
        }
        self.uniforms.borrow_mut().insert(name.to_string(), location);
        location
    }

    pub fn model_location(&self) -> Option<G::UniformLocation> {
        self.resolve_uniform(MODEL_UNIFORM)
    }

    pub fn projection_location(&self) -> Option<G::UniformLocation> {
        self.resolve_uniform(PROJECTION_UNIFORM)
    }

    /// Makes this program current for the following draw calls.
    ///
    /// Binding an unbuilt program does nothing besides logging a warning; it never binds a stale handle.
    pub fn bind(&self) {
        match self.program {
            Some(program) => self.gc.use_program(Some(program)),
            None => tracing::warn!("Tried to bind a shader program that is not built"),
        }
    }

    pub fn unbind(&self) {
        self.gc.use_program(None);
    }

    /// Uploads a value into the program, which must currently be bound.
    pub fn set_uniform(&self, location: G::UniformLocation, value: impl Into<Uniform>) {
        if self.program.is_none() {
            tracing::warn!(?location, "Tried to set a uniform on a shader program that is not built");
            return;
        }
        self.gc.set_uniform(location, &value.into());
    }

    /// Deletes the held program, if any, and forgets all resolved uniforms. Calling it again is a no-op.
    pub fn release(&mut self) {
        if let Some(program) = self.program.take() {
            tracing::debug!(?program, "Releasing program");
            self.gc.delete_program(program);
        }
        self.uniforms.get_mut().clear();
    }
}

/// Transient stage object, detached and deleted when dropped whatever the outcome of the build.
struct Stage<'gc, G: GraphicsContext> {
    gc: &'gc G,
    id: G::Stage,
    attached_to: Option<G::Program>,
}

impl<'gc, G: GraphicsContext> Stage<'gc, G> {
    fn with_source(gc: &'gc G, kind: StageKind, source: &str) -> Result<Self, BuildError> {
        let id = gc
            .create_stage(kind)
            .map_err(|err| BuildError::Allocation(err.to_string()))?;
        let this = Self {
            gc,
            id,
            attached_to: None,
        };
        gc.set_stage_source(id, source);
        gc.compile_stage(id);
        if !gc.compile_status(id) {
            tracing::debug!(%kind, stage=?id, "Stage failed to compile");
            return Err(BuildError::compile(kind, gc.stage_info_log(id)));
        }
        Ok(this)
    }

    fn attach(&mut self, program: G::Program) {
        self.gc.attach_stage(program, self.id);
        self.attached_to = Some(program);
    }
}

impl<'gc, G: GraphicsContext> Drop for Stage<'gc, G> {
    fn drop(&mut self) {
        if let Some(program) = self.attached_to.take() {
            self.gc.detach_stage(program, self.id);
        }
        self.gc.delete_stage(self.id);
    }
}

fn link_and_validate<G: GraphicsContext>(
    gc: &G,
    program: G::Program,
    vertex: &str,
    fragment: &str,
) -> Result<(), BuildError> {
    let mut vertex = Stage::with_source(gc, StageKind::Vertex, vertex)?;
    let mut fragment = Stage::with_source(gc, StageKind::Fragment, fragment)?;
    vertex.attach(program);
    fragment.attach(program);

    gc.link_program(program);
    if !gc.link_status(program) {
        return Err(BuildError::link(gc.program_info_log(program)));
    }
    gc.validate_program(program);
    if !gc.validate_status(program) {
        return Err(BuildError::validation(gc.program_info_log(program)));
    }
    Ok(())
}

fn check_source(kind: StageKind, source: &str) -> Result<(), BuildError> {
    if source.trim().is_empty() {
        return Err(BuildError::compile(kind, "shader source is empty"));
    }
    if source.contains('\0') {
        return Err(BuildError::compile(kind, "shader source contains a NUL byte"));
    }
    Ok(())
}

fn read_source(loader: &impl SourceLoader, path: &Path) -> Result<String, BuildError> {
    loader
        .read_source(path)
        .map_err(|err| BuildError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sources_are_rejected_per_stage() {
        assert_eq!(
            check_source(StageKind::Vertex, "  \n\t"),
            Err(BuildError::VertexCompile("shader source is empty".to_string()))
        );
        assert!(matches!(
            check_source(StageKind::Fragment, "void main() {}\0"),
            Err(BuildError::FragmentCompile(..))
        ));
        assert_eq!(check_source(StageKind::Fragment, "void main() {}"), Ok(()));
    }
}
