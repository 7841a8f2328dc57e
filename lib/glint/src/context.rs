use std::{error::Error, fmt, hash::Hash};

use crate::uniform::Uniform;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Primitive operations of a rendering context that shader programs are built against.
///
/// All calls must be issued from the thread owning the context. Implementations are expected to be
/// cheap to clone handles onto the same underlying context.
pub trait GraphicsContext {
    type Program: Copy + Eq + Hash + fmt::Debug;
    type Stage: Copy + Eq + Hash + fmt::Debug;
    type UniformLocation: Copy + Eq + fmt::Debug;
    type Err: Error + Send + Sync + 'static;

    fn create_program(&self) -> Result<Self::Program, Self::Err>;
    fn create_stage(&self, kind: StageKind) -> Result<Self::Stage, Self::Err>;
    fn set_stage_source(&self, stage: Self::Stage, source: &str);
    fn compile_stage(&self, stage: Self::Stage);
    fn compile_status(&self, stage: Self::Stage) -> bool;
    fn stage_info_log(&self, stage: Self::Stage) -> String;
    fn attach_stage(&self, program: Self::Program, stage: Self::Stage);
    fn detach_stage(&self, program: Self::Program, stage: Self::Stage);
    fn link_program(&self, program: Self::Program);
    fn link_status(&self, program: Self::Program) -> bool;
    fn validate_program(&self, program: Self::Program);
    fn validate_status(&self, program: Self::Program) -> bool;
    /// Info log of the last link or validation of the program.
    fn program_info_log(&self, program: Self::Program) -> String;
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    /// Makes the program current, or clears the current program with `None`.
    fn use_program(&self, program: Option<Self::Program>);
    /// Uploads a value into the currently bound program.
    fn set_uniform(&self, location: Self::UniformLocation, value: &Uniform);
    fn delete_program(&self, program: Self::Program);
    fn delete_stage(&self, stage: Self::Stage);
}
