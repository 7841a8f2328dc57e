pub mod context;
pub mod error;
pub mod headless;
pub mod program;
pub mod source;
pub mod uniform;

pub use context::{GraphicsContext, StageKind};
pub use error::{BuildError, BuildStage};
pub use program::ShaderProgram;
pub use source::{FsLoader, SourceLoader};
pub use uniform::Uniform;
