use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::context::StageKind;

/// Diagnostic used when the driver reports a failure without any log text.
pub(crate) const EMPTY_LOG: &str = "<no diagnostic provided by the driver>";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BuildStage {
    Source,
    Allocation,
    Vertex,
    Fragment,
    Link,
    Validation,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Allocation => "allocation",
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Link => "link",
            Self::Validation => "validation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Cannot read shader source {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("Cannot allocate shader object: {0}")]
    Allocation(String),
    #[error("Vertex shader failed to compile:\n{0}")]
    VertexCompile(String),
    #[error("Fragment shader failed to compile:\n{0}")]
    FragmentCompile(String),
    #[error("Shader program failed to link:\n{0}")]
    Link(String),
    #[error("Shader program failed validation:\n{0}")]
    Validation(String),
}

impl BuildError {
    pub(crate) fn compile(kind: StageKind, log: impl Into<String>) -> Self {
        let log = non_empty(log.into());
        match kind {
            StageKind::Vertex => Self::VertexCompile(log),
            StageKind::Fragment => Self::FragmentCompile(log),
        }
    }

    pub(crate) fn link(log: impl Into<String>) -> Self {
        Self::Link(non_empty(log.into()))
    }

    pub(crate) fn validation(log: impl Into<String>) -> Self {
        Self::Validation(non_empty(log.into()))
    }

    pub fn stage(&self) -> BuildStage {
        match self {
            Self::SourceUnavailable { .. } => BuildStage::Source,
            Self::Allocation(..) => BuildStage::Allocation,
            Self::VertexCompile(..) => BuildStage::Vertex,
            Self::FragmentCompile(..) => BuildStage::Fragment,
            Self::Link(..) => BuildStage::Link,
            Self::Validation(..) => BuildStage::Validation,
        }
    }

    /// Compiler, linker or I/O text explaining the failure.
    pub fn diagnostic(&self) -> &str {
        match self {
            Self::SourceUnavailable { reason, .. } => reason,
            Self::Allocation(log)
            | Self::VertexCompile(log)
            | Self::FragmentCompile(log)
            | Self::Link(log)
            | Self::Validation(log) => log,
        }
    }
}

fn non_empty(log: String) -> String {
    let trimmed = log.trim_end_matches(['\0', '\n', '\r', ' ']);
    if trimmed.trim().is_empty() {
        EMPTY_LOG.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_driver_log_gets_fallback() {
        let err = BuildError::link("\0");
        assert_eq!(err.diagnostic(), EMPTY_LOG);
        assert_eq!(err.stage(), BuildStage::Link);
    }

    #[test]
    fn trailing_nul_and_newlines_are_trimmed() {
        let err = BuildError::compile(StageKind::Fragment, "0:1(1): error: oops\n\0");
        assert_eq!(err, BuildError::FragmentCompile("0:1(1): error: oops".to_string()));
    }

    #[test]
    fn source_unavailable_names_the_path() {
        let err = BuildError::SourceUnavailable {
            path: PathBuf::from("shaders/missing.vert"),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(err.stage(), BuildStage::Source);
        assert!(err.to_string().contains("shaders/missing.vert"));
    }
}
