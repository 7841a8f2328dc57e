use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use glint::{
    headless::HeadlessContext, BuildError, BuildStage, FsLoader, ShaderProgram, SourceLoader,
    Uniform,
};

const VERTEX: &str = r#"#version 330 core
layout(location = 0) in vec3 pos;

uniform mat4 model;
uniform mat4 projection;

out vec3 v_color;

void main() {
    gl_Position = projection * model * vec4(pos, 1.0);
    v_color = clamp(pos, 0.0, 1.0);
}
"#;

const FRAGMENT: &str = r#"#version 330 core
in vec3 v_color;
out vec4 color;

void main() {
    color = vec4(v_color, 1.0);
}
"#;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Loader serving sources from memory, failing like a missing file otherwise.
#[derive(Debug, Default)]
struct MemoryLoader(HashMap<PathBuf, String>);

impl MemoryLoader {
    fn with(mut self, path: &str, source: &str) -> Self {
        self.0.insert(PathBuf::from(path), source.to_string());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such shader"))
    }
}

fn assert_no_leaks(gc: &HeadlessContext, programs: usize) {
    assert_eq!(gc.live_stages(), 0, "stage objects leaked");
    assert_eq!(gc.live_programs(), programs);
    assert_eq!(gc.invalid_operations(), 0);
}

#[test]
fn builds_valid_pair() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::new(&gc);
    program.build_from_source(VERTEX, FRAGMENT).unwrap();

    assert!(program.is_built());
    assert_no_leaks(&gc, 1);
    assert!(program.model_location().is_some());
    assert!(program.projection_location().is_some());
    assert_ne!(program.model_location(), program.projection_location());
}

#[test]
fn uniform_resolution_is_idempotent_and_tolerates_missing_names() {
    let gc = HeadlessContext::new();
    let program = ShaderProgram::from_source(&gc, VERTEX, FRAGMENT).unwrap();

    let first = program.resolve_uniform("model");
    assert_eq!(program.resolve_uniform("model"), first);
    assert_eq!(program.resolve_uniform("does_not_exist"), None);
    assert_eq!(program.resolve_uniform("does_not_exist"), None);
    assert_eq!(program.resolve_uniform("mod\0el"), None);
}

#[test]
fn unused_uniform_is_not_found() {
    let gc = HeadlessContext::new();
    let vertex = VERTEX.replace("projection * model * ", "model * ");
    let program = ShaderProgram::from_source(&gc, &vertex, FRAGMENT).unwrap();

    assert!(program.model_location().is_some());
    assert_eq!(program.projection_location(), None);
}

#[test]
fn uniforms_declared_together_are_both_active() {
    let gc = HeadlessContext::new();
    let vertex = VERTEX.replace(
        "uniform mat4 model;\nuniform mat4 projection;",
        "uniform mat4 model, projection;",
    );
    assert_ne!(vertex, VERTEX);
    let program = ShaderProgram::from_source(&gc, &vertex, FRAGMENT).unwrap();

    assert!(program.model_location().is_some());
    assert!(program.projection_location().is_some());
}

#[test]
fn interface_blocks_and_macros_compile() {
    let gc = HeadlessContext::new();
    let vertex = r#"#version 330 core
#define SCALE 0.5
layout(location = 0) in vec3 pos;
uniform mat4 model;
out VS_OUT {
    vec3 color;
} vs_out;
void main() {
    gl_Position = model * vec4(pos * SCALE, 1.0);
    vs_out.color = pos;
}
"#;
    let fragment = "#version 330 core\nout vec4 color;\nvoid main() { color = vec4(1.0); }";
    let program = ShaderProgram::from_source(&gc, vertex, fragment).unwrap();
    assert!(program.model_location().is_some());
    assert_no_leaks(&gc, 1);
}

#[test]
fn undeclared_identifier_is_a_vertex_compile_error() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::new(&gc);
    let err = program
        .build_from_source("void main(){gl_Position=vec4(pos,1.0);}", FRAGMENT)
        .unwrap_err();

    assert_eq!(err.stage(), BuildStage::Vertex);
    assert!(matches!(err, BuildError::VertexCompile(..)));
    assert!(err.diagnostic().contains("pos"), "{}", err.diagnostic());
    assert!(!program.is_built());
    assert_no_leaks(&gc, 0);

    program.bind();
    assert_eq!(gc.current_program(), None);
    assert_eq!(program.resolve_uniform("model"), None);
}

#[test]
fn fragment_errors_are_attributed_to_the_fragment_stage() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::new(&gc);
    let err = program
        .build_from_source(VERTEX, "out vec4 color;\nvoid main() { color = tint; }")
        .unwrap_err();

    assert!(matches!(err, BuildError::FragmentCompile(..)));
    assert!(err.diagnostic().contains("`tint' undeclared"));
    assert_no_leaks(&gc, 0);
}

#[test]
fn mismatched_interfaces_fail_to_link() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::new(&gc);
    let fragment = "#version 330 core\nin vec4 v_normal;\nout vec4 color;\nvoid main() { color = v_normal; }";
    let err = program.build_from_source(VERTEX, fragment).unwrap_err();

    assert_eq!(err.stage(), BuildStage::Link);
    assert!(err.diagnostic().contains("v_normal"));
    assert!(!program.is_built());
    assert_no_leaks(&gc, 0);
}

#[test]
fn validation_failure_destroys_the_program() {
    let gc = HeadlessContext::new();
    gc.set_executable(false);
    let mut program = ShaderProgram::new(&gc);
    let err = program.build_from_source(VERTEX, FRAGMENT).unwrap_err();

    assert!(matches!(err, BuildError::Validation(..)));
    assert!(!err.diagnostic().is_empty());
    assert!(!program.is_built());
    assert_no_leaks(&gc, 0);

    gc.set_executable(true);
    program.build_from_source(VERTEX, FRAGMENT).unwrap();
    assert_no_leaks(&gc, 1);
}

#[test]
fn empty_source_never_reaches_the_context() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::new(&gc);

    let err = program.build_from_source(VERTEX, "   \n").unwrap_err();
    assert!(matches!(err, BuildError::FragmentCompile(..)));
    assert_eq!(gc.compile_calls(), 0);
    assert_no_leaks(&gc, 0);
}

#[test]
fn allocation_failure_is_reported() {
    let gc = HeadlessContext::new();
    gc.set_object_limit(Some(2));
    let mut program = ShaderProgram::new(&gc);

    let err = program.build_from_source(VERTEX, FRAGMENT).unwrap_err();
    assert_eq!(err.stage(), BuildStage::Allocation);
    assert_no_leaks(&gc, 0);
}

#[test]
fn failed_rebuild_leaves_program_unbuilt() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::from_source(&gc, VERTEX, FRAGMENT).unwrap();
    let old = program.handle().unwrap();

    assert!(program.build_from_source("void main() {", FRAGMENT).is_err());
    assert!(!program.is_built());
    assert!(!gc.is_program(old));
    assert_no_leaks(&gc, 0);
}

#[test]
fn rebuild_replaces_the_previous_program() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::from_source(&gc, VERTEX, FRAGMENT).unwrap();
    let old = program.handle().unwrap();
    program.resolve_uniform("model");

    program.build_from_source(VERTEX, FRAGMENT).unwrap();
    assert_ne!(program.handle(), Some(old));
    assert!(!gc.is_program(old));
    assert_no_leaks(&gc, 1);
}

#[test]
fn release_is_idempotent() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::from_source(&gc, VERTEX, FRAGMENT).unwrap();
    assert!(program.model_location().is_some());

    program.release();
    program.release();

    assert!(!program.is_built());
    assert_eq!(program.model_location(), None);
    assert_eq!(program.resolve_uniform("projection"), None);
    assert_no_leaks(&gc, 0);
}

#[test]
fn drop_releases_the_program() {
    let gc = HeadlessContext::new();
    {
        let _program = ShaderProgram::from_source(&gc, VERTEX, FRAGMENT).unwrap();
        assert_eq!(gc.live_programs(), 1);
    }
    assert_no_leaks(&gc, 0);

    let mut unbuilt = ShaderProgram::new(&gc);
    unbuilt.release();
    drop(unbuilt);
    assert_no_leaks(&gc, 0);
}

#[test]
fn bind_and_upload_uniforms() {
    let gc = HeadlessContext::new();
    let program = ShaderProgram::from_source(&gc, VERTEX, FRAGMENT).unwrap();
    let model = program.model_location().unwrap();

    program.bind();
    assert_eq!(gc.current_program(), program.handle());
    program.set_uniform(model, [[1f32, 0., 0., 0.], [0., 1., 0., 0.], [0., 0., 1., 0.], [0., 0., 0., 1.]]);
    assert!(matches!(
        gc.uniform_value(program.handle().unwrap(), model),
        Some(Uniform::Mat4(..))
    ));

    program.unbind();
    assert_eq!(gc.current_program(), None);
    assert_eq!(gc.invalid_operations(), 0);
}

#[test]
fn missing_file_is_source_unavailable_without_compiling() {
    let gc = HeadlessContext::new();
    let mut program = ShaderProgram::new(&gc);
    let missing = fixtures().join("missing.vert.glsl");
    let err = program
        .build_from_files(&missing, fixtures().join("triangle.frag.glsl"))
        .unwrap_err();

    match &err {
        BuildError::SourceUnavailable { path, reason } => {
            assert_eq!(path, &missing);
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(gc.compile_calls(), 0);
    assert_no_leaks(&gc, 0);
}

#[test]
fn builds_from_fixture_files() {
    let gc = HeadlessContext::new();
    let loader = FsLoader::with_base_path(fixtures());
    let mut program = ShaderProgram::new(&gc);
    program
        .build_from_files_with(&loader, "triangle.vert.glsl", "triangle.frag.glsl")
        .unwrap();
    assert!(program.model_location().is_some());
    assert!(program.projection_location().is_some());
}

#[test]
fn file_without_trailing_newline_keeps_its_last_line() {
    let gc = HeadlessContext::new();
    let loader = FsLoader::with_base_path(fixtures());
    let mut program = ShaderProgram::new(&gc);

    // The closing brace is the last byte of the file; dropping it would be a syntax error.
    program
        .build_from_files_with(&loader, "triangle.vert.glsl", "no_trailing_newline.frag.glsl")
        .unwrap();
    assert!(program.is_built());
}

#[test]
fn custom_loader() {
    let gc = HeadlessContext::new();
    let loader = MemoryLoader::default()
        .with("a.vert", VERTEX)
        .with("a.frag", FRAGMENT);
    let mut program = ShaderProgram::new(&gc);

    program.build_from_files_with(&loader, "a.vert", "a.frag").unwrap();
    let err = program
        .build_from_files_with(&loader, "a.vert", "b.frag")
        .unwrap_err();
    assert_eq!(err.stage(), BuildStage::Source);
    assert!(err.to_string().contains("b.frag"));
    assert!(!program.is_built());
    assert_no_leaks(&gc, 0);
}

#[test]
fn set_uniform_on_unbuilt_program_is_ignored() {
    let gc = HeadlessContext::new();
    let program = ShaderProgram::new(&gc);
    program.set_uniform(0, 1.0f32);
    program.bind();
    assert_eq!(gc.current_program(), None);
    assert_eq!(gc.invalid_operations(), 0);
}
