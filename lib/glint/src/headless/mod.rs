//! In-process rendering context for building shader programs without a GPU.
//!
//! [`HeadlessContext`] hands out integer handles, keeps track of every live object, and runs a small
//! GLSL front-end (see [`glsl`]) so that compile and link failures produce diagnostics comparable to a
//! real driver. It is meant for tests and tooling, and is bound to the thread that created it.

use std::{
    cell::RefCell,
    collections::HashMap,
    num::NonZeroU32,
    rc::Rc,
};

use thiserror::Error;

use crate::{
    context::{GraphicsContext, StageKind},
    uniform::Uniform,
};

pub mod glsl;

use glsl::{StageInterface, Variable};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(NonZeroU32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StageId(NonZeroU32);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeadlessError {
    #[error("Object limit of {0} live objects reached")]
    ObjectLimit(usize),
    #[error("Out of object handles")]
    Exhausted,
}

#[derive(Debug)]
struct StageObject {
    kind: StageKind,
    source: String,
    compiled: Option<Result<StageInterface, String>>,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<StageId>,
    active_uniforms: Option<Vec<Variable>>,
    validated: bool,
    info_log: String,
}

#[derive(Debug)]
struct State {
    last_id: u32,
    programs: HashMap<ProgramId, ProgramObject>,
    stages: HashMap<StageId, StageObject>,
    current: Option<ProgramId>,
    executable: bool,
    object_limit: Option<usize>,
    compile_calls: usize,
    invalid_operations: usize,
    uniform_values: HashMap<(ProgramId, i32), Uniform>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            last_id: 0,
            programs: HashMap::new(),
            stages: HashMap::new(),
            current: None,
            executable: true,
            object_limit: None,
            compile_calls: 0,
            invalid_operations: 0,
            uniform_values: HashMap::new(),
        }
    }
}

impl State {
    fn allocate(&mut self) -> Result<NonZeroU32, HeadlessError> {
        if let Some(limit) = self.object_limit {
            if self.programs.len() + self.stages.len() >= limit {
                return Err(HeadlessError::ObjectLimit(limit));
            }
        }
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or(HeadlessError::Exhausted)?;
        NonZeroU32::new(self.last_id).ok_or(HeadlessError::Exhausted)
    }

    fn invalid(&mut self, what: &str) {
        tracing::warn!(target: "headless", "Invalid operation: {}", what);
        self.invalid_operations += 1;
    }
}

/// Cheaply clonable handle; clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct HeadlessContext {
    state: Rc<RefCell<State>>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a context state in which linked programs cannot execute, so validation fails.
    pub fn set_executable(&self, executable: bool) {
        self.state.borrow_mut().executable = executable;
    }

    /// Caps the number of simultaneously live programs and stages; allocations beyond fail.
    pub fn set_object_limit(&self, limit: Option<usize>) {
        self.state.borrow_mut().object_limit = limit;
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_stages(&self) -> usize {
        self.state.borrow().stages.len()
    }

    pub fn compile_calls(&self) -> usize {
        self.state.borrow().compile_calls
    }

    /// Number of calls made on deleted or unknown objects, or otherwise rejected.
    pub fn invalid_operations(&self) -> usize {
        self.state.borrow().invalid_operations
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current
    }

    pub fn is_program(&self, program: ProgramId) -> bool {
        self.state.borrow().programs.contains_key(&program)
    }

    pub fn uniform_value(&self, program: ProgramId, location: i32) -> Option<Uniform> {
        self.state
            .borrow()
            .uniform_values
            .get(&(program, location))
            .cloned()
    }
}

impl GraphicsContext for HeadlessContext {
    type Program = ProgramId;
    type Stage = StageId;
    type UniformLocation = i32;
    type Err = HeadlessError;

    fn create_program(&self) -> Result<Self::Program, Self::Err> {
        let mut state = self.state.borrow_mut();
        let id = ProgramId(state.allocate()?);
        state.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    fn create_stage(&self, kind: StageKind) -> Result<Self::Stage, Self::Err> {
        let mut state = self.state.borrow_mut();
        let id = StageId(state.allocate()?);
        state.stages.insert(
            id,
            StageObject {
                kind,
                source: String::new(),
                compiled: None,
            },
        );
        Ok(id)
    }

    fn set_stage_source(&self, stage: Self::Stage, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.stages.get_mut(&stage) {
            object.source = source.to_string();
        } else {
            state.invalid("source set on unknown stage");
        }
    }

    fn compile_stage(&self, stage: Self::Stage) {
        let mut state = self.state.borrow_mut();
        state.compile_calls += 1;
        if let Some(object) = state.stages.get_mut(&stage) {
            object.compiled = Some(glsl::compile(&object.source));
        } else {
            state.invalid("compile of unknown stage");
        }
    }

    fn compile_status(&self, stage: Self::Stage) -> bool {
        matches!(
            self.state.borrow().stages.get(&stage),
            Some(StageObject {
                compiled: Some(Ok(..)),
                ..
            })
        )
    }

    fn stage_info_log(&self, stage: Self::Stage) -> String {
        match self.state.borrow().stages.get(&stage) {
            Some(StageObject {
                compiled: Some(Err(log)),
                ..
            }) => log.clone(),
            _ => String::new(),
        }
    }

    fn attach_stage(&self, program: Self::Program, stage: Self::Stage) {
        let mut state = self.state.borrow_mut();
        if !state.stages.contains_key(&stage) {
            return state.invalid("attach of unknown stage");
        }
        let rejected = match state.programs.get_mut(&program) {
            Some(object) if !object.attached.contains(&stage) => {
                object.attached.push(stage);
                None
            }
            Some(..) => Some("stage attached twice"),
            None => Some("attach to unknown program"),
        };
        if let Some(what) = rejected {
            state.invalid(what);
        }
    }

    fn detach_stage(&self, program: Self::Program, stage: Self::Stage) {
        let mut state = self.state.borrow_mut();
        let rejected = match state.programs.get_mut(&program) {
            Some(object) if object.attached.contains(&stage) => {
                object.attached.retain(|s| *s != stage);
                None
            }
            Some(..) => Some("detach of a stage that is not attached"),
            None => Some("detach from unknown program"),
        };
        if let Some(what) = rejected {
            state.invalid(what);
        }
    }

    fn link_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        if !state.programs.contains_key(&program) {
            return state.invalid("link of unknown program");
        }
        let result = {
            let object = &state.programs[&program];
            let stage = |kind: StageKind| {
                object
                    .attached
                    .iter()
                    .filter_map(|id| state.stages.get(id))
                    .find(|stage| stage.kind == kind)
            };
            match (stage(StageKind::Vertex), stage(StageKind::Fragment)) {
                (Some(vertex), Some(fragment)) => match (&vertex.compiled, &fragment.compiled) {
                    (Some(Ok(vertex)), Some(Ok(fragment))) => glsl::link(vertex, fragment),
                    _ => Err("error: linking with uncompiled shader".to_string()),
                },
                (None, _) => Err("error: program lacks a vertex shader".to_string()),
                (_, None) => Err("error: program lacks a fragment shader".to_string()),
            }
        };
        if let Some(object) = state.programs.get_mut(&program) {
            object.validated = false;
            match result {
                Ok(uniforms) => {
                    object.active_uniforms = Some(uniforms);
                    object.info_log.clear();
                }
                Err(log) => {
                    object.active_uniforms = None;
                    object.info_log = log;
                }
            }
        }
    }

    fn link_status(&self, program: Self::Program) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(false, |object| object.active_uniforms.is_some())
    }

    fn validate_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        let executable = state.executable;
        if let Some(object) = state.programs.get_mut(&program) {
            let failure = if object.active_uniforms.is_none() {
                Some("error: program has not been linked successfully")
            } else if !executable {
                Some("error: program is not executable in the current context state")
            } else {
                None
            };
            object.validated = failure.is_none();
            if let Some(log) = failure {
                object.info_log = log.to_string();
            }
        } else {
            state.invalid("validation of unknown program");
        }
    }

    fn validate_status(&self, program: Self::Program) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(false, |object| object.validated)
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.info_log.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        let state = self.state.borrow();
        let uniforms = state.programs.get(&program)?.active_uniforms.as_ref()?;
        uniforms
            .iter()
            .position(|uniform| uniform.name == name)
            .map(|index| index as i32)
    }

    fn use_program(&self, program: Option<Self::Program>) {
        let mut state = self.state.borrow_mut();
        let Some(id) = program else {
            state.current = None;
            return;
        };
        let linked = state
            .programs
            .get(&id)
            .map(|object| object.active_uniforms.is_some());
        match linked {
            Some(true) => state.current = Some(id),
            Some(false) => state.invalid("use of a program that is not linked"),
            None => state.invalid("use of unknown program"),
        }
    }

    fn set_uniform(&self, location: Self::UniformLocation, value: &Uniform) {
        let mut state = self.state.borrow_mut();
        let Some(current) = state.current else {
            return state.invalid("uniform set without a current program");
        };
        let declared = state
            .programs
            .get(&current)
            .and_then(|object| object.active_uniforms.as_ref())
            .and_then(|uniforms| uniforms.get(usize::try_from(location).ok()?))
            .map(|uniform| uniform.ty.clone());
        match declared {
            Some(ty) if ty == value.glsl_type() => {
                state.uniform_values.insert((current, location), value.clone());
            }
            Some(..) => state.invalid("uniform value does not match the declared type"),
            None => state.invalid("uniform set at an inactive location"),
        }
    }

    fn delete_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program).is_none() {
            return state.invalid("delete of unknown program");
        }
        if state.current == Some(program) {
            state.current = None;
        }
        state.uniform_values.retain(|(id, _), _| *id != program);
    }

    fn delete_stage(&self, stage: Self::Stage) {
        let mut state = self.state.borrow_mut();
        if state.stages.remove(&stage).is_none() {
            state.invalid("delete of unknown stage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_across_kinds() {
        let gc = HeadlessContext::new();
        let program = gc.create_program().unwrap();
        let stage = gc.create_stage(StageKind::Vertex).unwrap();
        assert_ne!(program.0, stage.0);
        assert_eq!((gc.live_programs(), gc.live_stages()), (1, 1));
    }

    #[test]
    fn object_limit() {
        let gc = HeadlessContext::new();
        gc.set_object_limit(Some(1));
        let _program = gc.create_program().unwrap();
        assert_eq!(
            gc.create_stage(StageKind::Fragment),
            Err(HeadlessError::ObjectLimit(1))
        );
    }

    #[test]
    fn deleting_twice_is_invalid() {
        let gc = HeadlessContext::new();
        let stage = gc.create_stage(StageKind::Vertex).unwrap();
        gc.delete_stage(stage);
        gc.delete_stage(stage);
        assert_eq!(gc.invalid_operations(), 1);
    }

    #[test]
    fn compile_failure_keeps_log() {
        let gc = HeadlessContext::new();
        let stage = gc.create_stage(StageKind::Vertex).unwrap();
        gc.set_stage_source(stage, "void main() { x = 1; }");
        gc.compile_stage(stage);
        assert!(!gc.compile_status(stage));
        assert!(gc.stage_info_log(stage).contains("`x' undeclared"));
        assert_eq!(gc.compile_calls(), 1);
    }

    #[test]
    fn link_requires_both_stages() {
        let gc = HeadlessContext::new();
        let program = gc.create_program().unwrap();
        let stage = gc.create_stage(StageKind::Vertex).unwrap();
        gc.set_stage_source(stage, "void main() {}");
        gc.compile_stage(stage);
        gc.attach_stage(program, stage);
        gc.link_program(program);
        assert!(!gc.link_status(program));
        assert_eq!(
            gc.program_info_log(program),
            "error: program lacks a fragment shader"
        );
    }
}
