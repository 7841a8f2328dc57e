//! OpenGL 3.3 core bindings, loaded into a [`Gl`] struct of function pointers.
#![allow(clippy::all, non_camel_case_types, non_snake_case, non_upper_case_globals, unused)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
