use std::{env, fs::File, io::BufWriter, path::PathBuf};

use gl_generator::{Api, Fallbacks, Profile, Registry, StructGenerator};

fn main() {
    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let mut file = BufWriter::new(
        File::create(dest.join("bindings.rs")).expect("Cannot create GL bindings file"),
    );

    Registry::new(Api::Gl, (3, 3), Profile::Core, Fallbacks::All, ["GL_KHR_debug"])
        .write_bindings(StructGenerator, &mut file)
        .expect("Cannot write GL bindings");
}
