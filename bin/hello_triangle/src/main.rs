use eyre::{Context, Result};
use glam::{vec3, Mat4, Vec3};
use glint::ShaderProgram;
use glint_gl::{gl, GlContext};
use glint_platform::{Application, PhysicalSize, RenderContext, WindowDesc};

use crate::mesh::Mesh;

mod mesh;

const VERTEX_SHADER: &str = "assets/shaders/triangle.vert.glsl";
const FRAGMENT_SHADER: &str = "assets/shaders/triangle.frag.glsl";

const VERTICES: [Vec3; 3] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.0, 0.5, 0.0),
];
const INDICES: [u32; 3] = [0, 1, 2];

fn projection(size: PhysicalSize<f32>) -> Mat4 {
    let aspect = if size.height > 0. {
        size.width / size.height
    } else {
        1.
    };
    Mat4::perspective_rh_gl(45f32.to_radians(), aspect, 0.1, 100.)
}

struct TriangleApp {
    gc: GlContext,
    program: ShaderProgram<GlContext>,
    mesh: Mesh,
    model: Mat4,
    projection: Mat4,
}

impl Application for TriangleApp {
    fn new(size: PhysicalSize<f32>, gc: &GlContext) -> Result<Self> {
        let program = ShaderProgram::from_files(gc, VERTEX_SHADER, FRAGMENT_SHADER)
            .context("Cannot build triangle program")?;
        let mesh = Mesh::new(gc, &VERTICES, &INDICES)?;
        unsafe {
            let gl = gc.raw();
            gl.Enable(gl::DEPTH_TEST);
            gl.ClearColor(0.1, 0.1, 0.1, 1.0);
        }
        Ok(Self {
            gc: gc.clone(),
            program,
            mesh,
            model: Mat4::from_translation(vec3(0., 0., -2.)),
            projection: projection(size),
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        self.projection = projection(size.cast());
        Ok(())
    }

    fn render(&mut self, _ctx: RenderContext) -> Result<()> {
        unsafe {
            self.gc
                .raw()
                .Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
        }
        self.program.bind();
        if let Some(location) = self.program.model_location() {
            self.program.set_uniform(location, self.model);
        }
        if let Some(location) = self.program.projection_location() {
            self.program.set_uniform(location, self.projection);
        }
        self.mesh.draw();
        self.program.unbind();
        self.gc.guard().context("Cannot draw triangle")?;
        Ok(())
    }
}

fn main() -> Result<()> {
    glint_platform::run::<TriangleApp>(WindowDesc::new("Hello Triangle"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_follows_aspect_ratio() {
        let wide = projection(PhysicalSize::new(1600., 800.));
        let square = projection(PhysicalSize::new(800., 800.));
        assert!((square.x_axis.x / wide.x_axis.x - 2.).abs() < 1e-5);
        assert_eq!(projection(PhysicalSize::new(800., 0.)), square);
    }
}
