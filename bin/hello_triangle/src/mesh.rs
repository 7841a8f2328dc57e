use std::{mem::size_of, num::NonZeroU32};

use eyre::{eyre, Result};
use glam::Vec3;
use glint_gl::{gl, GlContext};

/// Indexed triangle mesh with a single `vec3` position attribute at location 0.
#[derive(Debug)]
pub struct Mesh {
    gc: GlContext,
    array: NonZeroU32,
    vertices: NonZeroU32,
    indices: NonZeroU32,
    count: i32,
}

/// Object names as generated, or `None` when the driver handed out a null name for any of them.
fn object_names(array: u32, buffers: [u32; 2]) -> Option<(NonZeroU32, NonZeroU32, NonZeroU32)> {
    Some((
        NonZeroU32::new(array)?,
        NonZeroU32::new(buffers[0])?,
        NonZeroU32::new(buffers[1])?,
    ))
}

impl Mesh {
    pub fn new(gc: &GlContext, vertices: &[Vec3], indices: &[u32]) -> Result<Self> {
        let gl = gc.raw();
        let mut raw_array = 0;
        let mut raw_buffers = [0u32; 2];
        unsafe {
            gl.GenVertexArrays(1, &mut raw_array);
            gl.GenBuffers(2, raw_buffers.as_mut_ptr());
        }
        let Some((array, vertex_buffer, index_buffer)) = object_names(raw_array, raw_buffers) else {
            // Deleting the name 0 is ignored, so whatever was generated gets released.
            unsafe {
                gl.DeleteBuffers(2, raw_buffers.as_ptr());
                gl.DeleteVertexArrays(1, &raw_array);
            }
            return Err(eyre!("Cannot create mesh objects"));
        };
        let this = Self {
            gc: gc.clone(),
            array,
            vertices: vertex_buffer,
            indices: index_buffer,
            count: indices.len() as _,
        };

        let vertex_data: &[u8] = bytemuck::cast_slice(vertices);
        let index_data: &[u8] = bytemuck::cast_slice(indices);
        unsafe {
            gl.BindVertexArray(array.get());
            gl.BindBuffer(gl::ARRAY_BUFFER, vertex_buffer.get());
            gl.BufferData(
                gl::ARRAY_BUFFER,
                vertex_data.len() as _,
                vertex_data.as_ptr().cast(),
                gl::STATIC_DRAW,
            );
            gl.BindBuffer(gl::ELEMENT_ARRAY_BUFFER, index_buffer.get());
            gl.BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                index_data.len() as _,
                index_data.as_ptr().cast(),
                gl::STATIC_DRAW,
            );
            gl.VertexAttribPointer(
                0,
                3,
                gl::FLOAT,
                gl::FALSE,
                size_of::<Vec3>() as _,
                std::ptr::null(),
            );
            gl.EnableVertexAttribArray(0);
            gl.BindVertexArray(0);
        }
        gc.guard()?;
        tracing::debug!(vertices=%vertices.len(), indices=%indices.len(), "Mesh uploaded");
        Ok(this)
    }

    pub fn draw(&self) {
        let gl = self.gc.raw();
        unsafe {
            gl.BindVertexArray(self.array.get());
            gl.DrawElements(gl::TRIANGLES, self.count, gl::UNSIGNED_INT, std::ptr::null());
            gl.BindVertexArray(0);
        }
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let gl = self.gc.raw();
        unsafe {
            gl.DeleteBuffers(2, [self.vertices.get(), self.indices.get()].as_ptr());
            gl.DeleteVertexArrays(1, &self.array.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_null_name_fails_creation() {
        assert!(object_names(1, [2, 3]).is_some());
        assert!(object_names(0, [2, 3]).is_none());
        assert!(object_names(1, [2, 0]).is_none());
    }
}
