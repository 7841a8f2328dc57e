use duplicate::duplicate_item;

/// Value uploaded to a uniform location. Matrices are column-major.
#[derive(Debug, Clone, PartialEq)]
pub enum Uniform {
    Int(i32),
    Uint(u32),
    Float(f32),
    Ivec2([i32; 2]),
    UIvec2([u32; 2]),
    Vec2([f32; 2]),
    Ivec3([i32; 3]),
    UIvec3([u32; 3]),
    Vec3([f32; 3]),
    Ivec4([i32; 4]),
    UIvec4([u32; 4]),
    Vec4([f32; 4]),
    Mat2([[f32; 2]; 2]),
    Mat3([[f32; 3]; 3]),
    Mat4([[f32; 4]; 4]),
}

impl Uniform {
    /// GLSL spelling of the value's type, as it would appear in a declaration.
    pub fn glsl_type(&self) -> &'static str {
        match self {
            Self::Int(..) => "int",
            Self::Uint(..) => "uint",
            Self::Float(..) => "float",
            Self::Ivec2(..) => "ivec2",
            Self::UIvec2(..) => "uvec2",
            Self::Vec2(..) => "vec2",
            Self::Ivec3(..) => "ivec3",
            Self::UIvec3(..) => "uvec3",
            Self::Vec3(..) => "vec3",
            Self::Ivec4(..) => "ivec4",
            Self::UIvec4(..) => "uvec4",
            Self::Vec4(..) => "vec4",
            Self::Mat2(..) => "mat2",
            Self::Mat3(..) => "mat3",
            Self::Mat4(..) => "mat4",
        }
    }
}

#[duplicate_item(
ty              uniform_ty;
[i32]           [Int];
[u32]           [Uint];
[f32]           [Float];
[[i32; 2]]      [Ivec2];
[[u32; 2]]      [UIvec2];
[[f32; 2]]      [Vec2];
[[i32; 3]]      [Ivec3];
[[u32; 3]]      [UIvec3];
[[f32; 3]]      [Vec3];
[[i32; 4]]      [Ivec4];
[[u32; 4]]      [UIvec4];
[[f32; 4]]      [Vec4];
[[[f32; 2]; 2]] [Mat2];
[[[f32; 3]; 3]] [Mat3];
[[[f32; 4]; 4]] [Mat4];
)]
impl From<ty> for Uniform {
    fn from(value: ty) -> Self {
        Uniform::uniform_ty(value)
    }
}

#[cfg(feature = "uniforms-glam")]
#[duplicate_item(
vec             uniform_ty;
[glam::IVec2]   [Ivec2];
[glam::UVec2]   [UIvec2];
[glam::Vec2]    [Vec2];
[glam::IVec3]   [Ivec3];
[glam::UVec3]   [UIvec3];
[glam::Vec3]    [Vec3];
[glam::IVec4]   [Ivec4];
[glam::UVec4]   [UIvec4];
[glam::Vec4]    [Vec4];
)]
impl From<vec> for Uniform {
    fn from(value: vec) -> Self {
        Uniform::uniform_ty(value.to_array())
    }
}

#[cfg(feature = "uniforms-glam")]
#[duplicate_item(
mat             mat_uniform;
[glam::Mat2]    [Mat2];
[glam::Mat3]    [Mat3];
[glam::Mat4]    [Mat4];
)]
impl From<mat> for Uniform {
    fn from(value: mat) -> Self {
        Uniform::mat_uniform(value.to_cols_array_2d())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_and_arrays() {
        assert_eq!(Uniform::from(3i32), Uniform::Int(3));
        assert_eq!(Uniform::from(1.5f32).glsl_type(), "float");
        assert_eq!(Uniform::from([1u32, 2, 3]), Uniform::UIvec3([1, 2, 3]));
    }

    #[cfg(feature = "uniforms-glam")]
    #[test]
    fn glam_matrices_are_column_major() {
        let translation = glam::Mat4::from_translation(glam::vec3(1., 2., 3.));
        let Uniform::Mat4(cols) = Uniform::from(translation) else {
            panic!("expected a mat4 uniform");
        };
        assert_eq!(cols[3], [1., 2., 3., 1.]);
    }
}
