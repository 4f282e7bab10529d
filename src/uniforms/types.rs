//! Semantic uniform types and the closed set of values they accept.

use std::fmt;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Semantic type of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    /// Fixed-capacity float array (capacity in scalars)
    FloatArray(usize),
    /// Fixed-capacity int array (capacity in scalars)
    IntArray(usize),
    /// Sampled 2D texture, bound as a GPU resource rather than a value
    Texture,
}

impl UniformType {
    /// Whether `value` may be assigned to a uniform of this type.
    /// Arrays accept any length; excess elements are truncated when packed.
    pub fn accepts(&self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (UniformType::Float, UniformValue::Float(_))
                | (UniformType::Int, UniformValue::Int(_))
                | (UniformType::UInt, UniformValue::UInt(_))
                | (UniformType::Vec2, UniformValue::Vec2(_))
                | (UniformType::Vec3, UniformValue::Vec3(_))
                | (UniformType::Vec4, UniformValue::Vec4(_))
                | (UniformType::Mat3, UniformValue::Mat3(_))
                | (UniformType::Mat4, UniformValue::Mat4(_))
                | (UniformType::FloatArray(_), UniformValue::FloatArray(_))
                | (UniformType::IntArray(_), UniformValue::IntArray(_))
                | (UniformType::Texture, UniformValue::Texture(_))
        )
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, UniformType::Texture)
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformType::Float => write!(f, "f32"),
            UniformType::Int => write!(f, "i32"),
            UniformType::UInt => write!(f, "u32"),
            UniformType::Vec2 => write!(f, "vec2<f32>"),
            UniformType::Vec3 => write!(f, "vec3<f32>"),
            UniformType::Vec4 => write!(f, "vec4<f32>"),
            UniformType::Mat3 => write!(f, "mat3x3<f32>"),
            UniformType::Mat4 => write!(f, "mat4x4<f32>"),
            UniformType::FloatArray(n) => write!(f, "f32[{}]", n),
            UniformType::IntArray(n) => write!(f, "i32[{}]", n),
            UniformType::Texture => write!(f, "texture_2d<f32>"),
        }
    }
}

/// Texture a module samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureBinding {
    /// The module's own output from the previous tick
    PreviousFrame,
    /// 1x1 opaque black
    Blank,
}

/// A uniform value. Closed so binding is an exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
    Texture(TextureBinding),
}

impl UniformValue {
    /// Type this value declares when used as a contract default
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::UInt(_) => UniformType::UInt,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
            UniformValue::FloatArray(v) => UniformType::FloatArray(v.len()),
            UniformValue::IntArray(v) => UniformType::IntArray(v.len()),
            UniformValue::Texture(_) => UniformType::Texture,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::UInt(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        UniformValue::FloatArray(v)
    }
}

impl From<Vec<i32>> for UniformValue {
    fn from(v: Vec<i32>) -> Self {
        UniformValue::IntArray(v)
    }
}

impl From<TextureBinding> for UniformValue {
    fn from(v: TextureBinding) -> Self {
        UniformValue::Texture(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_types_accept_any_length() {
        let ty = UniformType::FloatArray(4);
        assert!(ty.accepts(&UniformValue::FloatArray(vec![0.0; 9])));
        assert!(!ty.accepts(&UniformValue::IntArray(vec![0; 4])));
    }

    #[test]
    fn test_scalar_types_are_strict() {
        assert!(!UniformType::Float.accepts(&UniformValue::Int(1)));
        assert!(!UniformType::Vec3.accepts(&UniformValue::Vec4(Vec4::ONE)));
        assert!(UniformType::Mat3.accepts(&Mat3::IDENTITY.into()));
    }

    #[test]
    fn test_default_declares_array_capacity() {
        let value: UniformValue = vec![0.0f32; 16].into();
        assert_eq!(value.uniform_type(), UniformType::FloatArray(16));
    }
}
