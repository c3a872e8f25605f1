//! Per-draw uniform values and render parameters

use glam::{Vec2, Vec4};

use crate::geometry::Aabb;

/// Uniform holding the camera box as `(center, half_size)`
pub const CAMERA_BOX: &str = "camera_box";
/// Uniform holding the translation applied to every vertex of a draw
pub const OFFSET: &str = "offset";
/// Uniform holding a color multiplier
pub const TINT: &str = "tint";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec4(Vec4),
}

/// Named uniform values handed to the render device with each draw
///
/// Layers derive a child provider with [`UniformProvider::with`] so that
/// overrides never leak back into the caller's values.
#[derive(Debug, Clone, Default)]
pub struct UniformProvider {
    values: Vec<(&'static str, UniformValue)>,
}

impl UniformProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a value
    pub fn set(&mut self, name: &'static str, value: UniformValue) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Copy of this provider with one more value
    pub fn with(&self, name: &'static str, value: UniformValue) -> Self {
        let mut result = self.clone();
        result.set(name, value);
        result
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn get_vec2(&self, name: &str) -> Option<Vec2> {
        match self.get(name)? {
            UniformValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_vec4(&self, name: &str) -> Option<Vec4> {
        match self.get(name)? {
            UniformValue::Vec4(v) => Some(v),
            _ => None,
        }
    }
}

/// Per-frame rendering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// Camera box this frame (world space)
    pub camera_box: Aabb,
    /// Camera box when the level started, the parallax origin
    pub initial_camera_box: Aabb,
    /// Translations for repeated draws. Empty means one draw at the origin.
    pub instance_offsets: Vec<Vec2>,
}

impl RenderParams {
    pub fn new(camera_box: Aabb) -> Self {
        Self {
            camera_box,
            initial_camera_box: camera_box,
            instance_offsets: Vec::new(),
        }
    }

    pub fn with_initial_camera(mut self, initial_camera_box: Aabb) -> Self {
        self.initial_camera_box = initial_camera_box;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_does_not_touch_parent() {
        let mut parent = UniformProvider::new();
        parent.set(OFFSET, UniformValue::Vec2(Vec2::ONE));
        let child = parent.with(OFFSET, UniformValue::Vec2(Vec2::new(5.0, 0.0)));

        assert_eq!(parent.get_vec2(OFFSET), Some(Vec2::ONE));
        assert_eq!(child.get_vec2(OFFSET), Some(Vec2::new(5.0, 0.0)));
        assert_eq!(child.get_vec4(OFFSET), None);
        assert_eq!(child.get(TINT), None);
    }
}
