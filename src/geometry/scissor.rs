//! Box scissoring with repetition
//!
//! A wrapping layer repeats its bounding box infinitely along the wrapped
//! axes. Rendering it only needs the repetitions that can touch the camera:
//! this module computes that integer range `[start_instance, last_instance)`
//! per axis.

use glam::{IVec2, Vec2};

use super::Aabb;

/// Which repetitions of `target_box` overlap `scissor_box`
#[derive(Debug, Clone, PartialEq)]
pub struct BoxScissoring {
    pub target_box: Aabb,
    pub scissor_box: Aabb,
    pub wrap_x: bool,
    pub wrap_y: bool,
    /// First repetition index (inclusive)
    pub start_instance: IVec2,
    /// Last repetition index (exclusive)
    pub last_instance: IVec2,
}

impl BoxScissoring {
    pub fn new(target_box: Aabb, scissor_box: Aabb, wrap_x: bool, wrap_y: bool) -> Self {
        let mut result = Self {
            target_box,
            scissor_box,
            wrap_x,
            wrap_y,
            start_instance: IVec2::ZERO,
            last_instance: IVec2::ZERO,
        };
        if target_box.is_empty() || scissor_box.is_empty() {
            return result;
        }

        let target_min = target_box.min();
        let target_max = target_box.max();
        let target_size = target_box.size();
        let scissor_min = scissor_box.min();
        let scissor_max = scissor_box.max();

        let x = axis_range(
            wrap_x,
            target_min.x,
            target_max.x,
            target_size.x,
            scissor_min.x,
            scissor_max.x,
        );
        let y = axis_range(
            wrap_y,
            target_min.y,
            target_max.y,
            target_size.y,
            scissor_min.y,
            scissor_max.y,
        );

        // A rejected axis rejects the whole draw
        if x.0 >= x.1 || y.0 >= y.1 {
            return result;
        }
        result.start_instance = IVec2::new(x.0, y.0);
        result.last_instance = IVec2::new(x.1, y.1);
        result
    }

    /// True when no repetition needs to be drawn
    pub fn is_empty(&self) -> bool {
        self.last_instance.x <= self.start_instance.x
            || self.last_instance.y <= self.start_instance.y
    }

    /// Number of repetitions along each axis
    pub fn repetition_count(&self) -> IVec2 {
        (self.last_instance - self.start_instance).max(IVec2::ZERO)
    }

    /// Translation to apply to the target box for repetition `index`
    #[inline]
    pub fn instance_offset(&self, index: IVec2) -> Vec2 {
        2.0 * self.target_box.half_size * index.as_vec2()
    }

    /// All repetition indices, row by row
    pub fn instances(&self) -> impl Iterator<Item = IVec2> + '_ {
        let (start, last) = if self.is_empty() {
            (IVec2::ZERO, IVec2::ZERO)
        } else {
            (self.start_instance, self.last_instance)
        };
        (start.y..last.y).flat_map(move |y| (start.x..last.x).map(move |x| IVec2::new(x, y)))
    }
}

/// Repetition range `[start, last)` along one axis
fn axis_range(
    wrap: bool,
    target_min: f32,
    target_max: f32,
    target_size: f32,
    scissor_min: f32,
    scissor_max: f32,
) -> (i32, i32) {
    if !wrap {
        if target_min < scissor_max && scissor_min < target_max {
            return (0, 1);
        }
        return (0, 0);
    }
    // Whole widths needed to bring the pattern just left of the scissor box
    let offset_count = ((scissor_min - target_min) / target_size).floor();
    // Widths needed from there to cover the scissor box entirely
    let shifted_min = target_min + offset_count * target_size;
    let repetition_count = ((scissor_max - shifted_min) / target_size).ceil();

    let start = offset_count as i32;
    (start, start + repetition_count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tile(w: f32, h: f32) -> Aabb {
        Aabb::from_corners(Vec2::ZERO, Vec2::new(w, h))
    }

    #[test]
    fn test_three_repetitions_along_x() {
        let (w, h) = (32.0, 16.0);
        let scissor = Aabb::from_corners(Vec2::ZERO, Vec2::new(3.0 * w, h));
        let result = BoxScissoring::new(tile(w, h), scissor, true, false);

        assert_eq!(result.repetition_count(), IVec2::new(3, 1));
        for i in result.start_instance.x..result.last_instance.x {
            assert_eq!(
                result.instance_offset(IVec2::new(i, 0)),
                Vec2::new(i as f32 * w, 0.0)
            );
        }
        assert_eq!(result.instances().count(), 3);
    }

    #[test]
    fn test_partial_overlap_is_kept() {
        // Scissor from 0.5w to 2.5w touches instances 0, 1 and 2
        let scissor = Aabb::from_corners(Vec2::new(5.0, 0.0), Vec2::new(25.0, 10.0));
        let result = BoxScissoring::new(tile(10.0, 10.0), scissor, true, false);
        assert_eq!(result.start_instance.x, 0);
        assert_eq!(result.last_instance.x, 3);
    }

    #[test]
    fn test_negative_repetitions() {
        let scissor = Aabb::from_corners(Vec2::new(-25.0, -25.0), Vec2::new(-5.0, -5.0));
        let result = BoxScissoring::new(tile(10.0, 10.0), scissor, true, true);
        assert_eq!(result.start_instance, IVec2::new(-3, -3));
        assert_eq!(result.last_instance, IVec2::new(0, 0));
        assert_eq!(result.instances().count(), 9);
    }

    #[test]
    fn test_non_wrapping_rejects_when_outside() {
        let scissor = Aabb::from_corners(Vec2::new(100.0, 0.0), Vec2::new(120.0, 10.0));
        let result = BoxScissoring::new(tile(10.0, 10.0), scissor, false, true);
        assert!(result.is_empty());
        assert_eq!(result.instances().count(), 0);
    }

    #[test]
    fn test_empty_boxes_reject() {
        let scissor = Aabb::from_corners(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert!(BoxScissoring::new(Aabb::EMPTY, scissor, true, true).is_empty());
        assert!(BoxScissoring::new(tile(10.0, 10.0), Aabb::EMPTY, true, true).is_empty());
    }

    proptest! {
        #[test]
        fn prop_wrapped_range_is_exact(
            tmin in -500i32..500,
            tsize in 1i32..64,
            smin in -2000i32..2000,
            ssize in 1i32..400,
        ) {
            let target = Aabb::from_min_size(
                Vec2::new(tmin as f32, 0.0),
                Vec2::new(tsize as f32, 8.0),
            );
            let scissor = Aabb::from_min_size(
                Vec2::new(smin as f32, 0.0),
                Vec2::new(ssize as f32, 8.0),
            );
            let result = BoxScissoring::new(target, scissor, true, false);
            prop_assert!(!result.is_empty());

            let overlaps = |i: i32| {
                let repeated = target.translated(result.instance_offset(IVec2::new(i, 0)));
                repeated.intersects(&scissor)
            };
            for i in result.start_instance.x..result.last_instance.x {
                prop_assert!(overlaps(i), "instance {} should overlap", i);
            }
            prop_assert!(!overlaps(result.start_instance.x - 1));
            prop_assert!(!overlaps(result.last_instance.x));
        }
    }
}
