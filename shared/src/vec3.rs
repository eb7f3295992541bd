/// 3D vector utilities for the arcade stage.
/// The stage is viewed from the front: x runs left to right, y bottom to top, z toward the camera.

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Shorthand constructor matching TypeScript vec3()
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Vector length
pub fn length(v: Vec3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Add two vectors
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

/// Euclidean distance between two points.
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    length(sub(a, b))
}

/// Distance in the x-y (screen) plane, ignoring depth.
/// Spikes travel along the floor plane and are judged against the player silhouette.
pub fn planar_distance(a: Vec3, b: Vec3) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "Expected {} to be close to {}",
            actual,
            expected
        );
    }

    #[test]
    fn vec3_creates_vector() {
        let v = vec3(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn length_of_3_4_0_is_5() {
        assert_eq!(length(vec3(3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn add_and_sub_are_inverse() {
        let a = vec3(1.0, -2.0, 0.5);
        let b = vec3(0.25, 4.0, -1.0);
        assert_eq!(sub(add(a, b), b), a);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(0.0, 3.0, 4.0);
        assert_close(distance(a, b), 5.0);
        assert_close(distance(b, a), 5.0);
    }

    #[test]
    fn planar_distance_ignores_depth() {
        let a = vec3(0.0, 0.0, -10.0);
        let b = vec3(3.0, 4.0, 10.0);
        assert_close(planar_distance(a, b), 5.0);
    }

    #[test]
    fn nan_component_is_not_finite() {
        assert!(vec3(0.0, 1.0, 2.0).is_finite());
        assert!(!vec3(f64::NAN, 1.0, 2.0).is_finite());
        assert!(!vec3(0.0, f64::INFINITY, 2.0).is_finite());
    }
}
