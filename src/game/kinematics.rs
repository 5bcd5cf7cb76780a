//! Closed-form motion used by the simulators.
//!
//! Positions are always a function of elapsed time since spawn, never of the
//! previous tick's value, so a skipped or repeated tick cannot drift them.

/// Stateless motion helpers
pub struct Kinematics;

impl Kinematics {
    /// Height of a pickup falling under `gravity` after `elapsed` seconds
    pub fn fall(spawn_y: f64, gravity: f64, elapsed: f64) -> f64 {
        spawn_y - 0.5 * gravity * elapsed
    }

    /// Coordinate of an object scrolling toward negative x at `speed` units/s
    pub fn scroll(spawn: f64, speed: f64, elapsed: f64) -> f64 {
        spawn - speed * elapsed
    }

    /// Euclidean distance between two points
    pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
        let dx = a.0 - b.0;
        let dy = a.1 - b.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Strict proximity check (`distance < radius`)
    pub fn within(a: (f64, f64), b: (f64, f64), radius: f64) -> bool {
        Self::distance(a, b) < radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fall_is_idempotent_in_elapsed_time() {
        let once = Kinematics::fall(1.0, 0.02, 3.0);
        let again = Kinematics::fall(1.0, 0.02, 3.0);
        assert_eq!(once, again);
        assert!((once - 0.97).abs() < 1e-9);
    }

    #[test]
    fn scroll_moves_toward_negative_x() {
        assert!((Kinematics::scroll(2.5, 0.01, 100.0) - 1.5).abs() < 1e-9);
        assert_eq!(Kinematics::scroll(1280.0, 150.0, 0.0), 1280.0);
    }

    #[test]
    fn within_is_strict() {
        assert!(Kinematics::within((0.0, 0.0), (0.1, 0.0), 0.2));
        assert!(!Kinematics::within((0.0, 0.0), (3.0, 4.0), 5.0));
        assert_eq!(Kinematics::distance((0.0, 0.0), (3.0, 4.0)), 5.0);
    }
}
