// rf-core/src/units.rs

use uom::si::f64::AngularVelocity as UomAngularVelocity;

pub type AngularVelocity = UomAngularVelocity;

#[inline]
pub fn rpm(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::revolution_per_minute;
    AngularVelocity::new::<revolution_per_minute>(v)
}

#[inline]
pub fn rad_per_s(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

/// Angular speed in rad/s, the value the frame kinematics work with.
#[inline]
pub fn to_rad_per_s(w: AngularVelocity) -> f64 {
    use uom::si::angular_velocity::radian_per_second;
    w.get::<radian_per_second>()
}
