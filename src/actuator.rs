//! Actuator interface
//!
//! The motor controller the gantry is built on, seen from the sequencer.
//! Implementations wrap a real driver board, or simulate one (see
//! [`crate::sim`]).

use std::fmt::{Display, Formatter};
use std::io;

/// Motor axes of the gantry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal travel, along the ranks (files a to h)
    File,
    /// Vertical travel, along the files (ranks 1 to 8)
    Rank,
    /// Raises and lowers the claw
    Lift,
    /// Opens and closes the claw. Power driven, it has no useful position
    Claw,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::File, Axis::Rank, Axis::Lift, Axis::Claw];
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Axis::File => "file",
                Axis::Rank => "rank",
                Axis::Lift => "lift",
                Axis::Claw => "claw",
            }
        )
    }
}

/// Motor controller driving the gantry.
///
/// Angles are encoder degrees. Every call may fail with an I/O error, the
/// sequencer only updates its idea of where the gantry is once a call went
/// through
pub trait Actuator {
    /// Starts moving an axis toward an absolute encoder angle
    fn set_axis_target(&mut self, axis: Axis, angle: i32) -> io::Result<()>;

    /// Current encoder angle of an axis
    fn axis_angle(&mut self, axis: Axis) -> io::Result<i32>;

    /// Drives an axis at a raw power, -100..=100. Zero stops it
    fn set_axis_power(&mut self, axis: Axis, power: i32) -> io::Result<()>;

    /// Caps the power and speed (degrees per second) used to reach targets
    fn set_axis_limits(&mut self, axis: Axis, power: i32, speed: u32) -> io::Result<()>;

    /// Shifts the encoder so that its current reading becomes `angle - offset`
    fn offset_axis_encoder(&mut self, axis: Axis, offset: i32) -> io::Result<()>;

    /// Supply voltage of the motor controller
    fn supply_voltage(&mut self) -> io::Result<f32>;

    /// Stops every motor and releases the controller
    fn reset_all(&mut self) -> io::Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn set_axis_target(&mut self, axis: Axis, angle: i32) -> io::Result<()> {
        (**self).set_axis_target(axis, angle)
    }
    fn axis_angle(&mut self, axis: Axis) -> io::Result<i32> {
        (**self).axis_angle(axis)
    }
    fn set_axis_power(&mut self, axis: Axis, power: i32) -> io::Result<()> {
        (**self).set_axis_power(axis, power)
    }
    fn set_axis_limits(&mut self, axis: Axis, power: i32, speed: u32) -> io::Result<()> {
        (**self).set_axis_limits(axis, power, speed)
    }
    fn offset_axis_encoder(&mut self, axis: Axis, offset: i32) -> io::Result<()> {
        (**self).offset_axis_encoder(axis, offset)
    }
    fn supply_voltage(&mut self) -> io::Result<f32> {
        (**self).supply_voltage()
    }
    fn reset_all(&mut self) -> io::Result<()> {
        (**self).reset_all()
    }
}
