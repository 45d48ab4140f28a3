//! Simulated motor controller
//!
//! Stands in for the driver board when there is none plugged in, and in
//! tests. Targets are reached instantly, every call is logged, and faults can
//! be injected on chosen calls.

use crate::actuator::{Actuator, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;

/// One call received by the simulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Target(Axis, i32),
    Angle(Axis),
    Power(Axis, i32),
    Limits(Axis, i32, u32),
    Offset(Axis, i32),
    Voltage,
    Reset,
}

impl Call {
    pub fn axis(&self) -> Option<Axis> {
        match *self {
            Call::Target(axis, _)
            | Call::Angle(axis)
            | Call::Power(axis, _)
            | Call::Limits(axis, ..)
            | Call::Offset(axis, _) => Some(axis),
            Call::Voltage | Call::Reset => None,
        }
    }
}

#[derive(Clone, Copy)]
enum Trigger {
    /// The n-th call, counting from 0
    At(usize),
    Matching(fn(&Call) -> bool),
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::At(n) => write!(f, "At({})", n),
            Trigger::Matching(_) => write!(f, "Matching(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    trigger: Trigger,
    persistent: bool,
}

#[derive(Debug, Clone)]
pub struct SimulatedGantry {
    readings: [i32; 4],
    powers: [i32; 4],
    limits: [(i32, u32); 4],
    volts: f32,
    calls: Vec<Call>,
    received: usize,
    faults: Vec<Fault>,
    jitter: Option<(StdRng, i32)>,
}

impl Default for SimulatedGantry {
    fn default() -> Self {
        SimulatedGantry::new()
    }
}

fn slot(axis: Axis) -> usize {
    match axis {
        Axis::File => 0,
        Axis::Rank => 1,
        Axis::Lift => 2,
        Axis::Claw => 3,
    }
}

impl SimulatedGantry {
    /// A healthy controller on a 9V supply, every encoder reading 0
    pub fn new() -> SimulatedGantry {
        SimulatedGantry {
            readings: [0; 4],
            powers: [0; 4],
            limits: [(0, 0); 4],
            volts: 9.0,
            calls: vec![],
            received: 0,
            faults: vec![],
            jitter: None,
        }
    }

    pub fn with_voltage(mut self, volts: f32) -> SimulatedGantry {
        self.volts = volts;
        self
    }

    /// Starts with encoder readings as found at power on
    pub fn with_readings(mut self, file: i32, rank: i32, lift: i32) -> SimulatedGantry {
        self.readings = [file, rank, lift, 0];
        self
    }

    /// Makes every target land up to `degrees` off, like belts slipping
    pub fn with_jitter(mut self, seed: u64, degrees: i32) -> SimulatedGantry {
        self.jitter = Some((StdRng::seed_from_u64(seed), degrees.abs()));
        self
    }

    /// The `n`-th call from now on fails, once
    pub fn fail_at(&mut self, n: usize) {
        self.faults.push(Fault {
            trigger: Trigger::At(self.received + n),
            persistent: false,
        });
    }

    /// The next call matching `filter` fails
    pub fn fail_on(&mut self, filter: fn(&Call) -> bool) {
        self.faults.push(Fault {
            trigger: Trigger::Matching(filter),
            persistent: false,
        });
    }

    /// Every call matching `filter` fails, until [`Self::repair`]
    pub fn break_on(&mut self, filter: fn(&Call) -> bool) {
        self.faults.push(Fault {
            trigger: Trigger::Matching(filter),
            persistent: true,
        });
    }

    pub fn repair(&mut self) {
        self.faults.clear();
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Encoder reading of an axis
    pub fn reading(&self, axis: Axis) -> i32 {
        self.readings[slot(axis)]
    }

    pub fn power(&self, axis: Axis) -> i32 {
        self.powers[slot(axis)]
    }

    pub fn limits(&self, axis: Axis) -> (i32, u32) {
        self.limits[slot(axis)]
    }

    fn receive(&mut self, call: Call) -> io::Result<()> {
        let index = self.received;
        self.received += 1;
        self.calls.push(call);
        let hit = self.faults.iter().position(|fault| match fault.trigger {
            Trigger::At(n) => n == index,
            Trigger::Matching(filter) => filter(&call),
        });
        match hit {
            Some(i) => {
                if !self.faults[i].persistent {
                    self.faults.remove(i);
                }
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("simulated fault on {:?}", call),
                ))
            }
            None => Ok(()),
        }
    }
}

impl Actuator for SimulatedGantry {
    fn set_axis_target(&mut self, axis: Axis, angle: i32) -> io::Result<()> {
        self.receive(Call::Target(axis, angle))?;
        let slip = match &mut self.jitter {
            Some((rng, degrees)) if *degrees > 0 => rng.gen_range(-*degrees..=*degrees),
            _ => 0,
        };
        self.readings[slot(axis)] = angle + slip;
        Ok(())
    }

    fn axis_angle(&mut self, axis: Axis) -> io::Result<i32> {
        self.receive(Call::Angle(axis))?;
        Ok(self.readings[slot(axis)])
    }

    fn set_axis_power(&mut self, axis: Axis, power: i32) -> io::Result<()> {
        self.receive(Call::Power(axis, power))?;
        self.powers[slot(axis)] = power.clamp(-100, 100);
        Ok(())
    }

    fn set_axis_limits(&mut self, axis: Axis, power: i32, speed: u32) -> io::Result<()> {
        self.receive(Call::Limits(axis, power, speed))?;
        self.limits[slot(axis)] = (power, speed);
        Ok(())
    }

    fn offset_axis_encoder(&mut self, axis: Axis, offset: i32) -> io::Result<()> {
        self.receive(Call::Offset(axis, offset))?;
        self.readings[slot(axis)] -= offset;
        Ok(())
    }

    fn supply_voltage(&mut self) -> io::Result<f32> {
        self.receive(Call::Voltage)?;
        Ok(self.volts)
    }

    fn reset_all(&mut self) -> io::Result<()> {
        self.receive(Call::Reset)?;
        self.powers = [0; 4];
        Ok(())
    }
}
