//! Actuator sequencing
//!
//! Plays a plan on the gantry, one action after the other. The sequencer owns
//! the actuator for as long as it lives, so nothing else can move the arm
//! while a plan runs.

use crate::actuator::{Actuator, Axis};
use crate::clock::Clock;
use crate::config::{ConfigError, GantryConfig};
use crate::error::{ActuatorFault, SequenceError};
use crate::planner::{Action, Point};
use std::io;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where the sequencer believes the gantry is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GantryState {
    pub position: Point,
    pub claw_closed: bool,
    pub lift_up: bool,
    /// False until the encoders were zeroed against the home square, and
    /// again after a recovery that failed
    pub homed: bool,
}

/// What the sequencer is busy with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Taking a captured piece off the board
    Removing,
    /// Carrying the moving piece
    Transporting,
    /// Carrying the rook of a castle
    TransportingRook,
    /// Taking off a pawn captured en passant
    RemovingPawn,
    /// Back to the home square
    Homing,
}

impl Phase {
    /// Phase entered when `action` starts. Plans come out of the planner in a
    /// fixed order, so the position of an action in the plan tells its role
    pub fn next(self, action: &Action) -> Phase {
        use Phase::*;

        match (self, action) {
            (Idle, Action::Remove { .. }) => Removing,
            (Idle | Removing, Action::Transport { .. }) => Transporting,
            (Transporting, Action::Transport { .. }) => TransportingRook,
            (Transporting | TransportingRook, Action::Remove { .. }) => RemovingPawn,
            (phase, _) => phase,
        }
    }
}

pub use crate::clock::AbortHandle;

/// Summary of a plan that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceReport {
    pub actions: usize,
    /// Time spent waiting on motions, home run included
    pub duration: Duration,
}

/// Why a step stopped
enum Halt {
    Fault(ActuatorFault),
    Aborted,
}

impl From<ActuatorFault> for Halt {
    fn from(fault: ActuatorFault) -> Self {
        Halt::Fault(fault)
    }
}

fn fault(axis: impl Into<Option<Axis>>, operation: &'static str) -> impl FnOnce(io::Error) -> ActuatorFault {
    let axis = axis.into();
    move |source| ActuatorFault::new(axis, operation, source)
}

pub struct Sequencer<A: Actuator, C: Clock> {
    actuator: A,
    clock: C,
    config: GantryConfig,
    home: Point,
    state: GantryState,
    lift_angle: i32,
    phase: Phase,
    /// Target of a travel that was cut short, the carriage stopped somewhere
    /// between `state.position` and it
    in_transit: Option<Point>,
    abort: AbortHandle,
    recovering: bool,
    elapsed: Duration,
}

impl<A: Actuator, C: Clock> Sequencer<A, C> {
    /// The gantry is expected to sit on the home square, claw open and fully
    /// raised, as it is left at power off. Fails on settings no motion can be
    /// timed with
    pub fn new(actuator: A, clock: C, config: GantryConfig) -> Result<Sequencer<A, C>, ConfigError> {
        config.validate()?;
        let home = Point::from(config.home_square());
        Ok(Sequencer {
            actuator,
            clock,
            config,
            home,
            state: GantryState {
                position: home,
                claw_closed: false,
                lift_up: true,
                homed: false,
            },
            lift_angle: 0,
            phase: Phase::Idle,
            in_transit: None,
            abort: AbortHandle::default(),
            recovering: false,
            elapsed: Duration::ZERO,
        })
    }

    pub fn state(&self) -> GantryState {
        self.state
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn home(&self) -> Point {
        self.home
    }
    pub fn config(&self) -> &GantryConfig {
        &self.config
    }
    pub fn actuator(&self) -> &A {
        &self.actuator
    }
    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }
    pub fn clock(&self) -> &C {
        &self.clock
    }
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Shares an abort handle created elsewhere, e.g. before the sequencer
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Sequencer<A, C> {
        self.abort = abort;
        self
    }

    /// Sets the motor limits and zeroes the encoders, the gantry standing on
    /// its home square
    pub fn initialize(&mut self) -> Result<(), ActuatorFault> {
        let g = &self.config;
        for axis in [Axis::File, Axis::Rank] {
            self.actuator
                .set_axis_limits(axis, g.travel_power, g.travel_speed)
                .map_err(fault(axis, "set limits"))?;
        }
        self.actuator
            .set_axis_limits(Axis::Lift, g.lift_power, g.lift_speed)
            .map_err(fault(Axis::Lift, "set limits"))?;
        self.rehome()?;
        info!("gantry initialized at {}", self.home);
        Ok(())
    }

    /// Refuses to run below `minimum` volts
    pub fn check_supply(&mut self, minimum: f32) -> Result<f32, SequenceError> {
        let volts = self.actuator.supply_voltage().map_err(|source| SequenceError::Fault {
            fault: ActuatorFault::new(None, "read voltage", source),
            action: None,
            recovered: true,
        })?;
        if volts < minimum {
            warn!("supply at {:.2}V, below {:.2}V", volts, minimum);
            if let Err(e) = self.actuator.reset_all() {
                warn!("could not release the motors: {}", e);
            }
            return Err(SequenceError::LowVoltage { volts, minimum });
        }
        debug!("supply at {:.2}V", volts);
        Ok(volts)
    }

    /// Runs a plan, then brings the gantry back home and re-zeroes it.
    ///
    /// On a fault the rest of the plan is dropped and the gantry is sent home
    /// through [`Self::emergency_rehome`]. An abort does the same, releasing
    /// the claw first if it holds a piece. Either way the sequencer is idle
    /// again when this returns
    pub fn execute(&mut self, actions: &[Action]) -> Result<SequenceReport, SequenceError> {
        self.abort.reset();
        let started = self.elapsed;

        for action in actions {
            self.phase = self.phase.next(action);
            info!(phase = ?self.phase, "{}", action);
            match self.run(action) {
                Ok(()) => {}
                Err(halt) => return Err(self.halt(halt, Some(*action))),
            }
        }

        self.phase = Phase::Homing;
        let homing = self
            .goto(self.home)
            .and_then(|_| self.rehome().map_err(Halt::from));
        if let Err(halt) = homing {
            return Err(self.halt(halt, None));
        }
        self.phase = Phase::Idle;

        Ok(SequenceReport {
            actions: actions.len(),
            duration: self.elapsed - started,
        })
    }

    fn run(&mut self, action: &Action) -> Result<(), Halt> {
        let (from, to, lift) = action.path();
        let depth = self.config.grip_depth(action.piece().piece_type.height());

        self.goto(from)?;
        self.lower(depth)?;
        self.close_claw()?;
        if lift {
            self.raise()?;
        }
        self.goto(to)?;
        if lift {
            self.lower(depth)?;
        }
        self.open_claw()?;
        self.raise()
    }

    fn halt(&mut self, halt: Halt, action: Option<Action>) -> SequenceError {
        match halt {
            Halt::Fault(fault) => {
                error!("{} during {:?}, aborting the plan", fault, action);
                let recovered = self.emergency_rehome();
                SequenceError::Fault {
                    fault,
                    action,
                    recovered,
                }
            }
            Halt::Aborted => {
                let at = self.state.position;
                let piece_in_claw = self.state.claw_closed;
                if piece_in_claw {
                    warn!("aborted with a piece in the claw, it is released at {}", at);
                } else {
                    warn!("aborted at {}", at);
                }
                let recovered = self.emergency_rehome();
                SequenceError::Interrupted {
                    action,
                    piece_in_claw,
                    at,
                    recovered,
                }
            }
        }
    }

    /// Stops everything, lets go of any piece and goes home.
    /// Returns false if the gantry could not be brought home, in which case
    /// the controller is reset and the gantry has to be homed by hand
    pub fn emergency_rehome(&mut self) -> bool {
        warn!("emergency re-home from {}", self.state.position);
        for axis in [Axis::File, Axis::Rank, Axis::Lift, Axis::Claw] {
            if let Err(e) = self.actuator.set_axis_power(axis, 0) {
                warn!("could not stop {} axis: {}", axis, e);
            }
        }

        self.recovering = true;
        let recovery = (|| -> Result<(), Halt> {
            if self.state.claw_closed {
                self.open_claw()?;
            }
            self.raise()?;
            self.goto(self.home)?;
            self.rehome()?;
            Ok(())
        })();
        self.recovering = false;

        self.phase = Phase::Idle;
        match recovery {
            Ok(()) => true,
            Err(Halt::Fault(f)) => {
                error!("emergency re-home failed: {}", f);
                if let Err(e) = self.actuator.reset_all() {
                    error!("controller reset failed: {}", e);
                }
                self.state.homed = false;
                false
            }
            Err(Halt::Aborted) => false,
        }
    }

    /// Plans can be aborted while they run, never while recovering
    fn abortable(&self) -> bool {
        !self.recovering && self.phase != Phase::Idle
    }

    fn checkpoint(&self) -> Result<(), Halt> {
        if self.abortable() && self.abort.is_triggered() {
            Err(Halt::Aborted)
        } else {
            Ok(())
        }
    }

    /// Waits for a motion to finish. Returns false if the abort cut it short
    fn wait(&mut self, duration: Duration) -> bool {
        self.elapsed += duration;
        if self.abortable() {
            self.clock.sleep_unless(duration, &self.abort)
        } else {
            self.clock.sleep(duration);
            true
        }
    }

    fn wait_through(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.clock.sleep(duration);
    }

    /// Moves the gantry to a point. Both axes travel at once and are timed to
    /// arrive together, the whole move taking `seconds_per_square` per
    /// Chebyshev step.
    ///
    /// After an interrupted travel the carriage is somewhere between its last
    /// position and the old target, the move is timed for the farther one
    fn goto(&mut self, target: Point) -> Result<(), Halt> {
        self.checkpoint()?;
        let starts = [Some(self.state.position), self.in_transit.take()];
        let starts = starts.iter().flatten();
        let steps = starts.clone().map(|p| p.distance(target)).max().unwrap_or(0);
        if steps == 0 {
            return Ok(());
        }
        let duration = self.config.square_time() * steps as u32;
        let seconds = duration.as_secs_f64();
        let g = &self.config;
        let dx = starts.clone().map(|p| (target.x - p.x).unsigned_abs()).max().unwrap_or(0) as f64;
        let dy = starts.map(|p| (target.y - p.y).unsigned_abs()).max().unwrap_or(0) as f64;
        let file_speed = (dx * g.file_degrees.unsigned_abs() as f64 / seconds).round() as u32;
        let rank_speed = (dy * g.rank_degrees.unsigned_abs() as f64 / seconds).round() as u32;
        let (travel_power, file_degrees, rank_degrees) = (g.travel_power, g.file_degrees, g.rank_degrees);

        debug!("goto {} -> {} in {:?}", self.state.position, target, duration);
        self.actuator
            .set_axis_limits(Axis::File, travel_power, file_speed)
            .map_err(fault(Axis::File, "set speed"))?;
        self.actuator
            .set_axis_limits(Axis::Rank, travel_power, rank_speed)
            .map_err(fault(Axis::Rank, "set speed"))?;
        self.actuator
            .set_axis_target(Axis::File, target.x * file_degrees)
            .map_err(fault(Axis::File, "move"))?;
        self.actuator
            .set_axis_target(Axis::Rank, target.y * rank_degrees)
            .map_err(fault(Axis::Rank, "move"))?;
        if !self.wait(duration) {
            self.in_transit = Some(target);
            return Err(Halt::Aborted);
        }
        self.state.position = target;
        Ok(())
    }

    fn lower(&mut self, depth: i32) -> Result<(), Halt> {
        self.move_lift(depth)?;
        self.state.lift_up = false;
        Ok(())
    }

    fn raise(&mut self) -> Result<(), Halt> {
        self.move_lift(0)?;
        self.state.lift_up = true;
        Ok(())
    }

    fn move_lift(&mut self, angle: i32) -> Result<(), Halt> {
        self.checkpoint()?;
        self.actuator
            .set_axis_target(Axis::Lift, angle)
            .map_err(fault(Axis::Lift, "move"))?;
        let duration = self.config.lift_time(self.lift_angle, angle);
        if !self.wait(duration) {
            // stopped between the two, raising has to cover the deeper one
            if angle.abs() > self.lift_angle.abs() {
                self.lift_angle = angle;
            }
            self.state.lift_up = false;
            return Err(Halt::Aborted);
        }
        self.lift_angle = angle;
        Ok(())
    }

    /// The claw counts as closed from the moment it is driven shut, so a
    /// failure past that point still has it released
    fn close_claw(&mut self) -> Result<(), Halt> {
        self.checkpoint()?;
        self.actuator
            .set_axis_power(Axis::Claw, -self.config.claw_power)
            .map_err(fault(Axis::Claw, "drive"))?;
        self.state.claw_closed = true;
        if !self.wait(self.config.claw_time()) {
            return Err(Halt::Aborted);
        }
        self.stop_claw()
    }

    /// Runs to the end even after an abort
    fn open_claw(&mut self) -> Result<(), Halt> {
        self.actuator
            .set_axis_power(Axis::Claw, self.config.claw_power)
            .map_err(fault(Axis::Claw, "drive"))?;
        self.wait_through(self.config.claw_time());
        self.state.claw_closed = false;
        self.stop_claw()
    }

    fn stop_claw(&mut self) -> Result<(), Halt> {
        self.actuator
            .set_axis_power(Axis::Claw, 0)
            .map_err(fault(Axis::Claw, "stop"))?;
        Ok(())
    }

    /// Drives the claw at `power` for `duration`, then cuts it
    pub fn pulse_claw(&mut self, power: i32, duration: Duration) -> Result<(), ActuatorFault> {
        self.actuator
            .set_axis_power(Axis::Claw, power)
            .map_err(fault(Axis::Claw, "drive"))?;
        self.wait_through(duration);
        self.actuator
            .set_axis_power(Axis::Claw, 0)
            .map_err(fault(Axis::Claw, "stop"))
    }

    /// Zeroes the encoders so their reading matches the home square, with the
    /// lift fully raised
    fn rehome(&mut self) -> Result<(), ActuatorFault> {
        let (fx, fy) = (
            self.home.x * self.config.file_degrees,
            self.home.y * self.config.rank_degrees,
        );
        for (axis, expected) in [(Axis::File, fx), (Axis::Rank, fy), (Axis::Lift, 0)] {
            let angle = self
                .actuator
                .axis_angle(axis)
                .map_err(fault(axis, "read encoder"))?;
            self.actuator
                .offset_axis_encoder(axis, angle - expected)
                .map_err(fault(axis, "zero encoder"))?;
        }
        self.state = GantryState {
            position: self.home,
            claw_closed: self.state.claw_closed,
            lift_up: true,
            homed: true,
        };
        self.lift_angle = 0;
        debug!("re-homed at {}", self.home);
        Ok(())
    }

    /// Nudges one axis by `delta` encoder degrees, for lining the gantry up
    /// by hand. The claw has no position, use [`Self::pulse_claw`] for it
    pub fn jog(&mut self, axis: Axis, delta: i32) -> Result<(), ActuatorFault> {
        let angle = self
            .actuator
            .axis_angle(axis)
            .map_err(fault(axis, "read encoder"))?;
        self.actuator
            .set_axis_target(axis, angle + delta)
            .map_err(fault(axis, "jog"))
    }
}
