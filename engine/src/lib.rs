pub mod audio;
pub mod clock;
pub mod input;
pub mod net;
pub mod rng;
pub mod surface;

use std::time::Duration;

pub const DEFAULT_FRAME: Duration = Duration::from_millis(30);

/// Something that can be fed inputs and advanced through virtual time.
pub trait Simulation {
    type Input;

    fn input(&mut self, input: Self::Input);
    fn advance(&mut self, dt: Duration);
}

/// Drives a [`Simulation`] in fixed-size frames.
///
/// Wall-clock time handed to [`HeadlessRunner::elapse`] is accumulated and
/// released in whole frames so timers inside the simulation see the same
/// sequence of `advance` calls regardless of how jittery the host loop is.
#[derive(Debug)]
pub struct HeadlessRunner<S: Simulation> {
    sim: S,
    frame: u64,
    frame_len: Duration,
    carry: Duration,
}

impl<S: Simulation> HeadlessRunner<S> {
    pub fn new(sim: S) -> Self {
        Self::with_frame(sim, DEFAULT_FRAME)
    }

    pub fn with_frame(sim: S, frame_len: Duration) -> Self {
        Self {
            sim,
            frame: 0,
            frame_len: frame_len.max(Duration::from_millis(1)),
            carry: Duration::ZERO,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn frame_len(&self) -> Duration {
        self.frame_len
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn into_inner(self) -> S {
        self.sim
    }

    pub fn send(&mut self, input: S::Input) {
        self.sim.input(input);
    }

    pub fn step(&mut self) -> u64 {
        self.sim.advance(self.frame_len);
        self.frame += 1;
        self.frame
    }

    /// Adds wall time and runs as many whole frames as it covers.
    pub fn elapse(&mut self, dt: Duration) -> u64 {
        self.carry = self.carry.saturating_add(dt);
        let mut stepped = 0;
        while self.carry >= self.frame_len {
            self.carry -= self.frame_len;
            self.step();
            stepped += 1;
        }
        stepped
    }

    /// Runs frames until at least `span` of virtual time has passed.
    pub fn run_for(&mut self, span: Duration) -> u64 {
        let frames = span.as_nanos().div_ceil(self.frame_len.as_nanos()) as u64;
        for _ in 0..frames {
            self.step();
        }
        frames
    }

    pub fn run<I>(&mut self, inputs: I) -> u64
    where
        I: IntoIterator<Item = S::Input>,
    {
        for input in inputs {
            self.send(input);
            self.step();
        }
        self.frame
    }
}
