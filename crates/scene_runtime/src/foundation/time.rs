//! Frame timing utilities

use std::time::{Duration, Instant};

/// Per-frame timing snapshot handed to behaviors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds since the previous frame
    pub delta: f32,
    /// Length of one fixed step in seconds
    pub fixed_delta: f32,
    /// Seconds accumulated since the scene started ticking
    pub elapsed: f64,
    /// Number of frames ticked so far
    pub frame: u64,
}

/// Monotonic frame clock
pub struct FrameClock {
    last_frame: Instant,
    delta_time: f32,
    total_time: f64,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock starting now
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance to the current instant and return the new delta in seconds
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += f64::from(self.delta_time);
        self.last_frame = now;
        self.frame_count += 1;
        self.delta_time
    }

    /// Seconds between the last two ticks
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds since the clock was created
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Fixed-timestep accumulator
///
/// Converts variable frame deltas into a whole number of fixed steps. Steps
/// beyond `max_steps` in a single frame are dropped rather than carried, so a
/// long stall cannot trigger a spiral of catch-up work.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedStep {
    /// Create an accumulator for steps of `step` seconds
    pub fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step: step.max(f32::EPSILON),
            max_steps,
            accumulator: 0.0,
        }
    }

    /// Length of one step
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Feed a frame delta and get the number of fixed steps to run
    pub fn advance(&mut self, delta: f32) -> u32 {
        self.accumulator += delta.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps {
            self.accumulator = self.accumulator.min(self.step);
        }
        steps
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Start measuring now
    pub fn start_new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Time since start in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_accumulates_remainder() {
        let mut fixed = FixedStep::new(0.5, 10);
        assert_eq!(fixed.advance(0.3), 0);
        assert_eq!(fixed.advance(0.3), 1);
        assert_eq!(fixed.advance(1.0), 2);
    }

    #[test]
    fn test_fixed_step_clamps_long_frames() {
        let mut fixed = FixedStep::new(0.1, 3);
        assert_eq!(fixed.advance(5.0), 3);
        // Backlog was dropped; at most one step carried over
        assert!(fixed.advance(0.0) <= 1);
    }

    #[test]
    fn test_frame_clock_counts_frames() {
        let mut clock = FrameClock::new();
        clock.tick();
        clock.tick();
        assert_eq!(clock.frame_count(), 2);
        assert!(clock.total_time() >= 0.0);
    }
}
