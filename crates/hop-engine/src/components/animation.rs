//! Keyframe blend controller.
//!
//! An [`Animation`] interpolates linearly between an ordered list of values,
//! one `frame_duration` apart, sampled against an explicit millisecond clock.
//! Works for any value that can be added, subtracted and scaled (`f32`,
//! `Vec3`, ...).

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Values that can be linearly blended.
pub trait Blend: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Blend for T where T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T> {}

/// What happens when playback reaches the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Wrap back to the first frame.
    #[default]
    Loop,
    /// Hold the last frame; transport is left alone.
    Clamp,
    /// Hold the last frame and stop.
    Stop,
}

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Time-driven interpolation over keyframes.
#[derive(Debug, Clone)]
pub struct Animation<T> {
    frames: Vec<T>,
    /// Seconds between consecutive frames.
    frame_duration: f32,
    mode: LoopMode,
    transport: Transport,
    start_ms: u64,
    pause_ms: u64,
    /// Elapsed time of the last sample, reused while stopped.
    held_ms: u64,
}

impl<T: Blend> Animation<T> {
    pub fn new(frames: Vec<T>, frame_duration: f32, mode: LoopMode) -> Self {
        Self {
            frames,
            frame_duration,
            mode,
            transport: Transport::Stopped,
            start_ms: 0,
            pause_ms: 0,
            held_ms: 0,
        }
    }

    pub fn with_mode(mut self, mode: LoopMode) -> Self {
        self.mode = mode;
        self
    }

    // -- Transport --

    /// Restart from the first frame, whatever the current state.
    pub fn start(&mut self, now_ms: u64) {
        self.transport = Transport::Playing;
        self.start_ms = now_ms;
        self.held_ms = 0;
    }

    /// Resume after a pause (elapsed time continues where it left off), or
    /// start from the beginning when stopped.
    pub fn play(&mut self, now_ms: u64) {
        match self.transport {
            Transport::Paused => {
                self.start_ms += now_ms.saturating_sub(self.pause_ms);
                self.transport = Transport::Playing;
            }
            Transport::Stopped => self.start(now_ms),
            Transport::Playing => {}
        }
    }

    pub fn pause(&mut self, now_ms: u64) {
        if self.transport == Transport::Playing {
            self.pause_ms = now_ms;
            self.transport = Transport::Paused;
        }
    }

    /// Stop playback. Sampling keeps returning the last sampled value.
    pub fn stop(&mut self) {
        self.transport = Transport::Stopped;
    }

    // -- Sampling --

    /// Sample the animation at `now_ms`. `None` only when there are no frames.
    ///
    /// Past the last frame: `Loop` wraps by whole cycles, `Clamp` holds the
    /// last frame, `Stop` holds the last frame and switches to `Stopped`.
    pub fn frame(&mut self, now_ms: u64) -> Option<T> {
        let n = self.frames.len();
        let last = *self.frames.last()?;
        if n == 1 || self.frame_duration <= 0.0 {
            return Some(last);
        }

        let mut elapsed_ms = match self.transport {
            Transport::Stopped => self.held_ms,
            Transport::Paused => self.pause_ms.saturating_sub(self.start_ms),
            Transport::Playing => now_ms.saturating_sub(self.start_ms),
        };
        let end = self.frame_duration * (n - 1) as f32;

        match self.mode {
            LoopMode::Loop => {
                let cycle_ms = ((self.frame_duration * n as f32 * 1000.0).round() as u64).max(1);
                if elapsed_ms >= cycle_ms {
                    let wrapped = (elapsed_ms / cycle_ms) * cycle_ms;
                    if self.transport != Transport::Stopped {
                        self.start_ms += wrapped;
                    }
                    elapsed_ms -= wrapped;
                }
            }
            LoopMode::Clamp => {
                if seconds(elapsed_ms) >= end {
                    self.held_ms = elapsed_ms;
                    return Some(last);
                }
            }
            LoopMode::Stop => {
                if seconds(elapsed_ms) >= end {
                    self.transport = Transport::Stopped;
                    self.held_ms = elapsed_ms;
                    return Some(last);
                }
            }
        }

        self.held_ms = elapsed_ms;
        Some(self.sample(seconds(elapsed_ms)))
    }

    fn sample(&self, elapsed: f32) -> T {
        let n = self.frames.len();
        let pos = elapsed / self.frame_duration;
        let index = (pos.floor() as usize).min(n - 1);
        let frac = pos - index as f32;
        let a = self.frames[index];
        let b = self.frames[(index + 1) % n];
        a + (b - a) * frac
    }

    // -- Queries --

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn frames(&self) -> &[T] {
        &self.frames
    }

    pub fn frame_duration(&self) -> f32 {
        self.frame_duration
    }

    pub fn set_frame_duration(&mut self, seconds: f32) {
        self.frame_duration = seconds;
    }
}

fn seconds(ms: u64) -> f32 {
    ms as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn ramp(mode: LoopMode) -> Animation<f32> {
        Animation::new(vec![0.0, 10.0, 20.0, 30.0], 0.25, mode)
    }

    #[test]
    fn loop_hits_every_frame_on_frame_boundaries() {
        let mut anim = ramp(LoopMode::Loop);
        anim.start(1000);
        for k in 0..13u64 {
            let expected = anim.frames()[(k % 4) as usize];
            assert_eq!(anim.frame(1000 + k * 250), Some(expected), "k={k}");
        }
        assert!(anim.is_playing());
    }

    #[test]
    fn loop_interpolates_last_back_to_first() {
        let mut anim = ramp(LoopMode::Loop);
        anim.start(0);
        // halfway between frame 3 (30) and frame 0 (0)
        let v = anim.frame(875).unwrap();
        assert!((v - 15.0).abs() < 1e-4, "got {v}");
    }

    #[test]
    fn clamp_holds_last_frame_and_keeps_playing() {
        let mut anim = ramp(LoopMode::Clamp);
        anim.start(0);
        for k in 3..8u64 {
            assert_eq!(anim.frame(k * 250), Some(30.0));
        }
        assert!(anim.is_playing());
    }

    #[test]
    fn stop_policy_ends_playback_on_last_frame() {
        let mut anim = ramp(LoopMode::Stop);
        anim.start(0);
        assert_eq!(anim.frame(750), Some(30.0));
        assert_eq!(anim.transport(), Transport::Stopped);
        // Stays on the last frame while idle, however much time passes.
        assert_eq!(anim.frame(99_999), Some(30.0));
        assert!(!anim.is_playing());
    }

    #[test]
    fn interpolates_between_frames() {
        let mut anim = ramp(LoopMode::Clamp);
        anim.start(0);
        let v = anim.frame(125).unwrap();
        assert!((v - 5.0).abs() < 1e-4);
        let v = anim.frame(600).unwrap();
        assert!((v - 24.0).abs() < 1e-3);
    }

    #[test]
    fn pause_and_play_shift_start_by_paused_duration() {
        let mut anim = ramp(LoopMode::Clamp);
        anim.start(1000);
        anim.pause(1300);
        let paused = anim.frame(4000).unwrap();
        assert!((paused - 12.0).abs() < 1e-4);

        anim.play(5000);
        let resumed = anim.frame(5000).unwrap();
        assert!((resumed - paused).abs() < 1e-5);
        let later = anim.frame(5100).unwrap();
        assert!((later - 16.0).abs() < 1e-4);
    }

    #[test]
    fn play_from_stopped_starts_over() {
        let mut anim = ramp(LoopMode::Clamp);
        anim.play(200);
        assert!(anim.is_playing());
        assert_eq!(anim.frame(200), Some(0.0));
    }

    #[test]
    fn stop_freezes_last_sample() {
        let mut anim = ramp(LoopMode::Loop);
        anim.start(0);
        let before = anim.frame(300).unwrap();
        anim.stop();
        assert_eq!(anim.frame(10_000), Some(before));
    }

    #[test]
    fn start_restarts_from_any_state() {
        let mut anim = ramp(LoopMode::Stop);
        anim.start(0);
        anim.frame(5000);
        assert_eq!(anim.transport(), Transport::Stopped);
        anim.start(6000);
        assert_eq!(anim.frame(6000), Some(0.0));
        assert!(anim.is_playing());
    }

    #[test]
    fn blends_vectors() {
        let mut anim = Animation::new(vec![Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0)], 1.0, LoopMode::Clamp);
        anim.start(0);
        let v = anim.frame(500).unwrap();
        assert!((v - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn degenerate_animations() {
        let mut empty: Animation<f32> = Animation::new(Vec::new(), 1.0, LoopMode::Loop);
        empty.start(0);
        assert_eq!(empty.frame(10), None);

        let mut single = Animation::new(vec![7.0f32], 1.0, LoopMode::Loop);
        assert_eq!(single.frame(0), Some(7.0));

        let mut instant = Animation::new(vec![1.0f32, 2.0], 0.0, LoopMode::Loop);
        instant.start(0);
        assert_eq!(instant.frame(0), Some(2.0));
    }
}
