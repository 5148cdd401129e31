//! Real-time personal sound amplifier.
//!
//! Microphone audio is routed through a fixed processing chain
//! (pre-amp, analysis tap, six-band equalizer, balance, volume) to the
//! output device while the user adjusts parameters live.
//!
//! | Module | Role |
//! |--------|------|
//! | [`params`] | parameter values, sanitization, active profile |
//! | [`profiles`] | built-in and user-saved presets |
//! | [`chain`] | stage layout, lock-free parameter cells, the render path |
//! | [`audio`] | capture/output backend, DSP primitives, spectrum analysis |
//! | [`session`] | start/stop state machine, chain controller, sampler |
//! | [`config`] | `settings.toml` and platform paths |
//! | [`app`] | egui front end |

pub mod app;
pub mod audio;
pub mod chain;
pub mod config;
pub mod params;
pub mod profiles;
pub mod session;
