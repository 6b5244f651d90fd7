//! Parsers for `dumpsys`/`wm` output used by the shell platform.

pub mod display;
pub mod foreground;
pub mod surfaceflinger;
