//! Presentation over the aggregation core: chart panels, notifications and
//! plain-text output. The terminal UI in [`crate::tui`] draws from the same
//! chart panels.

pub mod chart;
pub mod notice;
pub mod text;

pub use chart::{ChartBoard, ChartPanel, Palette, Rgb, ShareChart};
pub use notice::{Notice, Severity};
