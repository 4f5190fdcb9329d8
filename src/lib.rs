//! Keyboard PCB placer: reads a keyboard layout, places switch and diode
//! footprints for every key and routes the switch matrix between them.

pub mod config;
pub mod host;
mod pipeline;
pub mod report;

pub use config::{ConfigError, PlacerConfig};
pub use host::{apply_report, BoardSink, HostFailure, RecordingSink};
pub use pipeline::{Pipeline, PipelineError};
pub use report::{PlacementCommand, Report};
