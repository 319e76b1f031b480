pub mod batch;
pub mod clean;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod geometry;
pub mod label;
pub mod merge;
pub mod relabel;
pub mod report;
pub mod resize;
pub mod split;
pub mod transform;
pub mod visualize;
pub mod voc;

pub use cli::Cli;
pub use geometry::{remap_box, LetterboxGeometry};
pub use label::{parse_line, BoundingBox, LabelLineError};
pub use report::{BatchStats, ItemOutcome};
pub use transform::{letterbox, Letterboxed};
