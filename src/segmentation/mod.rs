pub mod algorithm;
pub mod config;
pub mod error;

pub use algorithm::{segment_events, Workflow};
pub use config::SegmentationConfig;
pub use error::SegmentationInputFault;
