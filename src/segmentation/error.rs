use thiserror::Error;

/// An event handed to the segmenter violates its input contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentationInputFault {
    #[error("event at input position {position} has no timestamp")]
    MissingTimestamp { position: usize },
}
