/// Tunable thresholds for splitting the event stream into workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationConfig {
    /// A gap strictly greater than this (in timestamp units, ms) starts a new workflow.
    pub inactivity_threshold_ms: u64,
}

impl SegmentationConfig {
    pub const DEFAULT_INACTIVITY_THRESHOLD_MS: u64 = 5 * 60 * 1000;

    pub fn with_threshold_ms(inactivity_threshold_ms: u64) -> Self {
        Self {
            inactivity_threshold_ms,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_ms: Self::DEFAULT_INACTIVITY_THRESHOLD_MS,
        }
    }
}
