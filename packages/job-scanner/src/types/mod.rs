//! Data types shared across the scan engine.

pub mod company;
pub mod posting;
pub mod scan;

pub use company::{Company, ScanType, TrackedJob};
pub use posting::Posting;
pub use scan::{PageOutcome, Phase, ScanResult, ScanState};
