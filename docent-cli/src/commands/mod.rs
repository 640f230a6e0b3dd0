//! CLI command implementations

pub mod detect;
pub mod guidance;
pub mod scan;

pub use detect::DetectArgs;
pub use guidance::GuidanceArgs;
pub use scan::ScanArgs;
