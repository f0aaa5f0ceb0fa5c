//! Secret detection, redaction, and finding aggregation.

mod detector;
mod findings;
mod redact;
mod scan;

pub use detector::{classify_secret_value, Confidence, SecretMatch};
pub use findings::{locate_lines, FindingSet, SecretFinding};
pub use redact::redact_secret;
pub use scan::SecretScanContext;
