//! PHI/PII redaction for log output.
//!
//! Consultation transcripts, patient contact details and record numbers must
//! never reach the log stream verbatim. Call sites run free text through a
//! [`PiiRedactor`] before attaching it to a `tracing` event:
//!
//! ```rust
//! use logger_redacted::{PiiRedactor, RedactionConfig};
//!
//! let redactor = PiiRedactor::new(RedactionConfig::default());
//! let line = redactor.redact("Patient reachable at jane@example.com, MRN 0048812");
//! assert!(!line.contains("jane@example.com"));
//! assert!(!line.contains("0048812"));
//! ```
//!
//! Matched values are replaced by a short SHA-256 tag (`EMAIL[...]`) when
//! `hash_for_correlation` is on, so two log lines mentioning the same value
//! can still be correlated without revealing it.

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;
