//! Pipeline stages for batch document OCR.
//!
//! Each submodule implements exactly one stage. Keeping stages separate
//! makes each independently testable against fake collaborators and keeps
//! the driver in [`crate::batch`] a plain sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ recognize ──▶ extract          report
//! (store)    (vision job)  (text + fields)  (workbook, on request)
//! ```
//!
//! 1. [`upload`]    — delete any stale object of the same name, then put
//!    the local file into the bucket
//! 2. [`recognize`] — submit the async detection job and block until it
//!    finishes or the deadline passes
//! 3. [`extract`]   — read result objects back, append recognized text to
//!    the cumulative output file, capture labeled field values
//! 4. [`report`]    — write extracted fields to a workbook, one sheet per
//!    document; not part of the default driver sequence

pub mod extract;
pub mod recognize;
pub mod report;
pub mod upload;
