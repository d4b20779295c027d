//! Indexing and live capture for dbfs
//!
//! This crate provides:
//! - A local source filesystem adapter ([`LocalFs`]) and its `notify`-backed
//!   change stream ([`LocalSource`])
//! - The recursive tree walk with per-directory visitors
//! - Event dispatch to the mirror and the background capture loop

pub mod capture;
pub mod dispatch;
pub mod fs;
pub mod source;
pub mod translate;
pub mod visitor;
pub mod walk;

#[cfg(test)]
mod test_helpers;

pub use capture::{CaptureHandle, EventCapture, POLLING_INTERVAL};
pub use dispatch::Dispatcher;
pub use fs::{canonicalize_partial, LocalFs};
pub use source::LocalSource;
pub use translate::EventTranslator;
pub use visitor::{MirrorVisitor, WalkSummary};
pub use walk::{TreeVisitor, TreeWalker, VisitedChild};
