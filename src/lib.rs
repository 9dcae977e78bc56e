//! Laboratory report engine.
//!
//! Computes derived values for diagnostic test panels, classifies results
//! against their reference ranges and assembles the ordered result list a
//! report is saved with.

pub mod assembly;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod error;
pub mod numeric;
pub mod output;
pub mod panels;
pub mod range;
pub mod store;

pub use assembly::{Assembler, PanelSelection, PatientContext, ReportDraft};
pub use catalog::{TestCatalog, TestPanel};
pub use error::{LimsError, LimsResult};
pub use panels::{compute_derived, Derived, PanelKind, PanelValues, ResultEntry};
pub use range::{classify, Verdict};
