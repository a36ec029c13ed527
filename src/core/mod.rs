pub mod asset;
pub mod duplicate;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod policy;
pub mod report;
pub mod score;

pub use duplicate::DuplicateClusterer;
pub use error::{ReconcileError, ReconcileResult};
pub use policy::{ReconciliationContext, ReconciliationPolicy};
pub use report::ReconciliationReport;
