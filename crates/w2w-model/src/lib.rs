//! Data model for wall-to-wall forest-carbon project preparation.

pub mod classifier;
pub mod distribution;
pub mod error;
pub mod project;

pub use classifier::{Classifier, ClassifierSet};
pub use distribution::DistributionRecord;
pub use error::{ModelError, Result};
pub use project::{MergeInventory, PreparedProject, ProjectLayout};
