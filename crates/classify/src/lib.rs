pub mod background;
pub mod canonical;
pub mod client;

pub use background::BackgroundClassifier;
pub use canonical::{canonical_form, group_by_canonical};
pub use client::{Classifier, ClassifyError, HttpClassifier, MockClassifier};
