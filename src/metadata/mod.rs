//! Relational storage for debates and images.

mod error;
mod records;
mod sqlite;

pub use error::{MetadataError, MetadataResult};
pub use records::{Debate, Image, ImageWithDebate};
pub use sqlite::{MetadataStore, PendingDeletion};
