//! Database access
//!
//! Tables are addressed through [`crate::domain::DomainPolicy`]; all
//! question tables share one column layout and all answer tables another.

pub mod answers;
pub mod questions;

pub use recall_common::db::{init_database, init_memory_database};

use crate::domain::Domain;
use sqlx::{QueryBuilder, Sqlite};

/// Restrict a query to the rows of `domain` in a possibly shared table
fn push_media_filter(qb: &mut QueryBuilder<'_, Sqlite>, domain: Domain) {
    if let Some(kind) = domain.policy().media_filter {
        qb.push(" AND media_type = ").push_bind(kind.as_str());
    }
}
