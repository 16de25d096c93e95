pub mod batch;
pub mod row;

pub use batch::{manifest_for, Batch, Manifest};
pub use row::Row;
