//! Data ingestion, normalisation and storage layer.

pub mod aggregate;
pub mod dates;
pub mod io;
pub mod normalize;
pub mod record;
pub mod store;
