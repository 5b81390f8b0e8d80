//! File adapters around the core: sparse TSV examples, separate label
//! files, JSON model documents and prediction tables.
pub mod label_store;
pub mod model_file;
pub mod predictions;
pub mod sparse_tsv;
