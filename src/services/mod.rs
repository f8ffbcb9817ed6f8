pub mod batch_importer;
pub mod csv_parser;
pub mod error_report;
pub mod header_classifier;
pub mod import_session;
pub mod row_normalizer;
pub mod session_store;
