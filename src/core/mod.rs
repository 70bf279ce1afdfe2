pub mod document_parser;
pub mod enhancement;
pub mod errors;
pub mod field_extractor;
pub mod link_extractor;
pub mod models;
pub mod pdf;
pub mod record_parser;
pub mod schema_normalizer;
pub mod service;
pub mod settings_store;
