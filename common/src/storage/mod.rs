pub mod content_store;
pub mod db;
pub mod types;
pub mod vector_index;
