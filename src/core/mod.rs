pub mod header;
pub mod reader;
pub mod translate;
pub mod types;
