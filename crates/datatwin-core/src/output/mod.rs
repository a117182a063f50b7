pub mod csv;
pub mod json;

pub use csv::{write_csv, write_csv_table};
pub use json::write_json;
