pub mod table;

// Re-export the table types for convenient access (e.g. `use crate::market_data::Bar`).
pub use table::{Bar, PriceTable, TableRow};
