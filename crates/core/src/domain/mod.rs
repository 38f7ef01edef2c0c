pub mod answers;
pub mod estimate;
pub mod price_table;
