//! Value and record types flowing through the loads.

mod cell;
mod key;
mod record;
mod table;
mod table_row;

pub use cell::Cell;
pub use key::{NaturalKey, SurrogateKey};
pub use record::RawRecord;
pub use table::{TableName, TableSchema};
pub use table_row::TableRow;
