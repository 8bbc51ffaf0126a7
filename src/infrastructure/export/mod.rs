pub(crate) mod table;
pub(crate) mod xml;

pub use table::{read_records, Cells, Table, TableFormat};
