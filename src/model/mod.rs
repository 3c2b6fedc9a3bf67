pub mod change;
pub mod record;
pub mod schema;

pub use change::{ChangeItem, ChangeSet};
pub use record::{NormalizedRow, RemoteFileRecord};
pub use schema::{CellValue, Column, DataRow, DataTable, DataType, RowSink, SchemaColumn, SchemaMap};
