// File I/O: workbooks in, SQLite and report files out

pub mod csv;
pub mod sqlite;
pub mod workbook;
pub mod xlsx;

pub use sqlite::SqliteSink;
pub use workbook::Workbook;
