//! The column store the narrower works against.
//!
//! A [`ColumnStore`] exposes just enough of a SQL engine for type narrowing: reading a column's
//! values as text, reading and altering its declared type, and taking a table offline while its
//! schema changes. [`MemoryStore`] is an in-memory implementation loaded from exported CSV.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::conversion::csv::CsvTabularizer;
use crate::error::{ConvertError, ConvertResult};

use super::sql_types::SqlType;

/// A table-oriented store whose column types can be changed in place.
pub trait ColumnStore {
    /// Column names of `table`, in declaration order.
    fn column_names(&self, table: &str) -> ConvertResult<Vec<String>>;

    /// Every value of one column as text, `None` for SQL NULL.
    fn column_values(&self, table: &str, column: &str) -> ConvertResult<Vec<Option<String>>>;

    /// The declared type of a column, `None` if the column does not exist.
    fn column_type(&self, table: &str, column: &str) -> ConvertResult<Option<SqlType>>;

    /// Take the table offline so its schema may change.
    fn detach_table(&mut self, table: &str) -> ConvertResult<()>;

    /// Bring the table back online.
    fn attach_table(&mut self, table: &str) -> ConvertResult<()>;

    /// Change a column's type, converting every stored value.
    fn alter_column_type(&mut self, table: &str, column: &str, sql_type: &SqlType) -> ConvertResult<()>;
}

#[derive(Debug, Clone)]
struct MemoryColumn {
    name: String,
    sql_type: SqlType,
    values: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<MemoryColumn>,
    attached: bool,
}

impl MemoryTable {
    fn column(&self, name: &str) -> Option<&MemoryColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut MemoryColumn> {
        self.columns.iter_mut().find(|c| c.name == name)
    }
}

/// In-memory [`ColumnStore`].
///
/// Tables behave like CSV-backed text tables: data is readable only while attached, and the
/// schema can only change while detached.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, MemoryTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an attached table of `LONGVARCHAR` columns.
    pub fn create_table<S: Into<String>>(&mut self, table: &str, columns: impl IntoIterator<Item = S>) -> ConvertResult<()> {
        if self.tables.contains_key(table) {
            return Err(ConvertError::store(format!("table '{table}' already exists")));
        }
        let columns = columns
            .into_iter()
            .map(|name| MemoryColumn {
                name: name.into(),
                sql_type: SqlType::LongVarchar,
                values: Vec::new(),
            })
            .collect();
        self.tables.insert(
            table.to_string(),
            MemoryTable {
                columns,
                attached: true,
            },
        );
        Ok(())
    }

    /// Append one row; its width must match the table's.
    pub fn insert_row(&mut self, table: &str, row: Vec<Option<String>>) -> ConvertResult<()> {
        let t = self.attached_mut(table)?;
        if row.len() != t.columns.len() {
            return Err(ConvertError::store(format!(
                "row has {} values, table '{table}' has {} columns",
                row.len(),
                t.columns.len()
            )));
        }
        for (column, value) in t.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    /// Load a delimited file as a new table; the header names the columns.
    pub fn load_csv(&mut self, table: &str, path: impl AsRef<Path>, separator: u8) -> ConvertResult<()> {
        let file = File::open(path.as_ref())?;
        self.load_csv_from_reader(table, BufReader::new(file), separator)
    }

    /// Like [`Self::load_csv`], from an already opened stream.
    ///
    /// Empty fields and `NULL` become SQL NULL, whether or not the field was quoted.
    pub fn load_csv_from_reader<R: Read>(&mut self, table: &str, reader: R, separator: u8) -> ConvertResult<()> {
        let mut rdr = CsvTabularizer::new(separator).reader_builder().from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let width = headers.len();
        self.create_table(table, headers)?;

        let mut rows = 0usize;
        for result in rdr.records() {
            let record = result?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|field| match field {
                    "" | "NULL" => None,
                    other => Some(other.to_string()),
                })
                .collect();
            row.resize(width, None);
            self.insert_row(table, row)?;
            rows += 1;
        }
        tracing::debug!(table, columns = width, rows, "loaded CSV into memory store");
        Ok(())
    }

    /// Whether `table` exists and is attached.
    pub fn is_attached(&self, table: &str) -> bool {
        self.tables.get(table).is_some_and(|t| t.attached)
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> ConvertResult<usize> {
        let t = self.table(table)?;
        Ok(t.columns.first().map_or(0, |c| c.values.len()))
    }

    fn table(&self, table: &str) -> ConvertResult<&MemoryTable> {
        self.tables
            .get(table)
            .ok_or_else(|| ConvertError::store(format!("table '{table}' not found")))
    }

    fn table_mut(&mut self, table: &str) -> ConvertResult<&mut MemoryTable> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| ConvertError::store(format!("table '{table}' not found")))
    }

    fn attached(&self, table: &str) -> ConvertResult<&MemoryTable> {
        let t = self.table(table)?;
        if !t.attached {
            return Err(ConvertError::store(format!("table '{table}' is detached")));
        }
        Ok(t)
    }

    fn attached_mut(&mut self, table: &str) -> ConvertResult<&mut MemoryTable> {
        let t = self.table_mut(table)?;
        if !t.attached {
            return Err(ConvertError::store(format!("table '{table}' is detached")));
        }
        Ok(t)
    }
}

impl ColumnStore for MemoryStore {
    fn column_names(&self, table: &str) -> ConvertResult<Vec<String>> {
        Ok(self.table(table)?.columns.iter().map(|c| c.name.clone()).collect())
    }

    fn column_values(&self, table: &str, column: &str) -> ConvertResult<Vec<Option<String>>> {
        self.attached(table)?
            .column(column)
            .map(|c| c.values.clone())
            .ok_or_else(|| ConvertError::store(format!("column '{column}' not found in table '{table}'")))
    }

    fn column_type(&self, table: &str, column: &str) -> ConvertResult<Option<SqlType>> {
        Ok(self.table(table)?.column(column).map(|c| c.sql_type))
    }

    fn detach_table(&mut self, table: &str) -> ConvertResult<()> {
        self.table_mut(table)?.attached = false;
        Ok(())
    }

    fn attach_table(&mut self, table: &str) -> ConvertResult<()> {
        self.table_mut(table)?.attached = true;
        Ok(())
    }

    fn alter_column_type(&mut self, table: &str, column: &str, sql_type: &SqlType) -> ConvertResult<()> {
        let t = self.table_mut(table)?;
        if t.attached {
            return Err(ConvertError::store(format!(
                "cannot alter '{column}': table '{table}' is attached as a text table"
            )));
        }
        let col = t
            .column_mut(column)
            .ok_or_else(|| ConvertError::store(format!("column '{column}' not found in table '{table}'")))?;

        let converted = col
            .values
            .iter()
            .map(|v| v.as_deref().map(|raw| sql_type.cast_text(raw)).transpose())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConvertError::Store {
                message: format!("cannot alter '{table}.{column}' to {sql_type}: {e}"),
            })?;

        col.values = converted;
        col.sql_type = *sql_type;
        Ok(())
    }
}
