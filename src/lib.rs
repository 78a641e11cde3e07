//! `tabular-crunch` flattens hierarchical documents (JSON, spreadsheet sheets) into CSV with a
//! stable column schema, and narrows the column types of the loaded result.
//!
//! The primary entrypoint is [`conversion::convert_from_path`], which picks the format from the
//! file extension (or from [`conversion::ConvertOptions::format`]) and writes
//! `<input file name>.csv` next to the input.
//!
//! ## Pipeline
//!
//! 1. A [`conversion::Tabularizer`] turns the source into a stream of
//!    [`types::FlattenedRecord`]s. Nested objects become dotted column names (`user.name`),
//!    arrays become the placeholder `[...]`.
//! 2. A [`conversion::SchemaCollector`] pass gathers every column in first-seen order, with a
//!    per-type value count and the longest serialized value.
//! 3. A [`conversion::CsvExporter`] pass re-reads the source and writes one row per record,
//!    leaving absent fields blank.
//!
//! Type narrowing ([`narrowing::TypeNarrower`]) is a separate stage working on a
//! [`narrowing::ColumnStore`] that already holds the exported rows as text.
//!
//! **Supported inputs (auto-detected by extension):**
//!
//! - **JSON**: `.json`, with an items locator such as `/data/children` pointing at the array of
//!   records
//! - **Workbooks** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`,
//!   with an optional locator such as `Sheet2!A0:D40`
//! - **CSV**: `.csv`
//!
//! ## Quick example
//!
//! ```no_run
//! use tabular_crunch::conversion::{convert_from_path, ConvertOptions};
//!
//! # fn main() -> Result<(), tabular_crunch::ConvertError> {
//! let opts = ConvertOptions {
//!     locator: "/data/children".to_string(),
//!     ..Default::default()
//! };
//! let out = convert_from_path("listing.json", &opts)?;
//! for col in &out.columns {
//!     println!("{}: {} values, max {} chars", col.name, col.types.total(), col.max_length);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Narrowing a loaded table
//!
//! ```no_run
//! use tabular_crunch::narrowing::{ColumnStore, MemoryStore, NarrowingOptions, TypeNarrower};
//!
//! # fn main() -> Result<(), tabular_crunch::ConvertError> {
//! let mut store = MemoryStore::new();
//! store.load_csv("listing", "listing.json.csv", b',')?;
//! let columns = store.column_names("listing")?;
//!
//! let report = TypeNarrower::new(NarrowingOptions::default()).optimize(&mut store, "listing", &columns)?;
//! for (column, sql_type) in report.applied() {
//!     println!("{column} -> {sql_type}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The library never installs a `tracing` subscriber; diagnostics are emitted through `tracing`
//! and conversion outcomes can be reported to a [`conversion::ConversionObserver`].

pub mod conversion;
pub mod error;
pub mod narrowing;
pub mod types;

pub use error::{ConvertError, ConvertResult};
