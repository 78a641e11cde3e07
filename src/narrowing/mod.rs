//! Post-load column type narrowing.
//!
//! Once an exported CSV sits in a SQL store as wide text columns, [`TypeNarrower::optimize`]
//! moves each column to the narrowest candidate type every one of its values round-trips
//! through (see [`sql_types::probe`]).
//!
//! ```
//! use tabular_crunch::narrowing::{MemoryStore, NarrowingOptions, SqlType, TypeNarrower, ColumnStore};
//!
//! # fn main() -> Result<(), tabular_crunch::ConvertError> {
//! let mut store = MemoryStore::new();
//! store.load_csv_from_reader("t", "id,price\n1,9.99\n2,12.5\n".as_bytes(), b',')?;
//!
//! let narrower = TypeNarrower::new(NarrowingOptions::default());
//! narrower.optimize(&mut store, "t", &["id".to_string(), "price".to_string()])?;
//!
//! assert_eq!(store.column_type("t", "id")?, Some(SqlType::SmallInt));
//! assert_eq!(store.column_type("t", "price")?, Some(SqlType::Decimal { precision: 10, scale: 3 }));
//! # Ok(())
//! # }
//! ```

pub mod sql_types;
pub mod store;

use rayon::prelude::*;

use crate::error::ConvertResult;

pub use sql_types::{CastError, DEFAULT_CANDIDATES, SqlType, probe, round_trips};
pub use store::{ColumnStore, MemoryStore};

/// Configuration for [`TypeNarrower`].
#[derive(Debug, Clone)]
pub struct NarrowingOptions {
    /// Probe columns on the rayon thread pool. Results are identical either way.
    pub parallel_columns: bool,
    /// Candidate types in priority order; the first fit wins.
    pub candidates: Vec<SqlType>,
}

impl Default for NarrowingOptions {
    fn default() -> Self {
        Self {
            parallel_columns: false,
            candidates: DEFAULT_CANDIDATES.to_vec(),
        }
    }
}

/// What happened to one column that was found to fit a narrower type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOutcome {
    /// The column now has the requested type.
    Applied,
    /// The store accepted the change but reports a different type.
    Coerced { actual: Option<SqlType> },
    /// The store refused the change; the column keeps its previous type.
    Failed { message: String },
}

/// One attempted type change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub column: String,
    pub requested: SqlType,
    pub outcome: ColumnOutcome,
}

/// Result of [`TypeNarrower::optimize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowingReport {
    /// Attempted changes, in the order the columns were given.
    pub changes: Vec<ColumnChange>,
}

impl NarrowingReport {
    /// Columns whose type was changed as requested.
    pub fn applied(&self) -> impl Iterator<Item = (&str, SqlType)> {
        self.changes
            .iter()
            .filter(|c| c.outcome == ColumnOutcome::Applied)
            .map(|c| (c.column.as_str(), c.requested))
    }
}

/// Finds and applies the narrowest lossless type per column.
#[derive(Debug, Clone, Default)]
pub struct TypeNarrower {
    options: NarrowingOptions,
}

impl TypeNarrower {
    pub fn new(options: NarrowingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NarrowingOptions {
        &self.options
    }

    /// The first candidate every value fits, in priority order.
    ///
    /// `None` when nothing fits, and also when the column holds no non-null value, since an
    /// empty column gives no evidence for any type.
    pub fn find_fitting_type(&self, values: &[Option<String>]) -> Option<SqlType> {
        if values.iter().all(Option::is_none) {
            return None;
        }
        self.options
            .candidates
            .iter()
            .find(|candidate| probe(candidate, values.iter().map(Option::as_deref)))
            .copied()
    }

    /// Narrow the given columns of `table` in place.
    ///
    /// Columns are probed while the table is attached; the table is then detached, each fitting
    /// column altered, and the table reattached. A column that cannot be read or altered is
    /// logged and skipped. Only failures to detach or reattach the table are returned as errors.
    pub fn optimize<S: ColumnStore + ?Sized>(
        &self,
        store: &mut S,
        table: &str,
        columns: &[String],
    ) -> ConvertResult<NarrowingReport> {
        let mut loaded: Vec<(&str, Option<SqlType>, Vec<Option<String>>)> = Vec::with_capacity(columns.len());
        for column in columns {
            let values = match store.column_values(table, column) {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(table, column = %column, error = %e, "cannot read column, skipping");
                    continue;
                }
            };
            let current = store.column_type(table, column).unwrap_or(None);
            loaded.push((column.as_str(), current, values));
        }

        let fit = |(column, current, values): &(&str, Option<SqlType>, Vec<Option<String>>)| {
            let found = self.find_fitting_type(values);
            tracing::trace!(table, column, ?current, ?found, "probed column");
            match found {
                Some(t) if Some(t) != *current => Some((column.to_string(), t)),
                _ => None,
            }
        };
        let planned: Vec<(String, SqlType)> = if self.options.parallel_columns {
            loaded.par_iter().filter_map(fit).collect()
        } else {
            loaded.iter().filter_map(fit).collect()
        };

        let mut report = NarrowingReport::default();
        if planned.is_empty() {
            tracing::debug!(table, "no column can be narrowed");
            return Ok(report);
        }

        store.detach_table(table)?;
        for (column, requested) in planned {
            let outcome = match store.alter_column_type(table, &column, &requested) {
                Err(e) => {
                    tracing::error!(table, column = %column, %requested, error = %e, "failed to alter column type");
                    ColumnOutcome::Failed {
                        message: e.to_string(),
                    }
                }
                Ok(()) => match store.column_type(table, &column) {
                    Ok(Some(actual)) if actual == requested => {
                        tracing::debug!(table, column = %column, %requested, "column type narrowed");
                        ColumnOutcome::Applied
                    }
                    Ok(actual) => {
                        tracing::warn!(table, column = %column, %requested, ?actual, "column type differs from requested");
                        ColumnOutcome::Coerced { actual }
                    }
                    Err(e) => {
                        tracing::warn!(table, column = %column, %requested, error = %e, "cannot verify column type");
                        ColumnOutcome::Coerced { actual: None }
                    }
                },
            };
            report.changes.push(ColumnChange {
                column,
                requested,
                outcome,
            });
        }
        store.attach_table(table)?;

        Ok(report)
    }
}
