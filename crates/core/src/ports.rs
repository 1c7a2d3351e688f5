use crate::domain::{History, Table};
use crate::error::{GenerationError, StoreError};

/// Remote tabular backend holding the whole log as one worksheet.
///
/// There is no row-level append and no version check: callers compose
/// "snapshot + new row" and overwrite everything, so two overlapping
/// read/write pairs can lose an update.
pub trait TableStore {
    /// Fetches the full table. Every call goes to the backend; nothing is cached.
    fn read(&self) -> Result<Table, StoreError>;

    /// Replaces the entire remote contents with `table`.
    fn write(&self, table: &Table) -> Result<(), StoreError>;
}

/// Hosted text-generation endpoint. Stateless between calls.
pub trait TextGenerator {
    fn generate(
        &self,
        system_instruction: Option<&str>,
        user_input: &str,
    ) -> Result<String, GenerationError>;
}

/// Source of record timestamps.
pub trait Clock {
    fn now(&self) -> String;
}

/// Turns a newest-first history into displayable text.
pub trait HistoryRenderer {
    fn render(&self, history: &History) -> String;
}
