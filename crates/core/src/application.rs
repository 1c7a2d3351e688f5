use tracing::{debug, error, info, warn};

use crate::domain::{History, Record, Table};
use crate::error::{PipelineError, StoreError};
use crate::ports::{Clock, TableStore, TextGenerator};

/// Where a submission cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Generating,
    Persisting,
    Done,
    Failed,
}

/// Reads the current table, substituting an empty one when the store cannot
/// be read so that a following write can recreate it.
pub fn load_table(store: &dyn TableStore) -> Table {
    match store.read() {
        Ok(table) => {
            debug!(rows = table.len(), "read table");
            table
        }
        Err(e) => {
            warn!(error = %e, "table unreadable, continuing with an empty table");
            Table::empty()
        }
    }
}

/// Orchestrates one submission: generate, build the record, then
/// read-merge-overwrite the table.
pub struct SubmissionPipeline {
    generator: Box<dyn TextGenerator>,
    store: Box<dyn TableStore>,
    clock: Box<dyn Clock>,
    instruction: Option<String>,
}

impl SubmissionPipeline {
    /// Creates a pipeline with no fixed instruction.
    pub fn new(
        generator: Box<dyn TextGenerator>,
        store: Box<dyn TableStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            generator,
            store,
            clock,
            instruction: None,
        }
    }

    /// Sets the instruction prepended to every prompt.
    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    /// Runs one cycle. `Ok(None)` means the input was empty and nothing ran.
    pub fn submit(&self, input: &str) -> Result<Option<Record>, PipelineError> {
        self.submit_observed(input, |_| {})
    }

    /// Like [`submit`](Self::submit), reporting each state the cycle enters.
    pub fn submit_observed<F>(
        &self,
        input: &str,
        mut observe: F,
    ) -> Result<Option<Record>, PipelineError>
    where
        F: FnMut(PipelineState),
    {
        if input.trim().is_empty() {
            debug!("empty submission ignored");
            observe(PipelineState::Idle);
            return Ok(None);
        }

        observe(PipelineState::Generating);
        info!(input_len = input.len(), "generating");
        let output = match self.generator.generate(self.instruction(), input) {
            Ok(output) => output,
            Err(e) => {
                error!(failure = "generation", error = %e, "submission failed");
                observe(PipelineState::Failed);
                return Err(e.into());
            }
        };

        let record = Record::new(self.clock.now(), input, output);

        observe(PipelineState::Persisting);
        match self.append(&record) {
            Ok(rows) => {
                info!(rows, "record saved");
                observe(PipelineState::Done);
                Ok(Some(record))
            }
            Err(source) => {
                error!(failure = "store_write", error = %source, "generated but not saved");
                observe(PipelineState::Failed);
                Err(PipelineError::NotSaved { record, source })
            }
        }
    }

    /// Read snapshot, merge, overwrite. Nothing guards the gap between the
    /// read and the write: a concurrent cycle writing in between is lost.
    fn append(&self, record: &Record) -> Result<usize, StoreError> {
        let mut table = load_table(self.store.as_ref());
        table.append(record);
        self.store.write(&table)?;
        Ok(table.len())
    }
}

/// Loads the history shown on every page render.
pub struct HistoryService {
    store: Box<dyn TableStore>,
    title: String,
}

impl HistoryService {
    pub fn new(store: Box<dyn TableStore>, title: impl Into<String>) -> Self {
        Self {
            store,
            title: title.into(),
        }
    }

    /// Reads the store fresh; an unreadable store shows as empty history.
    pub fn load(&self) -> History {
        History::from_table(self.title.clone(), &load_table(self.store.as_ref()))
    }
}
