//! In-memory fakes for the ports.

use std::cell::RefCell;
use std::rc::Rc;

use crate::domain::Table;
use crate::error::{GenerationError, StoreError};
use crate::ports::{Clock, TableStore, TextGenerator};

#[derive(Default)]
struct MemoryState {
    table: Table,
    reads: usize,
    writes: usize,
    read_error: Option<String>,
    write_error: Option<String>,
}

/// Shared in-memory worksheet. Clones see the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore(Rc<RefCell<MemoryState>>);

impl MemoryStore {
    pub fn with_grid(grid: &[&[&str]]) -> Self {
        let grid = grid
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        let store = Self::default();
        store.0.borrow_mut().table = Table::from_grid(grid);
        store
    }

    pub fn snapshot(&self) -> Table {
        self.0.borrow().table.clone()
    }

    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes
    }

    pub fn fail_reads(&self, message: &str) {
        self.0.borrow_mut().read_error = Some(message.to_string());
    }

    pub fn fail_writes(&self, message: &str) {
        self.0.borrow_mut().write_error = Some(message.to_string());
    }
}

impl TableStore for MemoryStore {
    fn read(&self) -> Result<Table, StoreError> {
        let mut state = self.0.borrow_mut();
        state.reads += 1;
        match &state.read_error {
            Some(message) => Err(StoreError::Read(message.clone())),
            None => Ok(state.table.clone()),
        }
    }

    fn write(&self, table: &Table) -> Result<(), StoreError> {
        let mut state = self.0.borrow_mut();
        if let Some(message) = &state.write_error {
            return Err(StoreError::Write(message.clone()));
        }
        state.writes += 1;
        state.table = table.clone();
        Ok(())
    }
}

/// Always reads a fixed snapshot but writes through to `inner`, reproducing
/// a cycle whose read happened before another cycle's write.
pub struct StaleReadStore {
    snapshot: Table,
    inner: MemoryStore,
}

impl StaleReadStore {
    pub fn new(snapshot: Table, inner: MemoryStore) -> Self {
        Self { snapshot, inner }
    }
}

impl TableStore for StaleReadStore {
    fn read(&self) -> Result<Table, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn write(&self, table: &Table) -> Result<(), StoreError> {
        self.inner.write(table)
    }
}

type Call = (Option<String>, String);

#[derive(Clone)]
pub struct ScriptedGenerator {
    reply: String,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.borrow().last().cloned()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(
        &self,
        system_instruction: Option<&str>,
        user_input: &str,
    ) -> Result<String, GenerationError> {
        self.calls
            .borrow_mut()
            .push((system_instruction.map(str::to_string), user_input.to_string()));
        Ok(self.reply.clone())
    }
}

pub struct FailingGenerator(pub &'static str);

impl TextGenerator for FailingGenerator {
    fn generate(&self, _: Option<&str>, _: &str) -> Result<String, GenerationError> {
        Err(GenerationError::new(self.0))
    }
}

pub struct FixedClock(pub &'static str);

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.to_string()
    }
}
