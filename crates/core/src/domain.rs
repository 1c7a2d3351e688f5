/// Header labels used when the destination table has no columns yet.
pub const DEFAULT_HEADERS: [&str; 3] = ["date", "input", "output"];

/// Number of positional columns a record occupies: (timestamp, input, output).
pub const RECORD_WIDTH: usize = 3;

/// Placed between the fixed instruction and the user's text.
pub const PROMPT_SEPARATOR: &str = "\n\nUser input: ";

/// One logged interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: String,
    pub input_text: String,
    pub output_text: String,
}

impl Record {
    pub fn new(
        timestamp: impl Into<String>,
        input_text: impl Into<String>,
        output_text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            input_text: input_text.into(),
            output_text: output_text.into(),
        }
    }

    /// Reads a row positionally; missing cells come back empty.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
        Self {
            timestamp: cell(0),
            input_text: cell(1),
            output_text: cell(2),
        }
    }
}

/// Ordered rows under a header line, as held by the backing store.
///
/// Columns are bound by position, never by header text: whatever labels the
/// store already uses are kept as-is when records are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from a raw cell grid whose first row is the header.
    /// Ragged rows are kept as they are.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::empty();
        }
        let headers = grid.remove(0);
        Self {
            headers,
            rows: grid,
        }
    }

    /// Header row followed by every data row.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        if !self.headers.is_empty() {
            grid.push(self.headers.clone());
        }
        grid.extend(self.rows.iter().cloned());
        grid
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the table has no columns at all.
    pub fn has_no_columns(&self) -> bool {
        self.headers.is_empty()
    }

    /// Appends a record under the existing headers.
    ///
    /// A table without columns gets [`DEFAULT_HEADERS`]. A header shorter
    /// than three columns is completed with the default labels for the
    /// missing positions. Extra columns beyond the third are left blank in
    /// the new row.
    pub fn append(&mut self, record: &Record) {
        for label in DEFAULT_HEADERS.iter().skip(self.headers.len()) {
            self.headers.push((*label).to_string());
        }

        let mut row = vec![
            record.timestamp.clone(),
            record.input_text.clone(),
            record.output_text.clone(),
        ];
        row.resize(self.headers.len().max(RECORD_WIDTH), String::new());
        self.rows.push(row);
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = Record> + '_ {
        self.rows.iter().map(|row| Record::from_row(row))
    }

    /// Records with the most recently appended first.
    pub fn newest_first(&self) -> Vec<Record> {
        self.records().rev().collect()
    }
}

/// Newest-first projection of the table for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    pub title: String,
    pub headers: Vec<String>,
    /// Raw rows, every column the worksheet has.
    pub rows: Vec<Vec<String>>,
    /// The same rows read positionally as records.
    pub entries: Vec<Record>,
}

impl History {
    pub fn from_table(title: impl Into<String>, table: &Table) -> Self {
        Self {
            title: title.into(),
            headers: table.headers().to_vec(),
            rows: table.rows().iter().rev().cloned().collect(),
            entries: table.newest_first(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Combines the optional fixed instruction with the user's text into the
/// single prompt sent to the generator.
pub fn build_prompt(instruction: Option<&str>, user_input: &str) -> String {
    match instruction.map(str::trim).filter(|s| !s.is_empty()) {
        Some(instruction) => format!("{instruction}{PROMPT_SEPARATOR}{user_input}"),
        None => user_input.to_string(),
    }
}
