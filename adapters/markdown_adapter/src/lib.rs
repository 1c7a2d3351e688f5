use promptlog_core::domain::{History, Record, DEFAULT_HEADERS, RECORD_WIDTH};
use promptlog_core::ports::HistoryRenderer;
use promptlog_core::utils::escape_table_cell;

/// How the saved history is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryView {
    /// One markdown table under the worksheet's own header labels.
    #[default]
    Grid,
    /// Chat-style blocks: timestamp caption, input, output.
    Transcript,
}

/// Markdown history renderer
pub struct MarkdownHistoryRenderer {
    view: HistoryView,
}

impl MarkdownHistoryRenderer {
    pub fn new(view: HistoryView) -> Self {
        Self { view }
    }

    /// One label per worksheet column. The three positional columns fall
    /// back to the default labels when the worksheet leaves them blank.
    fn column_labels(&self, headers: &[String]) -> Vec<String> {
        (0..headers.len().max(RECORD_WIDTH))
            .map(|i| {
                let label = headers.get(i).filter(|h| !h.trim().is_empty()).cloned();
                match label {
                    Some(label) => label,
                    None if i < RECORD_WIDTH => DEFAULT_HEADERS[i].to_string(),
                    None => String::new(),
                }
            })
            .collect()
    }

    fn format_grid(&self, headers: &[String], rows: &[Vec<String>]) -> String {
        let labels = self.column_labels(headers);
        let mut output = String::new();
        output.push_str(&format!(
            "| {} |\n",
            labels
                .iter()
                .map(|l| escape_table_cell(l))
                .collect::<Vec<_>>()
                .join(" | ")
        ));
        output.push_str(&format!("|{}\n", " --- |".repeat(labels.len())));

        for row in rows {
            let cells: Vec<String> = (0..labels.len())
                .map(|i| escape_table_cell(row.get(i).map(String::as_str).unwrap_or("")))
                .collect();
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output
    }

    fn format_transcript(&self, entries: &[Record]) -> String {
        let mut output = String::new();
        for record in entries {
            output.push_str(&format!("*{}*\n\n", record.timestamp));
            output.push_str(&format!("> **In:** {}\n\n", quote_continuation(&record.input_text)));
            if record.output_text.trim().is_empty() {
                output.push_str("> **Out:** *[No output]*\n\n");
            } else {
                output.push_str(&format!(
                    "> **Out:** {}\n\n",
                    quote_continuation(&record.output_text)
                ));
            }
            output.push_str("---\n\n");
        }
        output
    }
}

/// Keeps multi-line text inside the surrounding blockquote.
fn quote_continuation(text: &str) -> String {
    text.trim().lines().collect::<Vec<_>>().join("\n> ")
}

impl HistoryRenderer for MarkdownHistoryRenderer {
    fn render(&self, history: &History) -> String {
        let mut output = String::new();
        output.push_str(&format!("# {}\n\n", history.title));
        output.push_str("## Saved entries\n\n");

        if history.is_empty() {
            output.push_str("*No saved entries yet.*\n");
            return output;
        }

        output.push_str(&format!("*{} entries, newest first*\n\n", history.entries.len()));
        match self.view {
            HistoryView::Grid => output.push_str(&self.format_grid(&history.headers, &history.rows)),
            HistoryView::Transcript => output.push_str(&self.format_transcript(&history.entries)),
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlog_core::domain::Table;

    fn history(grid: &[&[&str]]) -> History {
        let grid = grid
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        History::from_table("My AI Tool", &Table::from_grid(grid))
    }

    #[test]
    fn test_empty_history_renders_empty_state() {
        for view in [HistoryView::Grid, HistoryView::Transcript] {
            let out = MarkdownHistoryRenderer::new(view).render(&history(&[]));
            assert!(out.starts_with("# My AI Tool\n"));
            assert!(out.contains("No saved entries yet."));
        }
    }

    #[test]
    fn test_grid_uses_worksheet_headers_and_newest_first() {
        let h = history(&[
            &["foo", "bar", "baz"],
            &["2024-01-01", "first", "one"],
            &["2024-01-02", "second", "two"],
        ]);
        let out = MarkdownHistoryRenderer::new(HistoryView::Grid).render(&h);

        assert!(out.contains("| foo | bar | baz |\n| --- | --- | --- |\n"));
        let second = out.find("| 2024-01-02 | second | two |").unwrap();
        let first = out.find("| 2024-01-01 | first | one |").unwrap();
        assert!(second < first);
        assert!(out.contains("*2 entries, newest first*"));
    }

    #[test]
    fn test_grid_escapes_cells() {
        let h = history(&[&["date", "input", "output"], &["t", "a|b", "line1\nline2"]]);
        let out = MarkdownHistoryRenderer::new(HistoryView::Grid).render(&h);
        assert!(out.contains("| t | a\\|b | line1<br>line2 |"));
    }

    #[test]
    fn test_grid_fills_missing_header_labels() {
        let h = history(&[&["when"], &["t", "in", "out"]]);
        let out = MarkdownHistoryRenderer::new(HistoryView::Grid).render(&h);
        assert!(out.contains("| when | input | output |"));
    }

    #[test]
    fn test_grid_shows_columns_beyond_the_third() {
        let h = history(&[
            &["date", "input", "output", "tag"],
            &["t1", "a", "b", "work"],
            &["t2", "c", "d"],
        ]);
        let out = MarkdownHistoryRenderer::new(HistoryView::Grid).render(&h);

        assert!(out.contains("| date | input | output | tag |\n| --- | --- | --- | --- |\n"));
        assert!(out.contains("| t1 | a | b | work |"));
        assert!(out.contains("| t2 | c | d |  |"));
    }

    #[test]
    fn test_transcript_renders_every_entry_newest_first() {
        let mut grid: Vec<Vec<String>> = vec![vec!["d".into(), "i".into(), "o".into()]];
        for n in 0..25 {
            grid.push(vec![format!("t{n:02}"), format!("question {n}"), format!("answer {n}")]);
        }
        let h = History::from_table("log", &Table::from_grid(grid));
        let out = MarkdownHistoryRenderer::new(HistoryView::Transcript).render(&h);

        assert_eq!(out.matches("**In:**").count(), 25);
        let positions: Vec<usize> = (0..25)
            .map(|n| out.find(&format!("*t{n:02}*")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_transcript_marks_empty_output() {
        let h = history(&[&["d", "i", "o"], &["t", "hello", ""]]);
        let out = MarkdownHistoryRenderer::new(HistoryView::Transcript).render(&h);
        assert!(out.contains("> **In:** hello\n"));
        assert!(out.contains("*[No output]*"));
    }

    #[test]
    fn test_transcript_keeps_multiline_text_quoted() {
        let h = history(&[&["d", "i", "o"], &["t", "q", "first\nsecond"]]);
        let out = MarkdownHistoryRenderer::new(HistoryView::Transcript).render(&h);
        assert!(out.contains("> **Out:** first\n> second\n"));
    }
}
