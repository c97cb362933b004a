//! Diagnostic query result models.

/// Rows returned by a diagnostic query, already rendered to text.
///
/// Column and row order are exactly what the database returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    /// Column names.
    pub columns: Vec<String>,
    /// One entry per row, one cell per column.
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Creates a table from column names and rendered rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders the table as fixed-width text.
    ///
    /// Each cell is left-aligned, padded with spaces to `width` and cut off at
    /// `width` characters. Every line, the header included, ends in `\n`.
    pub fn to_text(&self, width: usize) -> String {
        let mut out = String::new();
        push_line(&mut out, &self.columns, width);
        for row in &self.rows {
            push_line(&mut out, row, width);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], width: usize) {
    for cell in cells {
        out.push_str(&format!("{:<width$.width$}", cell, width = width));
    }
    out.push('\n');
}
