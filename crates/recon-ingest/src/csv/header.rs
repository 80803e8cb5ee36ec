//! CSV header parsing.

/// Result of CSV header analysis.
#[derive(Debug, Clone)]
pub struct CsvHeaders {
    /// Column names as written, trimmed.
    pub columns: Vec<String>,
    /// Lines above the header row (titles, notes), kept for diagnostics.
    pub preamble: Vec<String>,
}

impl CsvHeaders {
    pub fn new(columns: Vec<String>, preamble: Vec<String>) -> Self {
        Self { columns, preamble }
    }

    /// Number of lines above the header row.
    pub fn skip_rows(&self) -> usize {
        self.preamble.len()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// First column name that appears more than once.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.columns
            .iter()
            .enumerate()
            .find(|(i, c)| self.columns[..*i].contains(c))
            .map(|(_, c)| c.as_str())
    }
}

/// Normalizes a header value by trimming whitespace.
pub fn normalize_header(value: &str) -> String {
    value.trim().to_string()
}

/// Parses a CSV line into fields, handling quoted values.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => {
                in_quotes = true;
            }
            '"' if in_quotes => {
                // Escaped quote ("")
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ',' if !in_quotes => {
                fields.push(normalize_header(&current));
                current.clear();
            }
            _ => {
                current.push(c);
            }
        }
    }

    fields.push(normalize_header(&current));
    fields
}
