use std::fmt;

/// Convert a 1-based column number to its letter name (1 -> A, 27 -> AA)
pub fn col_to_letter(col: u16) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Convert a column letter name to its 1-based number
///
/// Returns `None` for an empty string or anything other than ASCII letters.
pub fn letter_to_col(letters: &str) -> Option<u16> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u16, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u16) - ('A' as u16) + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// A single cell such as `B3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub column: u16,
    pub row: u32,
}

impl CellRef {
    pub fn new(column: u16, row: u32) -> Self {
        CellRef { column, row }
    }

    /// Parse A1 notation (`B3`, `aa10`)
    pub fn parse(name: &str) -> Option<Self> {
        let split = name.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = name.split_at(split);
        let column = letter_to_col(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellRef { column, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.column), self.row)
    }
}

/// A vertical run of cells within one column, e.g. `D6:D14`
///
/// Built from the (column, first row, last row) triple; the A1 text is only
/// ever produced from these fields, never edited as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRange {
    pub column: u16,
    pub row_start: u32,
    pub row_end: u32,
}

impl ColumnRange {
    pub fn new(column: u16, row_start: u32, row_end: u32) -> Self {
        ColumnRange {
            column,
            row_start,
            row_end,
        }
    }

    /// Same rows, different column
    pub fn with_column(self, column: u16) -> Self {
        ColumnRange { column, ..self }
    }

    /// Number of rows covered (inclusive on both ends)
    pub fn len(&self) -> usize {
        (self.row_end.saturating_sub(self.row_start) + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.row_end < self.row_start
    }

    pub fn start(&self) -> CellRef {
        CellRef::new(self.column, self.row_start)
    }

    pub fn end(&self) -> CellRef {
        CellRef::new(self.column, self.row_end)
    }

    /// Range prefixed with a quoted worksheet title: `'Week 1'!D6:D14`
    pub fn qualified(&self, sheet: &str) -> String {
        format!("{}!{}", quote_sheet(sheet), self)
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start(), self.end())
    }
}

/// Quote a worksheet title for use in A1 notation
pub fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_both_ways() {
        assert_eq!(col_to_letter(1), "A");
        assert_eq!(col_to_letter(4), "D");
        assert_eq!(col_to_letter(26), "Z");
        assert_eq!(col_to_letter(27), "AA");
        assert_eq!(col_to_letter(702), "ZZ");
        assert_eq!(col_to_letter(703), "AAA");

        assert_eq!(letter_to_col("A"), Some(1));
        assert_eq!(letter_to_col("h"), Some(8));
        assert_eq!(letter_to_col("AA"), Some(27));
        assert_eq!(letter_to_col(""), None);
        assert_eq!(letter_to_col("A1"), None);
    }

    #[test]
    fn cell_ref_parse_and_display() {
        let cell = CellRef::parse("B3").unwrap();
        assert_eq!(cell, CellRef::new(2, 3));
        assert_eq!(cell.to_string(), "B3");
        assert_eq!(CellRef::parse("aa10").unwrap().to_string(), "AA10");
        assert!(CellRef::parse("B0").is_none());
        assert!(CellRef::parse("12").is_none());
        assert!(CellRef::parse("B").is_none());
    }

    #[test]
    fn column_range_renders_from_fields() {
        let range = ColumnRange::new(4, 6, 14);
        assert_eq!(range.to_string(), "D6:D14");
        assert_eq!(range.len(), 9);

        // Moving to column H changes both ends and nothing else.
        assert_eq!(range.with_column(8).to_string(), "H6:H14");
        assert_eq!(ColumnRange::new(4, 34, 42).with_column(5).to_string(), "E34:E42");
    }

    #[test]
    fn qualified_range_quotes_title() {
        let range = ColumnRange::new(9, 20, 28);
        assert_eq!(range.qualified("01-01-2024_01-07-2024"), "'01-01-2024_01-07-2024'!I20:I28");
        assert_eq!(range.qualified("Bob's week"), "'Bob''s week'!I20:I28");
    }
}
