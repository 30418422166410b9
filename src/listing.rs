/// Separator between the marker and the server name in the first cell.
pub const NBSP: char = '\u{a0}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Text of the first child node, the value the comparators look at.
    pub text: String,
    /// Text of the whole cell.
    pub full_text: String,
    pub superscript: Option<String>,
    pub links: Vec<Link>,
}

impl Cell {
    pub fn plain(text: &str) -> Self {
        let text = text.trim().to_string();
        Self {
            full_text: text.clone(),
            text,
            superscript: None,
            links: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_superscript(mut self, exponent: &str) -> Self {
        self.superscript = Some(exponent.trim().to_string());
        self
    }

    #[cfg(test)]
    pub fn with_link(mut self, text: &str, href: &str) -> Self {
        self.links.push(Link {
            text: text.to_string(),
            href: href.to_string(),
        });
        self
    }

    pub fn display(&self) -> String {
        match &self.superscript {
            Some(exponent) => format!("{}^{}", self.text, exponent),
            None => self.full_text.replace(NBSP, " "),
        }
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub selected: bool,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            selected: false,
        }
    }

    /// The server name: the token after the non-breaking space in the first
    /// cell, or the whole first cell when there is no separator.
    pub fn display_name(&self) -> &str {
        let first = match self.cells.first() {
            Some(cell) => cell.full_text.trim(),
            None => return "",
        };
        first.split(NBSP).nth(1).unwrap_or(first)
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Header the document marks as sorted, if any.
    pub sorted_header: Option<usize>,
}

impl Listing {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            headers,
            rows,
            sorted_header: None,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn ncolumns(&self) -> usize {
        self.headers.len()
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }
}
