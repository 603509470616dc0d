use std::collections::BTreeMap;

use crate::{error::FlatFileError, source};

/// A delimited text file read record by record.
///
/// Records are lines by default, or the pieces between occurrences of a custom multi-character
/// record separator (line breaks inside such a record are dropped). Fields inside a record are
/// addressed by dot-separated index paths: `2.0` is the first sub-field of the third field, where
/// the record is split by the separator registered for the path prefix `""` and the third field by
/// the one registered for `"2"`.
#[derive(Clone, Debug, Default)]
pub struct FlatFile {
    location: Option<String>,
    records: Vec<String>,
    next_record: usize,
    line: String,
    end_of_file: bool,
    line_separator: Option<String>,
    separators: BTreeMap<String, String>,
    first_line_for_titles: bool,
}

/// Parses a dot-separated field path like `1.0.2`.
pub fn parse_field_path(path: &str) -> Result<Vec<usize>, FlatFileError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split('.')
        .map(|index| index.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| FlatFileError::InvalidFieldPath(path.to_string()))
}

fn split_records(text: &str, line_separator: Option<&str>) -> Vec<String> {
    match line_separator {
        None | Some("") => text.lines().map(str::to_string).collect(),
        Some(separator) => {
            let mut records: Vec<String> = text
                .split(separator)
                .map(|record| record.lines().collect::<String>())
                .collect();
            // Text after the last separator only counts if it holds something
            if records.last().is_some_and(|last| last.trim().is_empty()) {
                records.pop();
            }
            records
        }
    }
}

impl FlatFile {
    /// Opens the flat file at `location` (a path or URL) and reads its first record.
    pub fn open(location: &str, line_separator: Option<&str>) -> Result<Self, FlatFileError> {
        let text = source::read_text(location)?;
        let mut flat_file = Self::from_text(&text, line_separator);
        flat_file.location = Some(location.to_string());
        log::info!(
            "flat file {location}: {} records",
            flat_file.records.len()
        );
        Ok(flat_file)
    }

    /// Builds a flat file from in-memory text and reads its first record.
    pub fn from_text(text: &str, line_separator: Option<&str>) -> Self {
        let mut flat_file = Self {
            records: split_records(text, line_separator),
            line_separator: line_separator.map(str::to_string),
            end_of_file: true,
            ..Default::default()
        };
        flat_file.next_line();
        flat_file
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn line_separator(&self) -> Option<&str> {
        self.line_separator.as_deref()
    }

    /// Advances to the next record. At the end of the file the last record stays current and
    /// [`has_line`](Self::has_line) turns false.
    pub fn next_line(&mut self) {
        match self.records.get(self.next_record) {
            Some(record) => {
                self.line = record.clone();
                self.next_record += 1;
                self.end_of_file = false;
            }
            None => self.end_of_file = true,
        }
    }

    /// Advances to the next record for which the field at `path` is not empty.
    pub fn next_line_with_field(&mut self, path: &str) -> Result<(), FlatFileError> {
        self.next_line();
        while !self.end_of_file && self.element_at(path, None)?.is_empty() {
            self.next_line();
        }
        Ok(())
    }

    pub fn has_line(&self) -> bool {
        !self.end_of_file
    }

    /// Rewinds to the first record.
    pub fn restart(&mut self) {
        self.next_record = 0;
        self.line.clear();
        self.end_of_file = true;
        self.next_line();
    }

    /// The current record
    pub fn line(&self) -> &str {
        &self.line
    }

    /// 1-based number of the current record, 0 before the first one
    pub fn line_number(&self) -> usize {
        self.next_record
    }

    pub fn set_separator(&mut self, path_prefix: impl Into<String>, separator: impl Into<String>) {
        self.separators.insert(path_prefix.into(), separator.into());
    }

    pub fn separator(&self, path_prefix: &str) -> Option<&str> {
        self.separators.get(path_prefix).map(String::as_str)
    }

    pub fn separators(&self) -> &BTreeMap<String, String> {
        &self.separators
    }

    pub fn set_first_line_for_titles(&mut self, first_line_for_titles: bool) {
        self.first_line_for_titles = first_line_for_titles;
    }

    pub fn first_line_for_titles(&self) -> bool {
        self.first_line_for_titles
    }

    /// Returns the field of the current record at `path`, or an empty string if the record has
    /// no such field. `model_path` names the separators to use when it differs from `path`
    /// (e.g. for repeated fields that share the separators of their first occurrence).
    pub fn element_at(&self, path: &str, model_path: Option<&str>) -> Result<String, FlatFileError> {
        if path.is_empty() {
            return Ok(self.line.clone());
        }
        let indices = parse_field_path(path)?;
        let model: Vec<&str> = model_path.unwrap_or(path).split('.').collect();

        let mut prefix = String::new();
        let mut field = self.line.as_str();
        for (depth, index) in indices.into_iter().enumerate() {
            let next = match self.separators.get(&prefix) {
                Some(separator) if !separator.is_empty() => field.split(separator.as_str()).nth(index),
                _ => (index == 0).then_some(field),
            };
            let Some(next) = next else {
                return Ok(String::new());
            };
            field = next;

            let step = model.get(depth).copied().unwrap_or_default();
            if depth > 0 {
                prefix.push('.');
            }
            prefix.push_str(step);
        }
        Ok(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interactions() -> FlatFile {
        let mut file = FlatFile::from_text("P1\tP2\tsp|9606;tr|10090\nP3\t\t\n", None);
        file.set_separator("", "\t");
        file.set_separator("2", ";");
        file.set_separator("2.0", "|");
        file
    }

    #[test]
    fn nested_fields() {
        let file = interactions();
        assert_eq!(file.element_at("0", None).unwrap(), "P1");
        assert_eq!(file.element_at("2", None).unwrap(), "sp|9606;tr|10090");
        assert_eq!(file.element_at("2.1", None).unwrap(), "tr|10090");
        assert_eq!(file.element_at("2.1.1", Some("2.0.1")).unwrap(), "10090");
        assert_eq!(file.element_at("", None).unwrap(), file.line());
    }

    #[test]
    fn missing_fields_are_empty() {
        let mut file = interactions();
        assert_eq!(file.element_at("7", None).unwrap(), "");
        file.next_line();
        assert_eq!(file.line_number(), 2);
        assert_eq!(file.element_at("1", None).unwrap(), "");
        assert_eq!(file.element_at("2.1", None).unwrap(), "");
        assert!(matches!(
            file.element_at("x.1", None),
            Err(FlatFileError::InvalidFieldPath(_))
        ));
    }

    #[test]
    fn custom_record_separator() {
        let mut file = FlatFile::from_text("a,b\nc//d//\n", Some("//"));
        assert_eq!(file.line(), "a,bc");
        file.next_line();
        assert_eq!(file.line(), "d");
        assert!(file.has_line());
        file.next_line();
        assert!(!file.has_line());
        file.restart();
        assert_eq!(file.line(), "a,bc");
        assert_eq!(file.line_number(), 1);
    }

    #[test]
    fn skip_lines_without_field() {
        let mut file = FlatFile::from_text("h\na\t\nb\tx\n", None);
        file.set_separator("", "\t");
        file.next_line_with_field("1").unwrap();
        assert_eq!(file.line(), "b\tx");
        file.next_line_with_field("1").unwrap();
        assert!(!file.has_line());
    }

    #[test]
    fn open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "one\ttwo\n").unwrap();
        let mut file = FlatFile::open(path.to_str().unwrap(), None).unwrap();
        file.set_separator("", "\t");
        assert_eq!(file.element_at("1", None).unwrap(), "two");
        assert_eq!(file.location(), path.to_str());
    }
}
