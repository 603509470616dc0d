use std::collections::HashMap;

use crate::{error::FlatFileError, source};

/// A lookup table read from a delimited file: the first field of each line is the key, the
/// following fields are the columns.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    location: Option<String>,
    separator: String,
    case_sensitive: bool,
    entries: HashMap<String, Vec<String>>,
}

impl Dictionary {
    pub fn open(
        location: &str,
        separator: &str,
        case_sensitive: bool,
    ) -> Result<Self, FlatFileError> {
        let text = source::read_text(location)?;
        let mut dictionary = Self::from_text(&text, separator, case_sensitive);
        dictionary.location = Some(location.to_string());
        log::info!("dictionary {location}: {} entries", dictionary.entries.len());
        Ok(dictionary)
    }

    pub fn from_text(text: &str, separator: &str, case_sensitive: bool) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let mut fields = if separator.is_empty() {
                vec![line.to_string()]
            } else {
                line.split(separator).map(str::to_string).collect::<Vec<_>>()
            };
            let key = Self::normalize(&fields.remove(0), case_sensitive);
            // The first definition of a key wins
            entries.entry(key).or_insert(fields);
        }
        Self {
            location: None,
            separator: separator.to_string(),
            case_sensitive,
            entries,
        }
    }

    fn normalize(key: &str, case_sensitive: bool) -> String {
        if case_sensitive {
            key.trim().to_string()
        } else {
            key.trim().to_lowercase()
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Returns the value in `column` (0 being the first field after the key) of the entry for
    /// `key`.
    pub fn lookup(&self, key: &str, column: usize) -> Option<&str> {
        self.entries
            .get(&Self::normalize(key, self.case_sensitive))
            .and_then(|columns| columns.get(column))
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .contains_key(&Self::normalize(key, self.case_sensitive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAXONOMY: &str = "human\t9606\tHomo sapiens\nmouse\t10090\tMus musculus\nhuman\t0\n";

    #[test]
    fn lookup_columns() {
        let dictionary = Dictionary::from_text(TAXONOMY, "\t", true);
        assert_eq!(dictionary.lookup("human", 0), Some("9606"));
        assert_eq!(dictionary.lookup("mouse", 1), Some("Mus musculus"));
        assert_eq!(dictionary.lookup("mouse", 2), None);
        assert_eq!(dictionary.lookup("Human", 0), None);
    }

    #[test]
    fn case_insensitive_lookup() {
        let dictionary = Dictionary::from_text(TAXONOMY, "\t", false);
        assert_eq!(dictionary.lookup("HUMAN", 1), Some("Homo sapiens"));
        assert!(dictionary.contains("Mouse"));
    }
}
