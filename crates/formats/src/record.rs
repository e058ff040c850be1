//! Untyped corpus record as read from, and written to, disk

use serde_json::Value;

/// A single row of a corpus file
#[derive(Debug, Clone)]
pub struct Record {
    /// The JSON object for this row
    pub data: Value,
    /// Zero-based index of the row within the corpus being read; a
    /// directory counts across all of its files
    pub position: usize,
}

impl Record {
    /// Create a new record
    pub fn new(data: Value, position: usize) -> Self {
        Self { data, position }
    }

    /// Look up a string column
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(|v| v.as_str())
    }

    /// Byte length of the `size` column, falling back to the length of the
    /// `content` column when `size` is missing.
    pub fn byte_size(&self) -> u64 {
        self.data
            .get("size")
            .and_then(|v| v.as_u64())
            .or_else(|| self.str_field("content").map(|c| c.len() as u64))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_creation() {
        let data = json!({"content": "hello", "lang": "Python"});
        let record = Record::new(data.clone(), 0);
        assert_eq!(record.data, data);
        assert_eq!(record.position, 0);
        assert_eq!(record.str_field("lang"), Some("Python"));
        assert_eq!(record.str_field("missing"), None);
    }

    #[test]
    fn test_byte_size_prefers_size_column() {
        let record = Record::new(json!({"content": "hello", "size": 42}), 0);
        assert_eq!(record.byte_size(), 42);

        let record = Record::new(json!({"content": "héllo"}), 1);
        assert_eq!(record.byte_size(), 6);

        let record = Record::new(json!({"id": 1}), 2);
        assert_eq!(record.byte_size(), 0);
    }
}
