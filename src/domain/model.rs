use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the dataset, keyed by column name. Keys keep insertion order,
/// so a record read from CSV iterates in header order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record of string cells, e.g. from a CSV row.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let data = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// The field as a string, or `None` when absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Inserts or overwrites a field. An existing field keeps its position.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.data.insert(field.to_string(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Text written to a delimited output cell for `field`.
    pub fn cell(&self, field: &str) -> String {
        match self.data.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Why a row was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    InvalidEmail,
    NotAttended,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::InvalidEmail => write!(f, "invalid teacher email"),
            DropReason::NotAttended => write!(f, "attendance flag is not 0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Retained(Record),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub rows_read: usize,
    pub rows_retained: usize,
    pub dropped_invalid_email: usize,
    pub dropped_not_attended: usize,
}

impl TransformStats {
    pub fn record(&mut self, outcome: &RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Retained(_) => self.rows_retained += 1,
            RowOutcome::Dropped(DropReason::InvalidEmail) => self.dropped_invalid_email += 1,
            RowOutcome::Dropped(DropReason::NotAttended) => self.dropped_not_attended += 1,
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.dropped_invalid_email + self.dropped_not_attended
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed_records: Vec<Record>,
    pub tsv_output: String,
    pub stats: TransformStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_existing_position() {
        let mut record = Record::from_pairs([("a", "1"), ("b", "2")]);
        record.set("a", "x");
        record.set("c", 3);

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(record.get_str("a"), Some("x"));
    }

    #[test]
    fn test_cell_text() {
        let mut record = Record::new();
        record.set("n", 42);
        record.set("s", "text");
        record.set("z", Value::Null);

        assert_eq!(record.cell("n"), "42");
        assert_eq!(record.cell("s"), "text");
        assert_eq!(record.cell("z"), "");
        assert_eq!(record.cell("missing"), "");
    }

    #[test]
    fn test_stats_counts_outcomes() {
        let mut stats = TransformStats::default();
        stats.record(&RowOutcome::Retained(Record::new()));
        stats.record(&RowOutcome::Dropped(DropReason::InvalidEmail));
        stats.record(&RowOutcome::Dropped(DropReason::NotAttended));
        stats.record(&RowOutcome::Dropped(DropReason::NotAttended));

        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.rows_retained, 1);
        assert_eq!(stats.rows_dropped(), 3);
        assert_eq!(stats.dropped_not_attended, 2);
    }
}
