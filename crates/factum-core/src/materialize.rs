//! Graph materialization: a full table to a serialized triple file.
//!
//! Traversal is row-major (each row = one subject), then column-major
//! within the row (each column = one predicate). Output lines are
//! streamed through a buffered writer; the in-memory triple list is
//! accumulated unless suppressed for large inputs.

use crate::error::Result;
use crate::log::{EventSink, TracingSink};
use crate::table::Table;
use crate::triple::{encode_line, RawTriple};
use crate::value::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Substring marking a predicate as a type assertion.
pub const TYPE_MARKER: &str = "resource/type";

/// Canonical relation name for type assertions.
///
/// Type predicates are rewritten to this fixed name so that downstream
/// type-based evaluation can recognize them uniformly.
pub const RDF_TYPE_RELATION: &str = "rdf-syntax-ns#type";

/// Rewrite type-marker predicates to the canonical rdf-type relation.
pub fn canonicalize_predicate(predicate: &str) -> &str {
    if predicate.contains(TYPE_MARKER) {
        RDF_TYPE_RELATION
    } else {
        predicate
    }
}

/// Output of one materialization run.
#[derive(Debug)]
pub struct Materialized {
    /// Raw triples in traversal order. Empty if collection was suppressed.
    pub triples: Vec<RawTriple>,
    /// Path of the serialized triple file, if one was written.
    pub path: Option<PathBuf>,
}

/// Materializes a [`Table`] into triples.
///
/// # Example
///
/// ```rust
/// use factum_core::{GraphMaterializer, Table, Value};
///
/// let mut table = Table::new(vec!["colX".into(), "colY".into()]);
/// table.push_row(vec![Value::from("A"), Value::from(1)]).unwrap();
/// table.push_row(vec![Value::from("B"), Value::from(2)]).unwrap();
///
/// let out = GraphMaterializer::new().materialize(&table).unwrap();
/// assert_eq!(out.triples.len(), 4);
/// ```
pub struct GraphMaterializer {
    output: Option<PathBuf>,
    collect: bool,
    sink: Box<dyn EventSink>,
}

impl Default for GraphMaterializer {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphMaterializer {
    /// Create a materializer that only collects triples in memory.
    pub fn new() -> Self {
        Self {
            output: None,
            collect: true,
            sink: Box::new(TracingSink),
        }
    }

    /// Also serialize triples to the given file (created or overwritten).
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Suppress the in-memory triple list. Useful for large tables when
    /// only the serialized file is needed.
    pub fn without_collection(mut self) -> Self {
        self.collect = false;
        self
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Materialize the table.
    ///
    /// Validates the table first and aborts with `InvalidInput` before
    /// any write if it is malformed. Every cell yields exactly one
    /// triple, so the output length is rows × columns.
    pub fn materialize(&self, table: &Table) -> Result<Materialized> {
        table.validate()?;

        self.sink.info("Knowledge graph is being serialized");
        self.sink
            .info("Missing values are imputed with one dummy entity per predicate");
        self.sink.info(&format!(
            "Predicates containing '{TYPE_MARKER}' are rewritten to '{RDF_TYPE_RELATION}'"
        ));

        let mut writer = match &self.output {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };

        let mut triples = Vec::new();
        if self.collect {
            triples.reserve(table.num_rows() * table.num_columns());
        }

        for (subject, cells) in table.iter_rows() {
            for (predicate, value) in table.columns().iter().zip(cells) {
                let predicate = canonicalize_predicate(predicate);
                let line = encode_line(subject, predicate, value)?;

                if let Some(w) = writer.as_mut() {
                    writeln!(w, "{line}")?;
                }
                if self.collect {
                    triples.push(RawTriple::new(subject, predicate, object_form(predicate, value)));
                }
            }
        }

        if let Some(mut w) = writer {
            w.flush()?;
        }
        if let Some(path) = &self.output {
            self.sink
                .info(&format!("Serialized triple file written to {}", path.display()));
        }

        Ok(Materialized {
            triples,
            path: self.output.clone(),
        })
    }
}

/// Raw object identifier for the in-memory triple list.
///
/// Mirrors the serialized form minus decoration: the dummy sentinel for
/// missing cells, whitespace-stripped strings, and the plain string form
/// of numeric literals.
fn object_form(predicate: &str, value: &Value) -> String {
    if value.is_missing() {
        format!("{predicate}Dummy")
    } else {
        match value {
            Value::Str(s) => s.replace(' ', ""),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn two_by_two() -> Table {
        let mut t = Table::new(vec!["colX".into(), "colY".into()]);
        t.push_row(vec![Value::from("A"), Value::from(1)]).unwrap();
        t.push_row(vec![Value::from("B"), Value::from(2)]).unwrap();
        t
    }

    #[test]
    fn test_cell_count_equals_triple_count() {
        let out = GraphMaterializer::new().materialize(&two_by_two()).unwrap();
        assert_eq!(out.triples.len(), 4);
    }

    #[test]
    fn test_two_by_two_scenario() {
        let out = GraphMaterializer::new().materialize(&two_by_two()).unwrap();
        assert_eq!(out.triples[0], RawTriple::new("Event_0", "colX", "A"));
        assert_eq!(out.triples[1], RawTriple::new("Event_0", "colY", "1"));
        assert_eq!(out.triples[2], RawTriple::new("Event_1", "colX", "B"));
        assert_eq!(out.triples[3], RawTriple::new("Event_1", "colY", "2"));
    }

    #[test]
    fn test_serialized_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.nt");
        GraphMaterializer::new()
            .with_output(&path)
            .materialize(&two_by_two())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "<Event_0> <colX> <A> .");
        assert_eq!(
            lines[1],
            "<Event_0> <colY> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> ."
        );
        assert_eq!(lines[2], "<Event_1> <colX> <B> .");
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let table = two_by_two();
        let p1 = dir.path().join("a.nt");
        let p2 = dir.path().join("b.nt");
        GraphMaterializer::new().with_output(&p1).materialize(&table).unwrap();
        GraphMaterializer::new().with_output(&p2).materialize(&table).unwrap();
        assert_eq!(std::fs::read(&p1).unwrap(), std::fs::read(&p2).unwrap());
    }

    #[test]
    fn test_type_predicate_canonicalized() {
        let mut t = Table::new(vec!["dbpedia/resource/type".into()]);
        t.push_row(vec![Value::from("Company")]).unwrap();
        let out = GraphMaterializer::new().materialize(&t).unwrap();
        assert_eq!(out.triples[0].predicate, RDF_TYPE_RELATION);
    }

    #[test]
    fn test_invalid_table_fails_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.nt");
        let t = Table::new(vec![]);
        let err = GraphMaterializer::new()
            .with_output(&path)
            .materialize(&t)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_collection_suppressed() {
        let out = GraphMaterializer::new()
            .without_collection()
            .materialize(&two_by_two())
            .unwrap();
        assert!(out.triples.is_empty());
    }

    #[test]
    fn test_missing_cell_dummy_in_memory() {
        let mut t = Table::new(vec!["price".into()]);
        t.push_row(vec![Value::Missing]).unwrap();
        let out = GraphMaterializer::new().materialize(&t).unwrap();
        assert_eq!(out.triples[0].object, "priceDummy");
    }
}
