//! Tabular-to-knowledge-graph materialization.
//!
//! This crate turns flat tabular records into subject-predicate-object
//! triples without hand-authoring an ontology:
//!
//! - [`Table`] - ordered named columns, rows of typed [`Value`] cells
//! - [`encode_line`] - one cell to one serialized triple line
//! - [`GraphMaterializer`] - full-table traversal with streamed writes
//!
//! The mapping is **total and deterministic**: every cell produces
//! exactly one triple (missing cells via a per-predicate dummy entity),
//! and re-running materialization on identical input produces
//! byte-identical output.
//!
//! # Example
//!
//! ```rust
//! use factum_core::{GraphMaterializer, Table, Value};
//!
//! let mut table = Table::new(vec!["name".into(), "price".into()]);
//! table.push_row(vec![Value::from("widget a"), Value::from(9.5)]).unwrap();
//! table.push_row(vec![Value::from("widget b"), Value::Missing]).unwrap();
//!
//! let out = GraphMaterializer::new().materialize(&table).unwrap();
//! assert_eq!(out.triples.len(), 4);
//! // Missing price imputed with the per-predicate sentinel entity:
//! assert_eq!(out.triples[3].object, "priceDummy");
//! ```

mod error;
mod log;
mod materialize;
mod table;
mod triple;
mod value;

pub use error::{Error, Result};
pub use log::{EventSink, NullSink, TracingSink};
pub use materialize::{
    canonicalize_predicate, GraphMaterializer, Materialized, RDF_TYPE_RELATION, TYPE_MARKER,
};
pub use table::Table;
pub use triple::{encode_line, RawTriple, XSD_DOUBLE, XSD_INTEGER};
pub use value::Value;
