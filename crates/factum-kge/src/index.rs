//! Triple indexing: a serialized triple file to dense integer indices.
//!
//! [`TripleIndex`] deserializes an n-triples-like file into:
//!
//! - bidirectional entity ↔ index and relation ↔ index mappings, assigned
//!   in first-occurrence order (deterministic given a deterministic file)
//! - the full indexed triple list, with literal objects pruned (literals
//!   are not link-prediction targets)
//! - an (entity, relation) → tail-set vocabulary over ALL kept triples,
//!   used to mask known-true answers during evaluation
//!
//! Everything is read-only after construction; a run regenerates its
//! index from scratch rather than updating one incrementally.

use crate::error::{Error, Result};
use factum_core::{EventSink, TracingSink};
use ndarray::Array2;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Object term of one parsed line.
#[derive(Debug, Clone, PartialEq)]
enum ObjectTerm {
    /// Angle-bracketed entity reference.
    Entity(String),
    /// Quoted literal with a datatype tag. Pruned during indexing.
    Literal(String),
}

/// Parse one serialized triple line into raw identifiers.
///
/// Grammar: `<subject> <predicate> object .` where `object` is either
/// `<entity>` or `"literal"^^<datatype>`. Decoration is stripped.
fn parse_line(line_no: usize, line: &str) -> Result<(String, String, ObjectTerm)> {
    let corrupt = || Error::CorruptGraphFile {
        line: line_no,
        content: line.to_string(),
    };

    let rest = line.trim();
    let rest = rest.strip_suffix('.').ok_or_else(corrupt)?.trim_end();

    let rest = rest.strip_prefix('<').ok_or_else(corrupt)?;
    let (subject, rest) = rest.split_once('>').ok_or_else(corrupt)?;

    let rest = rest.trim_start().strip_prefix('<').ok_or_else(corrupt)?;
    let (predicate, rest) = rest.split_once('>').ok_or_else(corrupt)?;

    let object_tok = rest.trim();
    let object = if let Some(inner) = object_tok.strip_prefix('<') {
        let inner = inner.strip_suffix('>').ok_or_else(corrupt)?;
        ObjectTerm::Entity(inner.to_string())
    } else if let Some(inner) = object_tok.strip_prefix('"') {
        let (value, tag) = inner.split_once('"').ok_or_else(corrupt)?;
        if !tag.starts_with("^^<") || !tag.ends_with('>') {
            return Err(corrupt());
        }
        ObjectTerm::Literal(value.to_string())
    } else {
        return Err(corrupt());
    };

    if subject.is_empty() || predicate.is_empty() {
        return Err(corrupt());
    }

    Ok((subject.to_string(), predicate.to_string(), object))
}

/// Read-only index over a serialized triple file.
#[derive(Debug)]
pub struct TripleIndex {
    entities: Vec<String>,
    entity_idx: HashMap<String, usize>,
    relations: Vec<String>,
    relation_idx: HashMap<String, usize>,
    triples: Vec<(usize, usize, usize)>,
    er_vocab: HashMap<(usize, usize), Vec<usize>>,
    er_pairs: Vec<(usize, usize)>,
}

impl TripleIndex {
    /// Load an index from a serialized triple file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_sink(path, &TracingSink)
    }

    /// Load an index, reporting progress through the given sink.
    pub fn load_with_sink(path: impl AsRef<Path>, sink: &dyn EventSink) -> Result<Self> {
        sink.info("Knowledge graph is being deserialized");
        let reader = BufReader::new(File::open(path)?);
        Self::from_reader(reader, sink)
    }

    fn from_reader(reader: impl BufRead, sink: &dyn EventSink) -> Result<Self> {
        let mut entities = Vec::new();
        let mut entity_idx: HashMap<String, usize> = HashMap::new();
        let mut relations = Vec::new();
        let mut relation_idx: HashMap<String, usize> = HashMap::new();
        let mut triples = Vec::new();
        let mut pruned = 0usize;

        let mut intern_entity = |name: String, entities: &mut Vec<String>| -> usize {
            *entity_idx.entry(name.clone()).or_insert_with(|| {
                entities.push(name);
                entities.len() - 1
            })
        };

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (subject, predicate, object) = parse_line(i + 1, &line)?;

            let tail = match object {
                ObjectTerm::Entity(e) => e,
                ObjectTerm::Literal(_) => {
                    pruned += 1;
                    continue;
                }
            };

            let s = intern_entity(subject, &mut entities);
            let o = intern_entity(tail, &mut entities);
            let p = *relation_idx.entry(predicate.clone()).or_insert_with(|| {
                relations.push(predicate);
                relations.len() - 1
            });
            triples.push((s, p, o));
        }

        sink.info(&format!(
            "|KG|={} after pruning literals ({} literal triples dropped)",
            triples.len(),
            pruned
        ));

        let mut er_vocab: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        let mut er_pairs = Vec::new();
        for &(s, p, o) in &triples {
            let tails = er_vocab.entry((s, p)).or_insert_with(|| {
                er_pairs.push((s, p));
                Vec::new()
            });
            if !tails.contains(&o) {
                tails.push(o);
            }
        }

        Ok(Self {
            entities,
            entity_idx,
            relations,
            relation_idx,
            triples,
            er_vocab,
            er_pairs,
        })
    }

    /// Number of distinct entities.
    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    /// Number of distinct relations.
    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    /// Entity identifiers in index order.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Relation identifiers in index order.
    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    /// Dense index of an entity identifier.
    pub fn entity_index(&self, entity: &str) -> Option<usize> {
        self.entity_idx.get(entity).copied()
    }

    /// Dense index of a relation identifier.
    pub fn relation_index(&self, relation: &str) -> Option<usize> {
        self.relation_idx.get(relation).copied()
    }

    /// The full indexed triple list (literals pruned), insertion order.
    pub fn triples(&self) -> &[(usize, usize, usize)] {
        &self.triples
    }

    /// Known-true tail indices for an (entity, relation) pair.
    pub fn tails(&self, head: usize, relation: usize) -> &[usize] {
        self.er_vocab
            .get(&(head, relation))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct (head, relation) pairs in first-occurrence order.
    pub fn er_pairs(&self) -> &[(usize, usize)] {
        &self.er_pairs
    }

    /// Slice a training batch out of an ordered (head, relation) pair list.
    ///
    /// Returns the batch slice plus a dense multi-hot target matrix over
    /// all entities: one row per pair, 1.0 at every known-true tail for
    /// that pair. A start offset past the end yields an empty batch; a
    /// batch size larger than the remainder yields one smaller batch.
    pub fn training_batch<'a>(
        &self,
        pairs: &'a [(usize, usize)],
        start: usize,
        batch_size: usize,
    ) -> (&'a [(usize, usize)], Array2<f32>) {
        let end = (start + batch_size).min(pairs.len());
        let batch = &pairs[start.min(end)..end];
        let mut targets = Array2::zeros((batch.len(), self.num_entities()));
        for (row, &(s, p) ) in batch.iter().enumerate() {
            for &t in self.tails(s, p) {
                targets[[row, t]] = 1.0;
            }
        }
        (batch, targets)
    }

    /// Slice an evaluation batch out of an ordered triple list.
    ///
    /// Same target semantics as [`training_batch`](Self::training_batch):
    /// the multi-hot row covers every known-true tail for the triple's
    /// (head, relation), not just the probe tail.
    pub fn eval_batch<'a>(
        &self,
        triples: &'a [(usize, usize, usize)],
        start: usize,
        batch_size: usize,
    ) -> (&'a [(usize, usize, usize)], Array2<f32>) {
        let end = (start + batch_size).min(triples.len());
        let batch = &triples[start.min(end)..end];
        let mut targets = Array2::zeros((batch.len(), self.num_entities()));
        for (row, &(s, p, _)) in batch.iter().enumerate() {
            for &t in self.tails(s, p) {
                targets[[row, t]] = 1.0;
            }
        }
        (batch, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factum_core::NullSink;

    const SAMPLE: &str = "\
<Event_0> <colX> <A> .
<Event_0> <colY> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .
<Event_1> <colX> <B> .
<Event_1> <colY> \"2\"^^<http://www.w3.org/2001/XMLSchema#integer> .
<Event_0> <rdf-syntax-ns#type> <Thing> .
<Event_1> <rdf-syntax-ns#type> <Thing> .
";

    fn sample_index() -> TripleIndex {
        TripleIndex::from_reader(SAMPLE.as_bytes(), &NullSink).unwrap()
    }

    #[test]
    fn test_literals_pruned() {
        let idx = sample_index();
        // The two integer-literal triples are dropped.
        assert_eq!(idx.triples().len(), 4);
        assert!(idx.entity_index("1").is_none());
        assert!(idx.relation_index("colY").is_none());
    }

    #[test]
    fn test_first_occurrence_order() {
        let idx = sample_index();
        assert_eq!(idx.entities(), &["Event_0", "A", "Event_1", "B", "Thing"]);
        assert_eq!(idx.relations(), &["colX", "rdf-syntax-ns#type"]);
    }

    #[test]
    fn test_round_trip_identifiers() {
        let idx = sample_index();
        let recovered: Vec<(String, String, String)> = idx
            .triples()
            .iter()
            .map(|&(s, p, o)| {
                (
                    idx.entities()[s].clone(),
                    idx.relations()[p].clone(),
                    idx.entities()[o].clone(),
                )
            })
            .collect();
        // Kept-triple order after pruning the two integer literals:
        // Event_0-colX-A, Event_1-colX-B, then the two type triples.
        assert_eq!(
            recovered[0],
            ("Event_0".into(), "colX".into(), "A".into())
        );
        assert_eq!(
            recovered[1],
            ("Event_1".into(), "colX".into(), "B".into())
        );
        assert_eq!(
            recovered[2],
            ("Event_0".into(), "rdf-syntax-ns#type".into(), "Thing".into())
        );
    }

    #[test]
    fn test_er_vocab_covers_every_triple() {
        let idx = sample_index();
        for &(s, p, o) in idx.triples() {
            assert!(idx.tails(s, p).contains(&o));
        }
    }

    #[test]
    fn test_corrupt_line_is_fatal() {
        let bad = "<Event_0> <colX> <A> .\nnot a triple\n";
        let err = TripleIndex::from_reader(bad.as_bytes(), &NullSink).unwrap_err();
        match err {
            Error::CorruptGraphFile { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_training_batch_targets_multi_hot() {
        let idx = sample_index();
        // Both Event_0 and Event_1 assert type Thing under the same relation.
        let pairs = idx.er_pairs().to_vec();
        let (batch, targets) = idx.training_batch(&pairs, 0, pairs.len());
        assert_eq!(batch.len(), pairs.len());
        for (row, &(s, p)) in batch.iter().enumerate() {
            for &t in idx.tails(s, p) {
                assert_eq!(targets[[row, t]], 1.0);
            }
            let ones = targets.row(row).iter().filter(|&&x| x == 1.0).count();
            assert_eq!(ones, idx.tails(s, p).len());
        }
    }

    #[test]
    fn test_batch_larger_than_data() {
        let idx = sample_index();
        let pairs = idx.er_pairs().to_vec();
        let (batch, targets) = idx.training_batch(&pairs, 0, 10_000);
        assert_eq!(batch.len(), pairs.len());
        assert_eq!(targets.nrows(), pairs.len());
        let (empty, _) = idx.training_batch(&pairs, pairs.len(), 10_000);
        assert!(empty.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// For any all-entity graph, indexing keeps every triple and
            /// the er-vocab holds each tail under its (head, relation).
            #[test]
            fn er_vocab_covers_any_graph(
                raw in prop::collection::vec(
                    ("[A-Za-z][A-Za-z0-9_]{0,8}", "[a-z][a-z0-9_]{0,8}", "[A-Za-z][A-Za-z0-9_]{0,8}"),
                    1..40,
                )
            ) {
                let mut text = String::new();
                for (s, p, o) in &raw {
                    text.push_str(&format!("<{s}> <{p}> <{o}> .\n"));
                }
                let idx = TripleIndex::from_reader(text.as_bytes(), &NullSink).unwrap();
                prop_assert_eq!(idx.triples().len(), raw.len());
                for &(s, p, o) in idx.triples() {
                    prop_assert!(idx.tails(s, p).contains(&o));
                }
            }
        }
    }

    #[test]
    fn test_parse_strips_decoration() {
        let (s, p, o) = parse_line(1, "<a> <b> <c> .").unwrap();
        assert_eq!((s.as_str(), p.as_str()), ("a", "b"));
        assert_eq!(o, ObjectTerm::Entity("c".into()));

        let (_, _, o) = parse_line(
            1,
            "<a> <b> \"3.5\"^^<http://www.w3.org/2001/XMLSchema#double> .",
        )
        .unwrap();
        assert_eq!(o, ObjectTerm::Literal("3.5".into()));
    }
}
