//! Downstream consumption of a trained graph: type assertions and
//! labeled embedding lookup.

use crate::error::{Error, Result};
use crate::index::TripleIndex;
use crate::trainer::TrainedModel;
use ndarray::{Array2, ArrayView1};
use std::collections::{HashMap, HashSet};

/// Collect entity type assertions from the indexed triples.
///
/// Every triple whose relation is a type relation (contains
/// [`RDF_TYPE_RELATION`](factum_core::RDF_TYPE_RELATION)) contributes
/// its tail to the head entity's type set. Entities without any type
/// triple are absent from the map.
pub fn type_assertions(index: &TripleIndex) -> HashMap<String, HashSet<String>> {
    let type_relations: HashSet<usize> = index
        .relations()
        .iter()
        .enumerate()
        .filter(|(_, name)| name.contains(factum_core::RDF_TYPE_RELATION))
        .map(|(i, _)| i)
        .collect();

    let mut assertions: HashMap<String, HashSet<String>> = HashMap::new();
    for &(h, r, t) in index.triples() {
        if type_relations.contains(&r) {
            assertions
                .entry(index.entities()[h].clone())
                .or_default()
                .insert(index.entities()[t].clone());
        }
    }
    assertions
}

/// A trained embedding table addressable by label.
pub struct EmbeddingBundle {
    entity_labels: HashMap<String, usize>,
    relation_labels: HashMap<String, usize>,
    entity: Array2<f32>,
    relation: Array2<f32>,
}

impl EmbeddingBundle {
    /// Snapshot a trained model's tables against the index vocabulary.
    pub fn new(trained: &TrainedModel, index: &TripleIndex) -> Self {
        let label_map = |labels: &[String]| {
            labels
                .iter()
                .enumerate()
                .map(|(i, l)| (l.clone(), i))
                .collect()
        };
        Self {
            entity_labels: label_map(index.entities()),
            relation_labels: label_map(index.relations()),
            entity: trained.entity_embeddings(),
            relation: trained.relation_embeddings(),
        }
    }

    /// Embedding vector of a named entity.
    pub fn entity_vector(&self, entity: &str) -> Result<ArrayView1<'_, f32>> {
        let &idx = self
            .entity_labels
            .get(entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))?;
        Ok(self.entity.row(idx))
    }

    /// Embedding vector of a named relation.
    pub fn relation_vector(&self, relation: &str) -> Result<ArrayView1<'_, f32>> {
        let &idx = self
            .relation_labels
            .get(relation)
            .ok_or_else(|| Error::EntityNotFound(relation.to_string()))?;
        Ok(self.relation.row(idx))
    }
}
