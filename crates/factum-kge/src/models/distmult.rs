//! Distmult: bilinear diagonal scoring.
//!
//! Score(h, r, t) = Σᵢ hᵢ rᵢ tᵢ ([Yang et al. 2015](https://arxiv.org/abs/1412.6575)).
//! Scoring all tails at once is a single matrix product against the
//! entity table, which is what makes the all-true-answers BCE loss cheap.

use super::{
    bce_logit_grad, bce_loss, dropout_mask, gather_rows, init_embeddings, sigmoid_inplace,
    KgeModel,
};
use crate::optim::Adam;
use crate::trainer::TrainingConfig;
use ndarray::{Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

/// Bilinear-diagonal embedding model.
pub struct Distmult {
    dim: usize,
    entity: Array2<f32>,
    relation: Array2<f32>,
    input_dropout: f32,
    hidden_dropout: f32,
    rng: XorShiftRng,
}

impl Distmult {
    /// Create a randomly initialized model.
    pub fn new(num_entities: usize, num_relations: usize, config: &TrainingConfig) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let dim = config.embedding_dim;
        Self {
            dim,
            entity: init_embeddings(&mut rng, num_entities, dim),
            relation: init_embeddings(&mut rng, num_relations, dim),
            input_dropout: config.input_dropout,
            hidden_dropout: config.hidden_dropout,
            rng,
        }
    }
}

impl KgeModel for Distmult {
    fn name(&self) -> &'static str {
        "Distmult"
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn num_entities(&self) -> usize {
        self.entity.nrows()
    }

    fn num_relations(&self) -> usize {
        self.relation.nrows()
    }

    fn forward(&self, heads: &[usize], relations: &[usize]) -> Array2<f32> {
        let h = gather_rows(&self.entity, heads);
        let r = gather_rows(&self.relation, relations);
        let mut logits = (&h * &r).dot(&self.entity.t());
        sigmoid_inplace(&mut logits);
        logits
    }

    fn train_step(
        &mut self,
        heads: &[usize],
        relations: &[usize],
        targets: &ArrayView2<f32>,
        opt: &mut Adam,
    ) -> f32 {
        let batch = heads.len();
        let h = gather_rows(&self.entity, heads);
        let r = gather_rows(&self.relation, relations);

        let mask_in = dropout_mask(&mut self.rng, (batch, self.dim), self.input_dropout);
        let mask_hidden = dropout_mask(&mut self.rng, (batch, self.dim), self.hidden_dropout);

        let h_dropped = &h * &mask_in;
        let m = &(&h_dropped * &r) * &mask_hidden;
        let mut preds = m.dot(&self.entity.t());
        sigmoid_inplace(&mut preds);

        let loss = bce_loss(&preds, targets);
        let g = bce_logit_grad(&preds, targets);

        // Entity table appears twice: as the output score matrix and as
        // the gathered head rows.
        let mut grad_entity = g.t().dot(&m);
        let grad_m = &g.dot(&self.entity) * &mask_hidden;
        let grad_h = &(&grad_m * &r) * &mask_in;
        let grad_r = &grad_m * &h_dropped;

        for (b, &idx) in heads.iter().enumerate() {
            let mut row = grad_entity.index_axis_mut(Axis(0), idx);
            row += &grad_h.row(b);
        }
        let mut grad_relation = Array2::zeros(self.relation.raw_dim());
        for (b, &idx) in relations.iter().enumerate() {
            let mut row = grad_relation.index_axis_mut(Axis(0), idx);
            row += &grad_r.row(b);
        }

        opt.update("entity_emb", &mut self.entity, &grad_entity);
        opt.update("relation_emb", &mut self.relation, &grad_relation);
        loss
    }

    fn entity_embeddings(&self) -> Array2<f32> {
        self.entity.clone()
    }

    fn relation_embeddings(&self) -> Array2<f32> {
        self.relation.clone()
    }
}
