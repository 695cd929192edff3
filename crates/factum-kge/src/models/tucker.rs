//! Tucker: shared core tensor scoring.
//!
//! Score(h, r, t) = W ×₁ h ×₂ r ×₃ t
//! ([Balazevic et al. 2019](https://arxiv.org/abs/1901.09590)).
//! One d×d×d core tensor is shared by every relation, so relations with
//! few triples borrow statistical strength from the rest.

use super::{
    bce_logit_grad, bce_loss, dropout_mask, gather_rows, init_embeddings, sigmoid_inplace,
    KgeModel,
};
use crate::optim::Adam;
use crate::trainer::TrainingConfig;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

/// Tucker-decomposition embedding model.
pub struct Tucker {
    dim: usize,
    entity: Array2<f32>,
    relation: Array2<f32>,
    /// Core tensor, indexed [head_dim, rel_dim, out_dim].
    core: Array3<f32>,
    input_dropout: f32,
    hidden_dropout: f32,
    rng: XorShiftRng,
}

impl Tucker {
    /// Create a randomly initialized model.
    pub fn new(num_entities: usize, num_relations: usize, config: &TrainingConfig) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let dim = config.embedding_dim;
        let entity = init_embeddings(&mut rng, num_entities, dim);
        let relation = init_embeddings(&mut rng, num_relations, dim);
        let core = Array3::from_shape_fn((dim, dim, dim), |_| rng.gen_range(-0.1..0.1));
        Self {
            dim,
            entity,
            relation,
            core,
            input_dropout: config.input_dropout,
            hidden_dropout: config.hidden_dropout,
            rng,
        }
    }

    /// Contract the core tensor with gathered head/relation rows:
    /// m[b, k] = Σᵢⱼ h[b, i] r[b, j] W[i, j, k].
    fn contract(&self, h: &Array2<f32>, r: &Array2<f32>) -> Array2<f32> {
        let batch = h.nrows();
        let d = self.dim;
        let mut m = Array2::zeros((batch, d));
        for b in 0..batch {
            for i in 0..d {
                let hi = h[[b, i]];
                if hi == 0.0 {
                    continue;
                }
                for j in 0..d {
                    let hr = hi * r[[b, j]];
                    if hr == 0.0 {
                        continue;
                    }
                    for k in 0..d {
                        m[[b, k]] += hr * self.core[[i, j, k]];
                    }
                }
            }
        }
        m
    }
}

impl KgeModel for Tucker {
    fn name(&self) -> &'static str {
        "Tucker"
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
        let m = self.contract(&h, &r);
        let mut logits = m.dot(&self.entity.t());
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
        let d = self.dim;
        let shape = (batch, d);
        let h = gather_rows(&self.entity, heads);
        let r = gather_rows(&self.relation, relations);

        let mask_in = dropout_mask(&mut self.rng, shape, self.input_dropout);
        let h_d = &h * &mask_in;

        let m = self.contract(&h_d, &r);
        let mask_hidden = dropout_mask(&mut self.rng, shape, self.hidden_dropout);
        let m_d = &m * &mask_hidden;

        let mut preds = m_d.dot(&self.entity.t());
        sigmoid_inplace(&mut preds);

        let loss = bce_loss(&preds, targets);
        let g = bce_logit_grad(&preds, targets);

        let mut grad_entity = g.t().dot(&m_d);
        let grad_m = &g.dot(&self.entity) * &mask_hidden;

        let mut grad_core = Array3::zeros(self.core.raw_dim());
        let mut grad_h = Array2::zeros(shape);
        let mut grad_r = Array2::zeros(shape);
        for b in 0..batch {
            for i in 0..d {
                let hi = h_d[[b, i]];
                for j in 0..d {
                    let rj = r[[b, j]];
                    let mut dot_k = 0.0;
                    for k in 0..d {
                        let gm = grad_m[[b, k]];
                        dot_k += self.core[[i, j, k]] * gm;
                        grad_core[[i, j, k]] += hi * rj * gm;
                    }
                    grad_h[[b, i]] += rj * dot_k;
                    grad_r[[b, j]] += hi * dot_k;
                }
            }
        }
        let grad_h = &grad_h * &mask_in;

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
        opt.update("core_tensor", &mut self.core, &grad_core);
        loss
    }

    fn entity_embeddings(&self) -> Array2<f32> {
        self.entity.clone()
    }

    fn relation_embeddings(&self) -> Array2<f32> {
        self.relation.clone()
    }
}
