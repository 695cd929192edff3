//! Complex: complex-valued bilinear scoring.
//!
//! Score(h, r, t) = Re(<h, r, conj(t)>)
//! ([Trouillon et al. 2016](https://arxiv.org/abs/1606.06357)).
//! The conjugate breaks the symmetry Distmult is stuck with, so
//! directed relations score differently in each direction.
//!
//! Embeddings are stored as separate real/imaginary halves; the exported
//! tables concatenate them, giving 2d columns per row.

use super::{
    bce_logit_grad, bce_loss, dropout_mask, gather_rows, init_embeddings, sigmoid_inplace,
    KgeModel,
};
use crate::optim::Adam;
use crate::trainer::TrainingConfig;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

/// Complex-valued embedding model.
pub struct Complex {
    dim: usize,
    entity_re: Array2<f32>,
    entity_im: Array2<f32>,
    relation_re: Array2<f32>,
    relation_im: Array2<f32>,
    input_dropout: f32,
    hidden_dropout: f32,
    rng: XorShiftRng,
}

impl Complex {
    /// Create a randomly initialized model.
    pub fn new(num_entities: usize, num_relations: usize, config: &TrainingConfig) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let dim = config.embedding_dim;
        Self {
            dim,
            entity_re: init_embeddings(&mut rng, num_entities, dim),
            entity_im: init_embeddings(&mut rng, num_entities, dim),
            relation_re: init_embeddings(&mut rng, num_relations, dim),
            relation_im: init_embeddings(&mut rng, num_relations, dim),
            input_dropout: config.input_dropout,
            hidden_dropout: config.hidden_dropout,
            rng,
        }
    }

    /// Real and imaginary mixing terms for a gathered batch.
    ///
    /// a = h_re ∘ r_re - h_im ∘ r_im, b = h_re ∘ r_im + h_im ∘ r_re,
    /// so that logits = a · E_reᵀ + b · E_imᵀ.
    fn mix(
        h_re: &Array2<f32>,
        h_im: &Array2<f32>,
        r_re: &Array2<f32>,
        r_im: &Array2<f32>,
    ) -> (Array2<f32>, Array2<f32>) {
        let a = &(h_re * r_re) - &(h_im * r_im);
        let b = &(h_re * r_im) + &(h_im * r_re);
        (a, b)
    }
}

impl KgeModel for Complex {
    fn name(&self) -> &'static str {
        "Complex"
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn num_entities(&self) -> usize {
        self.entity_re.nrows()
    }

    fn num_relations(&self) -> usize {
        self.relation_re.nrows()
    }

    fn forward(&self, heads: &[usize], relations: &[usize]) -> Array2<f32> {
        let h_re = gather_rows(&self.entity_re, heads);
        let h_im = gather_rows(&self.entity_im, heads);
        let r_re = gather_rows(&self.relation_re, relations);
        let r_im = gather_rows(&self.relation_im, relations);

        let (a, b) = Self::mix(&h_re, &h_im, &r_re, &r_im);
        let mut logits = a.dot(&self.entity_re.t()) + b.dot(&self.entity_im.t());
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
        let shape = (batch, self.dim);
        let h_re = gather_rows(&self.entity_re, heads);
        let h_im = gather_rows(&self.entity_im, heads);
        let r_re = gather_rows(&self.relation_re, relations);
        let r_im = gather_rows(&self.relation_im, relations);

        let mask_re = dropout_mask(&mut self.rng, shape, self.input_dropout);
        let mask_im = dropout_mask(&mut self.rng, shape, self.input_dropout);
        let h_re_d = &h_re * &mask_re;
        let h_im_d = &h_im * &mask_im;

        let (a, b) = Self::mix(&h_re_d, &h_im_d, &r_re, &r_im);
        let mask_a = dropout_mask(&mut self.rng, shape, self.hidden_dropout);
        let mask_b = dropout_mask(&mut self.rng, shape, self.hidden_dropout);
        let a = &a * &mask_a;
        let b = &b * &mask_b;

        let mut preds = a.dot(&self.entity_re.t()) + b.dot(&self.entity_im.t());
        sigmoid_inplace(&mut preds);

        let loss = bce_loss(&preds, targets);
        let g = bce_logit_grad(&preds, targets);

        let mut grad_entity_re = g.t().dot(&a);
        let mut grad_entity_im = g.t().dot(&b);

        let grad_a = &g.dot(&self.entity_re) * &mask_a;
        let grad_b = &g.dot(&self.entity_im) * &mask_b;

        let grad_h_re = &(&(&grad_a * &r_re) + &(&grad_b * &r_im)) * &mask_re;
        let grad_h_im = &(&(&grad_b * &r_re) - &(&grad_a * &r_im)) * &mask_im;
        let grad_r_re = &(&grad_a * &h_re_d) + &(&grad_b * &h_im_d);
        let grad_r_im = &(&grad_b * &h_re_d) - &(&grad_a * &h_im_d);

        for (bi, &idx) in heads.iter().enumerate() {
            let mut row = grad_entity_re.index_axis_mut(Axis(0), idx);
            row += &grad_h_re.row(bi);
            let mut row = grad_entity_im.index_axis_mut(Axis(0), idx);
            row += &grad_h_im.row(bi);
        }
        let mut grad_relation_re = Array2::zeros(self.relation_re.raw_dim());
        let mut grad_relation_im = Array2::zeros(self.relation_im.raw_dim());
        for (bi, &idx) in relations.iter().enumerate() {
            let mut row = grad_relation_re.index_axis_mut(Axis(0), idx);
            row += &grad_r_re.row(bi);
            let mut row = grad_relation_im.index_axis_mut(Axis(0), idx);
            row += &grad_r_im.row(bi);
        }

        opt.update("entity_re", &mut self.entity_re, &grad_entity_re);
        opt.update("entity_im", &mut self.entity_im, &grad_entity_im);
        opt.update("relation_re", &mut self.relation_re, &grad_relation_re);
        opt.update("relation_im", &mut self.relation_im, &grad_relation_im);
        loss
    }

    fn entity_embeddings(&self) -> Array2<f32> {
        concatenate(Axis(1), &[self.entity_re.view(), self.entity_im.view()])
            .expect("matching row counts")
    }

    fn relation_embeddings(&self) -> Array2<f32> {
        concatenate(Axis(1), &[self.relation_re.view(), self.relation_im.view()])
            .expect("matching row counts")
    }
}
