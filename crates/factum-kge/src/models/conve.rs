//! Conve: 2D convolution over stacked head/relation maps.
//!
//! The head and relation vectors are stacked into a 2×d input map,
//! convolved with a bank of 2×3 kernels, projected back to the embedding
//! dimension through a fully connected layer, and scored against every
//! entity with a per-entity bias
//! ([Dettmers et al. 2018](https://arxiv.org/abs/1707.01476)).
//!
//! Three dropout sites, matching the family's usual regularization:
//! input (on the stacked map), feature-map (after the convolution) and
//! hidden (after the projection).

use super::{bce_logit_grad, bce_loss, init_embeddings, sigmoid_inplace, KgeModel};
use crate::error::{Error, Result};
use crate::optim::Adam;
use crate::trainer::TrainingConfig;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

const KERNEL_W: usize = 3;
const KERNEL_H: usize = 2;

/// Convolutional embedding model.
pub struct Conve {
    dim: usize,
    filters: usize,
    entity: Array2<f32>,
    relation: Array2<f32>,
    /// Convolution kernels, indexed [filter, row, col].
    kernels: Array3<f32>,
    kernel_bias: Array1<f32>,
    /// Projection from flattened feature maps back to the embedding dim.
    fc_weight: Array2<f32>,
    fc_bias: Array1<f32>,
    entity_bias: Array1<f32>,
    input_dropout: f32,
    feature_map_dropout: f32,
    hidden_dropout: f32,
    rng: XorShiftRng,
}

impl Conve {
    /// Number of convolution filters.
    pub const CONV_OUT: usize = 4;

    /// Create a randomly initialized model.
    ///
    /// The 2×3 kernels need at least three embedding columns to slide
    /// over; smaller dimensions are rejected before any allocation.
    pub fn new(num_entities: usize, num_relations: usize, config: &TrainingConfig) -> Result<Self> {
        let dim = config.embedding_dim;
        if dim < KERNEL_W {
            return Err(Error::UnsupportedOperation(format!(
                "Conve requires embedding_dim >= {KERNEL_W}, got {dim}"
            )));
        }
        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let filters = Self::CONV_OUT;
        let flat = filters * (dim - KERNEL_W + 1);
        let entity = init_embeddings(&mut rng, num_entities, dim);
        let relation = init_embeddings(&mut rng, num_relations, dim);
        let kernels = Array3::from_shape_fn((filters, KERNEL_H, KERNEL_W), |_| {
            rng.gen_range(-0.1..0.1)
        });
        let fc_weight = Array2::from_shape_fn((flat, dim), |_| rng.gen_range(-0.1..0.1));
        Ok(Self {
            dim,
            filters,
            entity,
            relation,
            kernels,
            kernel_bias: Array1::zeros(filters),
            fc_weight,
            fc_bias: Array1::zeros(dim),
            entity_bias: Array1::zeros(num_entities),
            input_dropout: config.input_dropout,
            feature_map_dropout: config.feature_map_dropout,
            hidden_dropout: config.hidden_dropout,
            rng,
        })
    }

    fn out_width(&self) -> usize {
        self.dim - KERNEL_W + 1
    }

    /// Convolve one 2×d input map: z[f, pos] = b_f + Σᵢⱼ K[f,i,j] img[i, pos+j].
    fn convolve(&self, img: &Array2<f32>) -> Array2<f32> {
        let width = self.out_width();
        let mut z = Array2::zeros((self.filters, width));
        for f in 0..self.filters {
            for pos in 0..width {
                let mut acc = self.kernel_bias[f];
                for i in 0..KERNEL_H {
                    for j in 0..KERNEL_W {
                        acc += self.kernels[[f, i, j]] * img[[i, pos + j]];
                    }
                }
                z[[f, pos]] = acc;
            }
        }
        z
    }

    /// Inference-path feature vector for one (head, relation) pair.
    fn features(&self, head: usize, relation: usize) -> Array1<f32> {
        let mut img = Array2::zeros((KERNEL_H, self.dim));
        img.row_mut(0).assign(&self.entity.row(head));
        img.row_mut(1).assign(&self.relation.row(relation));

        let mut a = self.convolve(&img);
        a.mapv_inplace(|x| x.max(0.0));

        let x = Array1::from_iter(a.iter().copied());
        let mut y = x.dot(&self.fc_weight) + &self.fc_bias;
        y.mapv_inplace(|v| v.max(0.0));
        y
    }

    fn mask1(rng: &mut XorShiftRng, len: usize, p: f32) -> Array1<f32> {
        if p <= 0.0 {
            return Array1::ones(len);
        }
        let keep = 1.0 - p;
        Array1::from_shape_fn(len, |_| if rng.gen::<f32>() < keep { 1.0 / keep } else { 0.0 })
    }
}

impl KgeModel for Conve {
    fn name(&self) -> &'static str {
        "Conve"
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
        let mut logits = Array2::zeros((heads.len(), self.num_entities()));
        for (b, (&h, &r)) in heads.iter().zip(relations).enumerate() {
            let v = self.features(h, r);
            let row = self.entity.dot(&v) + &self.entity_bias;
            logits.row_mut(b).assign(&row);
        }
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
        let width = self.out_width();
        let flat = self.filters * width;

        // Forward with caches per example.
        let mut imgs = Vec::with_capacity(batch);
        let mut in_masks = Vec::with_capacity(batch);
        let mut zs = Vec::with_capacity(batch);
        let mut feat_masks = Vec::with_capacity(batch);
        let mut xs = Vec::with_capacity(batch);
        let mut ys = Vec::with_capacity(batch);
        let mut hidden_masks = Vec::with_capacity(batch);
        let mut vs = Array2::zeros((batch, d));
        let mut preds = Array2::zeros((batch, self.num_entities()));

        for (b, (&h, &r)) in heads.iter().zip(relations).enumerate() {
            let mut img = Array2::zeros((KERNEL_H, d));
            img.row_mut(0).assign(&self.entity.row(h));
            img.row_mut(1).assign(&self.relation.row(r));
            let mask_in = super::dropout_mask(&mut self.rng, (KERNEL_H, d), self.input_dropout);
            let img = &img * &mask_in;

            let z = self.convolve(&img);
            let mut a = z.mapv(|x| x.max(0.0));
            let mask_feat =
                super::dropout_mask(&mut self.rng, (self.filters, width), self.feature_map_dropout);
            a *= &mask_feat;

            let x = Array1::from_iter(a.iter().copied());
            let y_raw = x.dot(&self.fc_weight) + &self.fc_bias;
            let mask_hidden = Self::mask1(&mut self.rng, d, self.hidden_dropout);
            let y = &y_raw * &mask_hidden;
            let v = y.mapv(|t| t.max(0.0));

            let row = self.entity.dot(&v) + &self.entity_bias;
            preds.row_mut(b).assign(&row);
            vs.row_mut(b).assign(&v);

            imgs.push(img);
            in_masks.push(mask_in);
            zs.push(z);
            feat_masks.push(mask_feat);
            xs.push(x);
            ys.push(y);
            hidden_masks.push(mask_hidden);
        }
        sigmoid_inplace(&mut preds);

        let loss = bce_loss(&preds, targets);
        let g = bce_logit_grad(&preds, targets);

        // Output side: entity table and per-entity bias.
        let mut grad_entity = g.t().dot(&vs);
        let grad_entity_bias = g.sum_axis(Axis(0));

        let mut grad_relation = Array2::zeros(self.relation.raw_dim());
        let mut grad_kernels = Array3::zeros(self.kernels.raw_dim());
        let mut grad_kernel_bias = Array1::zeros(self.filters);
        let mut grad_fc_weight = Array2::zeros(self.fc_weight.raw_dim());
        let mut grad_fc_bias = Array1::zeros(d);

        for b in 0..batch {
            let grad_v = g.row(b).dot(&self.entity);
            let y = &ys[b];
            let grad_y: Array1<f32> = grad_v
                .iter()
                .zip(y.iter())
                .zip(hidden_masks[b].iter())
                .map(|((&gv, &yv), &m)| if yv > 0.0 { gv * m } else { 0.0 })
                .collect();

            grad_fc_bias += &grad_y;
            for i in 0..flat {
                let xi = xs[b][i];
                if xi != 0.0 {
                    let mut row = grad_fc_weight.index_axis_mut(Axis(0), i);
                    row.scaled_add(xi, &grad_y);
                }
            }
            let grad_x = self.fc_weight.dot(&grad_y);

            // Back through feature-map dropout and the ReLU on z.
            let z = &zs[b];
            let mask_feat = &feat_masks[b];
            let mut grad_z = Array2::zeros((self.filters, width));
            for f in 0..self.filters {
                for pos in 0..width {
                    if z[[f, pos]] > 0.0 {
                        grad_z[[f, pos]] = grad_x[f * width + pos] * mask_feat[[f, pos]];
                    }
                }
            }

            let img = &imgs[b];
            let mut grad_img = Array2::zeros((KERNEL_H, d));
            for f in 0..self.filters {
                let mut bias_acc = 0.0;
                for pos in 0..width {
                    let gz = grad_z[[f, pos]];
                    if gz == 0.0 {
                        continue;
                    }
                    bias_acc += gz;
                    for i in 0..KERNEL_H {
                        for j in 0..KERNEL_W {
                            grad_kernels[[f, i, j]] += gz * img[[i, pos + j]];
                            grad_img[[i, pos + j]] += gz * self.kernels[[f, i, j]];
                        }
                    }
                }
                grad_kernel_bias[f] += bias_acc;
            }
            grad_img *= &in_masks[b];

            let mut row = grad_entity.index_axis_mut(Axis(0), heads[b]);
            row += &grad_img.row(0);
            let mut row = grad_relation.index_axis_mut(Axis(0), relations[b]);
            row += &grad_img.row(1);
        }

        opt.update("entity_emb", &mut self.entity, &grad_entity);
        opt.update("relation_emb", &mut self.relation, &grad_relation);
        opt.update("conv_kernels", &mut self.kernels, &grad_kernels);
        opt.update("conv_bias", &mut self.kernel_bias, &grad_kernel_bias);
        opt.update("fc_weight", &mut self.fc_weight, &grad_fc_weight);
        opt.update("fc_bias", &mut self.fc_bias, &grad_fc_bias);
        opt.update("entity_bias", &mut self.entity_bias, &grad_entity_bias);
        loss
    }

    fn entity_embeddings(&self) -> Array2<f32> {
        self.entity.clone()
    }

    fn relation_embeddings(&self) -> Array2<f32> {
        self.relation.clone()
    }
}
