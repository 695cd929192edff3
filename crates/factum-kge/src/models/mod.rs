//! Embedding model implementations.
//!
//! Each family implements the [`KgeModel`] strategy trait: a forward pass
//! scoring all candidate tail entities for a batch of (head, relation)
//! queries, and a training step applying manual binary-cross-entropy
//! gradients through an [`Adam`] optimizer. New families are added by
//! implementing the trait, not by branching on a name string.
//!
//! # Available Families
//!
//! | Family | Hypothesis | Scoring |
//! |--------|------------|---------|
//! | [`Distmult`] | Relations scale | Σᵢ hᵢ rᵢ tᵢ |
//! | [`Complex`] | Asymmetric relations | Re(<h, r, conj(t)>) |
//! | [`Tucker`] | Shared core tensor | W ×₁ h ×₂ r · t |
//! | [`Conve`] | 2D convolution over stacked h, r | f(vec(conv([h; r])) W) · t |

mod complex;
mod conve;
mod distmult;
mod tucker;

pub use complex::Complex;
pub use conve::Conve;
pub use distmult::Distmult;
pub use tucker::Tucker;

use crate::error::{Error, Result};
use crate::optim::Adam;
use crate::trainer::TrainingConfig;
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand_xorshift::XorShiftRng;
use std::fmt;
use std::str::FromStr;

/// Embedding model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Bilinear diagonal (Yang et al. 2015).
    Distmult,
    /// Complex-valued bilinear (Trouillon et al. 2016).
    Complex,
    /// Tucker decomposition with a shared core tensor (Balazevic et al. 2019).
    Tucker,
    /// 2D convolution over stacked head/relation maps (Dettmers et al. 2018).
    Conve,
}

impl ModelFamily {
    /// Instantiate a model for the given vocabulary sizes.
    ///
    /// Fails with `UnsupportedOperation` before any allocation if the
    /// configuration cannot drive this family.
    pub fn build(
        self,
        num_entities: usize,
        num_relations: usize,
        config: &TrainingConfig,
    ) -> Result<Box<dyn KgeModel>> {
        match self {
            ModelFamily::Distmult => Ok(Box::new(Distmult::new(num_entities, num_relations, config))),
            ModelFamily::Complex => Ok(Box::new(Complex::new(num_entities, num_relations, config))),
            ModelFamily::Tucker => Ok(Box::new(Tucker::new(num_entities, num_relations, config))),
            ModelFamily::Conve => Conve::new(num_entities, num_relations, config)
                .map(|m| Box::new(m) as Box<dyn KgeModel>),
        }
    }
}

impl FromStr for ModelFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "distmult" => Ok(ModelFamily::Distmult),
            "complex" => Ok(ModelFamily::Complex),
            "tucker" => Ok(ModelFamily::Tucker),
            "conve" => Ok(ModelFamily::Conve),
            _ => Err(Error::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::Distmult => "Distmult",
            ModelFamily::Complex => "Complex",
            ModelFamily::Tucker => "Tucker",
            ModelFamily::Conve => "Conve",
        };
        write!(f, "{name}")
    }
}

/// Strategy trait shared by all embedding families.
///
/// `forward` is the inference path: sigmoid scores over all entities,
/// dropout inactive. `train_step` is the learning path: dropout active,
/// manual gradients, one optimizer step. Evaluation must only ever call
/// `forward`, which never mutates the model.
pub trait KgeModel: Send {
    /// Model family name, used in export filenames.
    fn name(&self) -> &'static str;

    /// Embedding dimension.
    fn embedding_dim(&self) -> usize;

    /// Number of entities.
    fn num_entities(&self) -> usize;

    /// Number of relations.
    fn num_relations(&self) -> usize;

    /// Score all candidate tails for each (head, relation) query.
    ///
    /// Returns a (batch × num_entities) matrix of sigmoid scores.
    fn forward(&self, heads: &[usize], relations: &[usize]) -> Array2<f32>;

    /// One minibatch gradient step against multi-hot targets.
    ///
    /// Returns the batch binary-cross-entropy loss.
    fn train_step(
        &mut self,
        heads: &[usize],
        relations: &[usize],
        targets: &ArrayView2<f32>,
        opt: &mut Adam,
    ) -> f32;

    /// Entity embedding table, one row per entity index. Copied out;
    /// the internal table stays frozen after training.
    fn entity_embeddings(&self) -> Array2<f32>;

    /// Relation embedding table, one row per relation index.
    fn relation_embeddings(&self) -> Array2<f32>;
}

/// Uniform init in [-0.1, 0.1], the scale all families share.
pub(crate) fn init_embeddings(rng: &mut XorShiftRng, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-0.1..0.1))
}

/// Gather rows of a table into a dense (batch × dim) matrix.
pub(crate) fn gather_rows(table: &Array2<f32>, indices: &[usize]) -> Array2<f32> {
    Array2::from_shape_fn((indices.len(), table.ncols()), |(i, j)| {
        table[[indices[i], j]]
    })
}

/// Elementwise logistic sigmoid.
pub(crate) fn sigmoid_inplace(logits: &mut Array2<f32>) {
    logits.mapv_inplace(|x| 1.0 / (1.0 + (-x).exp()));
}

/// Mean binary cross-entropy over all (example, entity) cells.
pub(crate) fn bce_loss(preds: &Array2<f32>, targets: &ArrayView2<f32>) -> f32 {
    let n = preds.len() as f32;
    let mut sum = 0.0;
    for (&p, &t) in preds.iter().zip(targets.iter()) {
        let p = p.clamp(1e-7, 1.0 - 1e-7);
        sum -= t * p.ln() + (1.0 - t) * (1.0 - p).ln();
    }
    sum / n
}

/// Gradient of mean BCE with respect to the pre-sigmoid logits.
pub(crate) fn bce_logit_grad(preds: &Array2<f32>, targets: &ArrayView2<f32>) -> Array2<f32> {
    let n = preds.len() as f32;
    let mut grad = preds - targets;
    grad.mapv_inplace(|x| x / n);
    grad
}

/// Inverted-dropout mask: cells are 0 with probability `p`, otherwise
/// 1/(1-p). `p == 0` yields an all-ones mask.
pub(crate) fn dropout_mask(rng: &mut XorShiftRng, shape: (usize, usize), p: f32) -> Array2<f32> {
    if p <= 0.0 {
        return Array2::ones(shape);
    }
    let keep = 1.0 - p;
    Array2::from_shape_fn(shape, |_| {
        if rng.gen::<f32>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_family_from_str() {
        assert_eq!("Distmult".parse::<ModelFamily>().unwrap(), ModelFamily::Distmult);
        assert_eq!("complex".parse::<ModelFamily>().unwrap(), ModelFamily::Complex);
        assert_eq!("Tucker".parse::<ModelFamily>().unwrap(), ModelFamily::Tucker);
        assert_eq!("Conve".parse::<ModelFamily>().unwrap(), ModelFamily::Conve);
        assert!(matches!(
            "Hyper".parse::<ModelFamily>(),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn test_bce_grad_direction() {
        let preds = ndarray::arr2(&[[0.9f32, 0.1]]);
        let targets = ndarray::arr2(&[[1.0f32, 0.0]]);
        let grad = bce_logit_grad(&preds, &targets.view());
        assert!(grad[[0, 0]] < 0.0); // push score up toward the true tail
        assert!(grad[[0, 1]] > 0.0); // push score down elsewhere
    }

    #[test]
    fn test_dropout_mask_zero_rate_is_identity() {
        let mut rng = XorShiftRng::seed_from_u64(7);
        let mask = dropout_mask(&mut rng, (3, 4), 0.0);
        assert!(mask.iter().all(|&x| x == 1.0));
    }
}
