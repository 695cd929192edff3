//! Minibatch gradient-descent training over an indexed triple set.
//!
//! The trainer walks a fixed state sequence: configuration is validated
//! up front (an unknown model family never reaches computation), the
//! model is instantiated and randomly initialized against the index's
//! vocabulary sizes, epochs run seeded-shuffled minibatches over the
//! distinct (head, relation) pairs, and the terminal [`TrainedModel`]
//! exposes the embedding tables read-only.

use crate::error::Result;
use crate::index::TripleIndex;
use crate::models::{KgeModel, ModelFamily};
use crate::optim::Adam;
use factum_core::{EventSink, TracingSink};
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Embedding model family.
    pub model: ModelFamily,
    /// Embedding dimension (default: 50).
    pub embedding_dim: usize,
    /// Minibatch size (default: 256).
    pub batch_size: usize,
    /// Number of training epochs (default: 100).
    pub num_iterations: usize,
    /// Dropout on gathered input embeddings (default: 0.2).
    pub input_dropout: f32,
    /// Dropout on the hidden interaction term (default: 0.2).
    pub hidden_dropout: f32,
    /// Dropout on convolution feature maps, Conve only (default: 0.1).
    pub feature_map_dropout: f32,
    /// Adam learning rate (default: 1e-3).
    pub learning_rate: f32,
    /// Random seed for init, shuffling and dropout (default: 42).
    pub seed: u64,
}

impl TrainingConfig {
    /// Defaults for the given model family.
    pub fn new(model: ModelFamily) -> Self {
        Self {
            model,
            embedding_dim: 50,
            batch_size: 256,
            num_iterations: 100,
            input_dropout: 0.2,
            hidden_dropout: 0.2,
            feature_map_dropout: 0.1,
            learning_rate: 1e-3,
            seed: 42,
        }
    }

    /// Defaults for a model family given by name.
    ///
    /// Fails with `UnknownModel` before any computation starts.
    pub fn for_model(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_num_iterations(mut self, num_iterations: usize) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    pub fn with_input_dropout(mut self, p: f32) -> Self {
        self.input_dropout = p;
        self
    }

    pub fn with_hidden_dropout(mut self, p: f32) -> Self {
        self.hidden_dropout = p;
        self
    }

    pub fn with_feature_map_dropout(mut self, p: f32) -> Self {
        self.feature_map_dropout = p;
        self
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(ModelFamily::Distmult)
    }
}

/// A trained embedding model. Terminal state: read-only accessors only,
/// no further mutation permitted.
pub struct TrainedModel {
    model: Box<dyn KgeModel>,
    loss_history: Vec<f32>,
}

impl TrainedModel {
    /// Model family name.
    pub fn name(&self) -> &'static str {
        self.model.name()
    }

    /// Entity embedding table, one row per entity index.
    pub fn entity_embeddings(&self) -> Array2<f32> {
        self.model.entity_embeddings()
    }

    /// Relation embedding table, one row per relation index.
    pub fn relation_embeddings(&self) -> Array2<f32> {
        self.model.relation_embeddings()
    }

    /// The underlying scoring model, for evaluation.
    pub fn model(&self) -> &dyn KgeModel {
        self.model.as_ref()
    }

    /// Mean training loss per epoch.
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }
}

/// Embedding trainer.
///
/// # Example
///
/// ```rust,ignore
/// use factum_kge::{EmbeddingTrainer, TrainingConfig, TripleIndex};
///
/// let index = TripleIndex::load("GeneratedKG.nt")?;
/// let config = TrainingConfig::for_model("Distmult")?
///     .with_embedding_dim(32)
///     .with_num_iterations(50);
/// let trained = EmbeddingTrainer::new(config).fit(&index)?;
/// ```
pub struct EmbeddingTrainer {
    config: TrainingConfig,
    sink: Box<dyn EventSink>,
}

impl EmbeddingTrainer {
    /// Create a trainer for the given configuration.
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run the full training loop over the indexed triples.
    ///
    /// Each epoch shuffles the distinct (head, relation) pair list with
    /// a seeded RNG, then steps through fixed-size minibatches; a batch
    /// size larger than the pair list yields exactly one smaller batch.
    pub fn fit(&self, index: &TripleIndex) -> Result<TrainedModel> {
        let config = &self.config;
        let mut model =
            config
                .model
                .build(index.num_entities(), index.num_relations(), config)?;
        let mut opt = Adam::new(config.learning_rate);
        let mut rng = XorShiftRng::seed_from_u64(config.seed);
        let mut pairs = index.er_pairs().to_vec();

        self.sink.info(&format!(
            "Training starts: model={} dim={} batch_size={} iterations={} lr={}",
            config.model,
            config.embedding_dim,
            config.batch_size,
            config.num_iterations,
            config.learning_rate
        ));

        let mut loss_history = Vec::with_capacity(config.num_iterations);
        for epoch in 1..=config.num_iterations {
            pairs.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            let mut num_batches = 0usize;
            let mut offset = 0;
            while offset < pairs.len() {
                let (batch, targets) = index.training_batch(&pairs, offset, config.batch_size);
                let heads: Vec<usize> = batch.iter().map(|&(h, _)| h).collect();
                let relations: Vec<usize> = batch.iter().map(|&(_, r)| r).collect();
                epoch_loss += model.train_step(&heads, &relations, &targets.view(), &mut opt);
                num_batches += 1;
                offset += config.batch_size;
            }

            let avg = if num_batches > 0 {
                epoch_loss / num_batches as f32
            } else {
                0.0
            };
            loss_history.push(avg);
            if epoch % 10 == 0 || epoch == config.num_iterations {
                self.sink
                    .info(&format!("Epoch {epoch}: loss = {avg:.4}"));
            }
        }
        self.sink.info("Training ends");

        Ok(TrainedModel {
            model,
            loss_history,
        })
    }
}
