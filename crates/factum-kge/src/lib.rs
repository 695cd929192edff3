//! Knowledge-graph embedding training and evaluation over a serialized
//! triple file.
//!
//! The pipeline: [`TripleIndex`] deserializes an n-triples-like file
//! produced by `factum-core`, pruning literal objects and assigning
//! first-occurrence integer indices; [`EmbeddingTrainer`] fits one of
//! four model families ([`Distmult`](models::Distmult),
//! [`Complex`](models::Complex), [`Tucker`](models::Tucker),
//! [`Conve`](models::Conve)) with minibatch Adam against multi-hot
//! tail targets; [`LinkPredictionEvaluator`] reports filtered Hits@k,
//! mean rank and MRR; [`export_embeddings`] writes the labeled tables
//! to CSV.
//!
//! ```rust,ignore
//! use factum_kge::{
//!     export_embeddings, EmbeddingTrainer, LinkPredictionEvaluator, TrainingConfig,
//!     TripleIndex,
//! };
//!
//! let index = TripleIndex::load("GeneratedKG.nt")?;
//! let config = TrainingConfig::for_model("Conve")?.with_embedding_dim(32);
//! let trained = EmbeddingTrainer::new(config).fit(&index)?;
//! let report = LinkPredictionEvaluator::new().evaluate(trained.model(), &index);
//! println!("{}", report.global.summary());
//! export_embeddings(&trained, &index, ".")?;
//! ```

pub mod error;
pub mod evaluation;
pub mod export;
pub mod index;
pub mod models;
pub mod optim;
pub mod trainer;
pub mod typing;

pub use error::{Error, Result};
pub use evaluation::{LinkPredictionEvaluator, LinkPredictionReport, RankMetrics};
pub use export::export_embeddings;
pub use index::TripleIndex;
pub use models::{KgeModel, ModelFamily};
pub use optim::Adam;
pub use trainer::{EmbeddingTrainer, TrainedModel, TrainingConfig};
pub use typing::{type_assertions, EmbeddingBundle};
