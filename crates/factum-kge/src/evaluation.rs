//! Filtered link-prediction evaluation.
//!
//! Tail prediction over a seeded sample of the indexed triples: the
//! model scores every entity as a candidate tail, every *other*
//! known-true tail for the same (head, relation) is masked out, and the
//! probe tail's rank among the surviving candidates feeds Hits@k, mean
//! rank and mean reciprocal rank, both globally and per relation.

use crate::index::TripleIndex;
use crate::models::KgeModel;
use factum_core::{EventSink, TracingSink};
use ndarray::ArrayViewMut1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rank-based metrics over a set of evaluation probes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankMetrics {
    /// Number of probes the ranks were collected from.
    pub num_probes: usize,
    /// Mean rank of the probe tail (1 is best).
    pub mean_rank: f64,
    /// Mean reciprocal rank.
    pub mrr: f64,
    /// Fraction of probes ranked first.
    pub hits_at_1: f64,
    /// Fraction of probes ranked in the top 3.
    pub hits_at_3: f64,
    /// Fraction of probes ranked in the top 10.
    pub hits_at_10: f64,
}

impl RankMetrics {
    /// Aggregate a list of 1-based ranks.
    pub fn from_ranks(ranks: &[usize]) -> Self {
        let n = ranks.len();
        if n == 0 {
            return Self {
                num_probes: 0,
                mean_rank: 0.0,
                mrr: 0.0,
                hits_at_1: 0.0,
                hits_at_3: 0.0,
                hits_at_10: 0.0,
            };
        }
        let nf = n as f64;
        let hits = |k: usize| ranks.iter().filter(|&&r| r <= k).count() as f64 / nf;
        Self {
            num_probes: n,
            mean_rank: ranks.iter().sum::<usize>() as f64 / nf,
            mrr: ranks.iter().map(|&r| 1.0 / r as f64).sum::<f64>() / nf,
            hits_at_1: hits(1),
            hits_at_3: hits(3),
            hits_at_10: hits(10),
        }
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "H@1 {:.3} | H@3 {:.3} | H@10 {:.3} | MR {:.1} | MRR {:.3} ({} probes)",
            self.hits_at_1, self.hits_at_3, self.hits_at_10, self.mean_rank, self.mrr,
            self.num_probes
        )
    }
}

/// Evaluation results, globally and broken out per relation.
#[derive(Debug, Clone, Serialize)]
pub struct LinkPredictionReport {
    pub global: RankMetrics,
    pub per_relation: BTreeMap<String, RankMetrics>,
}

/// Filtered tail-prediction evaluator.
pub struct LinkPredictionEvaluator {
    sample_fraction: f64,
    batch_size: usize,
    seed: u64,
    sink: Box<dyn EventSink>,
}

impl Default for LinkPredictionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkPredictionEvaluator {
    /// Evaluator over a 10% sample, batch size 128, seed 42.
    pub fn new() -> Self {
        Self {
            sample_fraction: 0.1,
            batch_size: 128,
            seed: 42,
            sink: Box::new(TracingSink),
        }
    }

    /// Fraction of the triple set to probe, in (0, 1].
    pub fn with_sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = fraction;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Score a trained model against the index it was trained on.
    pub fn evaluate(&self, model: &dyn KgeModel, index: &TripleIndex) -> LinkPredictionReport {
        let mut rng = XorShiftRng::seed_from_u64(self.seed);
        let mut sample = index.triples().to_vec();
        sample.shuffle(&mut rng);
        // ceil keeps tiny graphs from producing an empty probe set
        let keep = ((sample.len() as f64) * self.sample_fraction).ceil() as usize;
        sample.truncate(keep.min(sample.len()));

        self.sink.info(&format!(
            "Evaluating tail prediction on {} of {} triples",
            sample.len(),
            index.triples().len()
        ));

        let mut ranks = Vec::with_capacity(sample.len());
        let mut per_relation_ranks: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

        let mut offset = 0;
        while offset < sample.len() {
            let (batch, _targets) = index.eval_batch(&sample, offset, self.batch_size);
            let heads: Vec<usize> = batch.iter().map(|&(h, _, _)| h).collect();
            let relations: Vec<usize> = batch.iter().map(|&(_, r, _)| r).collect();
            let mut scores = model.forward(&heads, &relations);

            for (row, &(h, r, t)) in batch.iter().enumerate() {
                let mut row_scores = scores.row_mut(row);
                let probe_score = mask_known_tails(&mut row_scores, index.tails(h, r), t);
                let rank = 1 + row_scores.iter().filter(|&&s| s > probe_score).count();
                ranks.push(rank);
                per_relation_ranks.entry(r).or_default().push(rank);
            }
            offset += self.batch_size;
        }

        let global = RankMetrics::from_ranks(&ranks);
        self.sink.info(&format!("Global: {}", global.summary()));

        let per_relation = per_relation_ranks
            .into_iter()
            .map(|(r, ranks)| (index.relations()[r].clone(), RankMetrics::from_ranks(&ranks)))
            .collect();

        LinkPredictionReport {
            global,
            per_relation,
        }
    }
}

/// Zero out every known-true tail except the probe, preserving the
/// probe's own score.
///
/// The probe tail is itself in the known list, so its score is saved
/// before the sweep and written back afterwards.
fn mask_known_tails(scores: &mut ArrayViewMut1<f32>, known: &[usize], probe: usize) -> f32 {
    let probe_score = scores[probe];
    for &tail in known {
        scores[tail] = 0.0;
    }
    scores[probe] = probe_score;
    probe_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelFamily;
    use crate::trainer::{EmbeddingTrainer, TrainingConfig};
    use factum_core::NullSink;
    use ndarray::{arr1, Array2, ArrayView2};

    #[test]
    fn test_mask_preserves_probe_score() {
        let mut scores = arr1(&[0.9_f32, 0.8, 0.7, 0.6]);
        let mut view = scores.view_mut();
        let probe_score = mask_known_tails(&mut view, &[0, 2], 2);
        assert_eq!(probe_score, 0.7);
        assert_eq!(scores, arr1(&[0.0, 0.8, 0.7, 0.6]));
    }

    #[test]
    fn test_from_ranks() {
        let m = RankMetrics::from_ranks(&[1, 2, 4, 11]);
        assert_eq!(m.num_probes, 4);
        assert_eq!(m.hits_at_1, 0.25);
        assert_eq!(m.hits_at_3, 0.5);
        assert_eq!(m.hits_at_10, 0.75);
        assert!((m.mean_rank - 4.5).abs() < 1e-12);
        let expected_mrr = (1.0 + 0.5 + 0.25 + 1.0 / 11.0) / 4.0;
        assert!((m.mrr - expected_mrr).abs() < 1e-12);
    }

    #[test]
    fn test_empty_ranks_do_not_divide_by_zero() {
        let m = RankMetrics::from_ranks(&[]);
        assert_eq!(m.num_probes, 0);
        assert_eq!(m.mrr, 0.0);
    }

    /// Scores every tail as its fixed preference: candidate entity `t`
    /// always gets score 1/(t+1), so entity 0 wins everywhere.
    struct FixedModel {
        num_entities: usize,
    }

    impl KgeModel for FixedModel {
        fn name(&self) -> &'static str {
            "Fixed"
        }
        fn embedding_dim(&self) -> usize {
            1
        }
        fn num_entities(&self) -> usize {
            self.num_entities
        }
        fn num_relations(&self) -> usize {
            1
        }
        fn forward(&self, heads: &[usize], _relations: &[usize]) -> Array2<f32> {
            Array2::from_shape_fn((heads.len(), self.num_entities), |(_, t)| {
                1.0 / (t as f32 + 1.0)
            })
        }
        fn train_step(
            &mut self,
            _heads: &[usize],
            _relations: &[usize],
            _targets: &ArrayView2<f32>,
            _opt: &mut crate::optim::Adam,
        ) -> f32 {
            unreachable!("inference-only test model")
        }
        fn entity_embeddings(&self) -> Array2<f32> {
            Array2::zeros((self.num_entities, 1))
        }
        fn relation_embeddings(&self) -> Array2<f32> {
            Array2::zeros((1, 1))
        }
    }

    fn small_index() -> TripleIndex {
        use std::io::Write;
        let kg = "\
<e0> <likes> <e1> .
<e0> <likes> <e2> .
<e1> <likes> <e0> .
<e2> <knows> <e0> .
";
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(kg.as_bytes()).unwrap();
        TripleIndex::load_with_sink(f.path(), &NullSink).unwrap()
    }

    #[test]
    fn test_filtered_ranks_with_fixed_scores() {
        // Entity order is first-occurrence: e0=0, e1=1, e2=2.
        // FixedModel prefers lower entity indices.
        let index = small_index();
        let model = FixedModel {
            num_entities: index.num_entities(),
        };
        let report = LinkPredictionEvaluator::new()
            .with_sample_fraction(1.0)
            .with_sink(Box::new(NullSink))
            .evaluate(&model, &index);

        assert_eq!(report.global.num_probes, 4);
        // (e1,likes,e0) and (e2,knows,e0): probe e0 has the top score, rank 1.
        // (e0,likes,e1): e0 outranks the probe but e2 is masked, rank 2.
        // (e0,likes,e2): e0 outranks, e1 masked, rank 2.
        assert!((report.global.mean_rank - 1.5).abs() < 1e-9);
        assert_eq!(report.global.hits_at_1, 0.5);
        assert_eq!(report.global.hits_at_3, 1.0);
        assert_eq!(report.per_relation.len(), 2);
        assert_eq!(report.per_relation["knows"].num_probes, 1);
        assert_eq!(report.per_relation["knows"].hits_at_1, 1.0);
    }

    #[test]
    fn test_hits_are_monotonic_for_trained_model() {
        let index = small_index();
        let config = TrainingConfig::new(ModelFamily::Distmult)
            .with_embedding_dim(8)
            .with_num_iterations(5)
            .with_batch_size(4);
        let trained = EmbeddingTrainer::new(config)
            .with_sink(Box::new(NullSink))
            .fit(&index)
            .unwrap();

        let report = LinkPredictionEvaluator::new()
            .with_sample_fraction(1.0)
            .with_sink(Box::new(NullSink))
            .evaluate(trained.model(), &index);

        let g = &report.global;
        assert!(g.hits_at_1 <= g.hits_at_3);
        assert!(g.hits_at_3 <= g.hits_at_10);
        assert!(g.mrr.is_finite() && g.mean_rank >= 1.0);
    }
}
