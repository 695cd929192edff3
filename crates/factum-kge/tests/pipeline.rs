//! End-to-end pipeline: tabular records through graph materialization,
//! indexing, training, evaluation and export.

use factum_core::{GraphMaterializer, NullSink, Table, Value};
use factum_kge::{
    export_embeddings, type_assertions, EmbeddingBundle, EmbeddingTrainer,
    LinkPredictionEvaluator, TrainingConfig, TripleIndex,
};

fn sample_table() -> Table {
    let mut table = Table::new(vec![
        "http://example.org/resource/type".to_string(),
        "color".to_string(),
        "price".to_string(),
    ]);
    table
        .push_row(vec![
            Value::from("Gadget"),
            Value::from("red"),
            Value::from(9.5),
        ])
        .unwrap();
    table
        .push_row(vec![
            Value::from("Gadget"),
            Value::from("blue"),
            Value::Missing,
        ])
        .unwrap();
    table
        .push_row(vec![
            Value::from("Widget"),
            Value::from("red"),
            Value::from(12.0),
        ])
        .unwrap();
    table
}

#[test]
fn test_table_to_embeddings_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let kg_path = dir.path().join("GeneratedKG.nt");

    let materializer = GraphMaterializer::new()
        .with_output(&kg_path)
        .with_sink(Box::new(NullSink));
    let materialized = materializer.materialize(&sample_table()).unwrap();
    assert_eq!(materialized.triples.len(), 9);

    let index = TripleIndex::load_with_sink(&kg_path, &NullSink).unwrap();
    // Literal objects (price values) are pruned; entity-object triples
    // plus the missing-price dummy survive.
    assert_eq!(index.triples().len(), 7);
    assert!(index.entity_index("Event_0").is_some());
    assert!(index.entity_index("priceDummy").is_some());

    let config = TrainingConfig::for_model("Distmult")
        .unwrap()
        .with_embedding_dim(8)
        .with_num_iterations(20)
        .with_batch_size(4);
    let trained = EmbeddingTrainer::new(config)
        .with_sink(Box::new(NullSink))
        .fit(&index)
        .unwrap();
    assert_eq!(
        trained.entity_embeddings().shape(),
        &[index.num_entities(), 8]
    );

    let report = LinkPredictionEvaluator::new()
        .with_sample_fraction(1.0)
        .with_sink(Box::new(NullSink))
        .evaluate(trained.model(), &index);
    assert_eq!(report.global.num_probes, index.triples().len());
    assert!(report.global.hits_at_1 <= report.global.hits_at_3);
    assert!(report.global.hits_at_3 <= report.global.hits_at_10);
    assert!(report.global.mean_rank >= 1.0);
    assert!(report.global.mrr > 0.0 && report.global.mrr <= 1.0);
    assert!(report.per_relation.contains_key("color"));

    let csv_path = export_embeddings(&trained, &index, dir.path()).unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let rows = reader.records().count();
    assert_eq!(rows, index.num_entities() + index.num_relations());

    let types = type_assertions(&index);
    assert_eq!(
        types["Event_0"],
        std::collections::HashSet::from(["Gadget".to_string()])
    );

    let bundle = EmbeddingBundle::new(&trained, &index);
    assert_eq!(bundle.entity_vector("Event_2").unwrap().len(), 8);
}
