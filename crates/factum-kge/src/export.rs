//! CSV export of trained embedding tables.

use crate::error::Result;
use crate::index::TripleIndex;
use crate::trainer::TrainedModel;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Write the trained entity and relation embeddings to
/// `<dir>/<ModelName>_embeddings.csv` and return the file path.
///
/// One labeled row per entity in index order, then one per relation.
/// The header names the label column and one column per embedding
/// dimension (`d0`..`d{n-1}`).
pub fn export_embeddings(
    trained: &TrainedModel,
    index: &TripleIndex,
    dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("{}_embeddings.csv", trained.name()));
    let mut writer = csv::Writer::from_path(&path)?;

    let entity = trained.entity_embeddings();
    let relation = trained.relation_embeddings();

    let width = entity.ncols();
    let mut header = Vec::with_capacity(width + 1);
    header.push("label".to_string());
    header.extend((0..width).map(|d| format!("d{d}")));
    writer.write_record(&header)?;

    write_rows(&mut writer, index.entities(), &entity)?;
    write_rows(&mut writer, index.relations(), &relation)?;
    writer.flush()?;
    Ok(path)
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    labels: &[String],
    table: &Array2<f32>,
) -> Result<()> {
    for (label, row) in labels.iter().zip(table.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(label.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelFamily;
    use crate::trainer::{EmbeddingTrainer, TrainingConfig};
    use factum_core::NullSink;
    use std::io::Write;

    fn small_index() -> TripleIndex {
        let kg = "\
<e0> <likes> <e1> .
<e1> <knows> <e0> .
";
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(kg.as_bytes()).unwrap();
        TripleIndex::load_with_sink(f.path(), &NullSink).unwrap()
    }

    fn train(index: &TripleIndex, family: ModelFamily, dim: usize) -> TrainedModel {
        let config = TrainingConfig::new(family)
            .with_embedding_dim(dim)
            .with_num_iterations(2)
            .with_batch_size(4);
        EmbeddingTrainer::new(config)
            .with_sink(Box::new(NullSink))
            .fit(index)
            .unwrap()
    }

    #[test]
    fn test_export_layout() {
        let index = small_index();
        let trained = train(&index, ModelFamily::Distmult, 4);
        let dir = tempfile::tempdir().unwrap();

        let path = export_embeddings(&trained, &index, dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Distmult_embeddings.csv"
        );

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["label", "d0", "d1", "d2", "d3"]
        );
        let labels: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        // Entities in index order, then relations.
        assert_eq!(labels, vec!["e0", "e1", "likes", "knows"]);
    }

    #[test]
    fn test_complex_export_has_double_width_header() {
        let index = small_index();
        let trained = train(&index, ModelFamily::Complex, 3);
        let dir = tempfile::tempdir().unwrap();

        let path = export_embeddings(&trained, &index, dir.path()).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        // Real and imaginary halves are concatenated per row.
        assert_eq!(reader.headers().unwrap().len(), 1 + 6);
        assert_eq!(reader.records().count(), index.num_entities() + index.num_relations());
    }
}
