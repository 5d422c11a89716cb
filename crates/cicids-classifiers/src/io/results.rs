//! Tab-separated dumps of a finished run, plus its JSON manifest.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::{EvaluationRecord, ModelSource, PipelineReport, RecordOutcome, RunManifest};
use crate::tuning::SearchResult;

pub const EVALUATION_RECORDS_FILE: &str = "evaluation_records.tsv";
pub const SEARCH_RESULTS_FILE: &str = "search_results.tsv";
pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";

const RECORD_HEADER: [&str; 19] = [
    "round",
    "classifier",
    "status",
    "source",
    "accuracy",
    "validation_accuracy",
    "benign_precision",
    "benign_recall",
    "benign_f1",
    "benign_support",
    "attack_precision",
    "attack_recall",
    "attack_f1",
    "attack_support",
    "tn_fp_fn_tp",
    "fit_secs",
    "predict_secs",
    "failed_stage",
    "message",
];

fn tsv_writer<P: AsRef<Path>>(path: P) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path.as_ref())?;
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file)))
}

fn fmt(v: f64) -> String {
    format!("{:.6}", v)
}

/// One row per (round, classifier).
pub fn write_evaluation_records<P: AsRef<Path>>(records: &[EvaluationRecord], path: P) -> Result<()> {
    let mut writer = tsv_writer(path)?;
    writer.write_record(RECORD_HEADER)?;

    for record in records {
        let round = record.round.to_string();
        let code = record.classifier.code();
        match &record.outcome {
            RecordOutcome::Scored(s) => {
                let [benign, attack] = &s.report.per_class;
                let cm = s.report.confusion;
                let source = match s.source {
                    ModelSource::Trained => "trained",
                    ModelSource::Loaded => "loaded",
                };
                writer.write_record(&[
                    round,
                    code.to_string(),
                    "ok".to_string(),
                    source.to_string(),
                    fmt(s.report.accuracy),
                    s.validation_accuracy.map(fmt).unwrap_or_default(),
                    fmt(benign.precision),
                    fmt(benign.recall),
                    fmt(benign.f_score),
                    benign.support.to_string(),
                    fmt(attack.precision),
                    fmt(attack.recall),
                    fmt(attack.f_score),
                    attack.support.to_string(),
                    format!("{},{},{},{}", cm.tn, cm.fp, cm.fn_, cm.tp),
                    fmt(s.fit_secs),
                    fmt(s.predict_secs),
                    String::new(),
                    String::new(),
                ])?;
            }
            RecordOutcome::Failed { stage, message } => {
                let mut row = vec![String::new(); RECORD_HEADER.len()];
                row[0] = round;
                row[1] = code.to_string();
                row[2] = "failed".to_string();
                row[17] = format!("{:?}", stage).to_lowercase();
                row[18] = message.replace(['\t', '\n'], " ");
                writer.write_record(&row)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// One row per tuned family; the winning config is embedded as JSON.
pub fn write_search_results<P: AsRef<Path>>(results: &[SearchResult], path: P) -> Result<()> {
    let mut writer = tsv_writer(path)?;
    writer.write_record(["classifier", "best_score", "search_secs", "candidates", "best_params"])?;

    for result in results {
        writer.write_record(&[
            result.classifier.code().to_string(),
            fmt(result.best_score),
            fmt(result.search_secs),
            result.candidates.len().to_string(),
            serde_json::to_string(&result.best_config)?,
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_manifest<P: AsRef<Path>>(manifest: &RunManifest, path: P) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut out, manifest)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write all three result files into `dir`, creating it if needed.
pub fn write_report<P: AsRef<Path>>(report: &PipelineReport, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let records = dir.join(EVALUATION_RECORDS_FILE);
    let searches = dir.join(SEARCH_RESULTS_FILE);
    let manifest = dir.join(RUN_MANIFEST_FILE);

    write_evaluation_records(&report.records, &records)?;
    write_search_results(&report.search_results, &searches)?;
    write_manifest(&report.manifest, &manifest)?;

    log::info!("Results written to {}", dir.display());
    Ok(vec![records, searches, manifest])
}
