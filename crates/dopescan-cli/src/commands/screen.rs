use crate::cli::ScreenArgs;
use crate::config::builder::build_config;
use crate::config::models::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use dopescan::core::models::composition::RoundedComposition;
use dopescan::engine::config::ScreeningConfig;
use dopescan::engine::progress::ProgressReporter;
use dopescan::engine::selection::{RankedCandidate, RankedResult, ScoringFailure};
use dopescan::workflows;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const RANKING_FILE: &str = "ranking.csv";
pub const FAILURES_FILE: &str = "failures.csv";
pub const SUMMARY_FILE: &str = "summary.toml";

// Written explicitly when there are no rows to derive the header from.
const RANKING_HEADER: [&str; 6] = ["candidate", "rank", "score", "signature", "id", "wall_time_ms"];
const FAILURES_HEADER: [&str; 3] = ["id", "signature", "error"];

/// Entries of the ranking repeated in the summary.
const SUMMARY_BEST: usize = 5;

#[derive(Serialize)]
struct RankingRow<'a> {
    candidate: String,
    rank: usize,
    score: f64,
    signature: &'a str,
    id: usize,
    wall_time_ms: f64,
}

#[derive(Serialize)]
struct FailureRow<'a> {
    id: usize,
    signature: &'a str,
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct BestEntry {
    rank: usize,
    candidate: String,
    score: f64,
    signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Summary<'a> {
    host: &'a str,
    sites: usize,
    symmetry: &'a str,
    group_order: usize,
    raw_count: String,
    raw_checked: u64,
    unique: usize,
    evaluated: usize,
    failed: usize,
    evaluation_seconds: f64,
    dopants: BTreeMap<&'a str, usize>,
    screening: &'a ScreeningConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    composition: Option<&'a RoundedComposition>,
    best: Vec<BestEntry>,
}

pub fn run(args: ScreenArgs, threads: Option<usize>) -> Result<()> {
    let app = build_config(&args, threads)?;

    fs::create_dir_all(&app.output_dir).map_err(|e| CliError::Output {
        path: app.output_dir.clone(),
        source: e.into(),
    })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Screening {} sites ({}) under a group of order {}...",
        app.problem.sublattice.len(),
        dopant_label(&app),
        app.problem.group.order()
    );
    info!("Invoking the core screening workflow...");

    let result = workflows::screen::run(&app.problem, &app.model, &app.screening, &reporter)?;

    info!(
        ranked = result.ranked.len(),
        failed = result.failures.len(),
        "Workflow finished."
    );

    let written = write_outputs(&app, &result)?;

    println!(
        "Raw labelings checked: {} | Unique configurations: {}",
        result.stats.raw_checked, result.stats.unique
    );
    if !result.failures.is_empty() {
        warn!(
            "{} configuration(s) failed to score; see {}.",
            result.failures.len(),
            FAILURES_FILE
        );
        println!(
            "  {} configuration(s) failed to score.",
            result.failures.len()
        );
    }
    match result.ranked.first() {
        Some(best) => println!(
            "✓ Best configuration {} (score: {:.10}) written to: {}",
            best.candidate.signature(),
            best.score,
            written.ranking.display()
        ),
        None => {
            warn!("Workflow completed but no configuration could be scored.");
            println!("Warning: no configuration could be scored.");
        }
    }
    println!("  Summary written to: {}", written.summary.display());

    Ok(())
}

struct WrittenFiles {
    ranking: PathBuf,
    summary: PathBuf,
}

fn write_outputs(app: &AppConfig, result: &RankedResult) -> Result<WrittenFiles> {
    let ranking = app.output_dir.join(RANKING_FILE);
    write_ranking(&ranking, &result.ranked)?;

    let failures = app.output_dir.join(FAILURES_FILE);
    write_failures(&failures, &result.failures)?;

    let summary = app.output_dir.join(SUMMARY_FILE);
    write_summary(&summary, app, result)?;

    Ok(WrittenFiles { ranking, summary })
}

fn dopant_label(app: &AppConfig) -> String {
    let dopants: Vec<String> = app
        .problem
        .counts
        .dopants()
        .map(|(label, count)| format!("{label}{count}"))
        .collect();
    if dopants.is_empty() {
        format!("{} only", app.problem.counts.host())
    } else {
        dopants.join(" ")
    }
}

fn candidate_name(rank: usize) -> String {
    format!("candidate_{rank:03}")
}

fn output_error(path: &Path, source: impl Into<anyhow::Error>) -> CliError {
    CliError::Output {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

fn write_ranking(path: &Path, ranked: &[RankedCandidate]) -> Result<()> {
    info!("Writing {} ranked configuration(s) to {:?}", ranked.len(), path);
    let mut writer = csv::Writer::from_path(path).map_err(|e| output_error(path, e))?;
    if ranked.is_empty() {
        writer
            .write_record(RANKING_HEADER)
            .map_err(|e| output_error(path, e))?;
    }
    for entry in ranked {
        let signature = entry.candidate.signature();
        writer
            .serialize(RankingRow {
                candidate: candidate_name(entry.rank),
                rank: entry.rank,
                score: entry.score,
                signature: &signature,
                id: entry.candidate.id,
                wall_time_ms: entry.wall_time.as_secs_f64() * 1e3,
            })
            .map_err(|e| output_error(path, e))?;
    }
    writer.flush().map_err(|e| output_error(path, e))
}

fn write_failures(path: &Path, failures: &[ScoringFailure]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| output_error(path, e))?;
    if failures.is_empty() {
        writer
            .write_record(FAILURES_HEADER)
            .map_err(|e| output_error(path, e))?;
    }
    for failure in failures {
        writer
            .serialize(FailureRow {
                id: failure.candidate_id,
                signature: &failure.signature,
                error: failure.error.to_string(),
            })
            .map_err(|e| output_error(path, e))?;
    }
    writer.flush().map_err(|e| output_error(path, e))
}

fn write_summary(path: &Path, app: &AppConfig, result: &RankedResult) -> Result<()> {
    let stats = &result.stats;
    let summary = Summary {
        host: app.problem.counts.host(),
        sites: stats.sites,
        symmetry: app.symmetry_kind,
        group_order: stats.group_order,
        raw_count: stats.raw_count.to_string(),
        raw_checked: stats.raw_checked,
        unique: stats.unique,
        evaluated: stats.evaluated,
        failed: stats.failed,
        evaluation_seconds: stats.evaluation_time.as_secs_f64(),
        dopants: app.problem.counts.dopants().collect(),
        screening: &app.screening,
        composition: app.composition.as_ref(),
        best: result
            .ranked
            .iter()
            .take(SUMMARY_BEST)
            .map(|entry| BestEntry {
                rank: entry.rank,
                candidate: candidate_name(entry.rank),
                score: entry.score,
                signature: entry.candidate.signature(),
            })
            .collect(),
    };
    let content = toml::to_string_pretty(&summary).map_err(|e| output_error(path, e))?;
    fs::write(path, content).map_err(|e| output_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RING_JOB: &str = r#"
        [sublattice]
        host = "Ti"
        sites = 8

        [dopants.count]
        Nb = 2

        [symmetry]
        type = "cyclic"

        [scorer]
        onsite = { Nb = 0.5 }
        pairs = [{ species = ["Nb", "Nb"], energy = 1.0 }]
        neighbors = [[0, 1], [1, 2], [2, 3], [3, 4], [4, 5], [5, 6], [6, 7], [7, 0]]
    "#;

    fn screen_args(dir: &Path, job: &str) -> ScreenArgs {
        let config = dir.join("job.toml");
        fs::write(&config, job).unwrap();
        ScreenArgs {
            config,
            output: dir.join("results"),
            topk: None,
            max_enum: None,
            max_unique: None,
            batch_size: None,
            set_values: vec![],
        }
    }

    #[test]
    fn candidate_names_are_zero_padded() {
        assert_eq!(candidate_name(1), "candidate_001");
        assert_eq!(candidate_name(42), "candidate_042");
        assert_eq!(candidate_name(1234), "candidate_1234");
    }

    #[test]
    fn screen_writes_ranking_failures_and_summary() {
        let dir = tempdir().unwrap();
        let args = screen_args(dir.path(), RING_JOB);
        let output = args.output.clone();

        run(args, Some(2)).expect("screen ok");

        let mut reader = csv::Reader::from_path(output.join(RANKING_FILE)).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), RANKING_HEADER.to_vec());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        // Two dopants on an 8-ring fall into four rotation classes.
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[0][0], "candidate_001");
        let scores: Vec<f64> = rows.iter().map(|r| r[2].parse().unwrap()).collect();
        assert_eq!(scores, vec![1.0, 1.0, 1.0, 2.0]);

        let failures = fs::read_to_string(output.join(FAILURES_FILE)).unwrap();
        assert_eq!(failures.trim(), "id,signature,error");

        let summary: toml::Table =
            toml::from_str(&fs::read_to_string(output.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["host"].as_str(), Some("Ti"));
        assert_eq!(summary["raw-count"].as_str(), Some("28"));
        assert_eq!(summary["raw-checked"].as_integer(), Some(28));
        assert_eq!(summary["unique"].as_integer(), Some(4));
        assert_eq!(summary["group-order"].as_integer(), Some(8));
        assert_eq!(summary["dopants"]["Nb"].as_integer(), Some(2));
        assert_eq!(summary["screening"]["num_workers"].as_integer(), Some(2));
        assert_eq!(summary["best"].as_array().map(Vec::len), Some(4));
        assert!(summary.get("composition").is_none());
    }

    #[test]
    fn scoring_failures_are_written_without_aborting() {
        let dir = tempdir().unwrap();
        let job = RING_JOB.replace("[7, 0]", "[7, 8]");
        let args = screen_args(dir.path(), &job);
        let output = args.output.clone();

        run(args, Some(1)).expect("screen ok");

        let ranking = fs::read_to_string(output.join(RANKING_FILE)).unwrap();
        assert_eq!(ranking.trim(), RANKING_HEADER.join(","));

        let mut reader = csv::Reader::from_path(output.join(FAILURES_FILE)).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r[2].contains("outside the 8-site sublattice")));

        let summary: toml::Table =
            toml::from_str(&fs::read_to_string(output.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["failed"].as_integer(), Some(4));
        assert_eq!(summary["evaluated"].as_integer(), Some(0));
    }

    #[test]
    fn guard_rejection_is_reported_as_engine_error() {
        let dir = tempdir().unwrap();
        let mut args = screen_args(dir.path(), RING_JOB);
        args.max_enum = Some(27);

        let err = run(args, Some(1)).unwrap_err();
        assert!(matches!(err, CliError::Engine(_)));
        assert!(err.to_string().contains("max_enum (27)"));
    }

    #[test]
    fn percent_composition_is_recorded_in_summary() {
        let dir = tempdir().unwrap();
        let job = r#"
            [sublattice]
            host = "Ti"
            sites = 8

            [dopants.percent]
            Nb = 25.0
        "#;
        let args = screen_args(dir.path(), job);
        let output = args.output.clone();

        run(args, Some(1)).expect("screen ok");

        let summary: toml::Table =
            toml::from_str(&fs::read_to_string(output.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["symmetry"].as_str(), Some("trivial"));
        assert_eq!(summary["unique"].as_integer(), Some(28));
        assert_eq!(
            summary["composition"]["counts"]["Nb"].as_integer(),
            Some(2)
        );
    }
}
