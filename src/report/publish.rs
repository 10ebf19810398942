use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use log::{debug, info};

use super::normalize::FlattenedRecord;
use super::tabular::{encode, to_markdown};
use crate::error::{AuditError, Result};
use crate::github::GitHubClient;

pub const ARTIFACT_FILE_NAME: &str = "raw-data";

/// Paths of the files written for one run.
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Writes `raw-data.json` and `raw-data.csv` into `output_dir`.
///
/// Returns the file paths and the encoded CSV text.
///
/// # Errors
///
/// Returns [`AuditError::EmptyInput`] for an empty record set, or an IO error.
pub fn write_files(output_dir: &Path, records: &[FlattenedRecord]) -> Result<(ReportFiles, String)> {
    let csv = encode(records)?;
    fs::create_dir_all(output_dir)?;

    let files = ReportFiles {
        json: output_dir.join(format!("{ARTIFACT_FILE_NAME}.json")),
        csv: output_dir.join(format!("{ARTIFACT_FILE_NAME}.csv")),
    };

    fs::write(&files.json, serde_json::to_string(records)?)?;
    fs::write(&files.csv, &csv)?;
    info!(
        "Report written to {} and {}",
        files.json.display(),
        files.csv.display()
    );

    Ok((files, csv))
}

/// CI environment the artifact bundle is handed to.
#[derive(Debug, Clone, Default)]
pub struct ArtifactEnvironment {
    /// `GITHUB_RUN_NUMBER`; unset outside of a workflow run.
    pub run_number: Option<String>,
    /// `GITHUB_OUTPUT` step output file.
    pub step_output: Option<PathBuf>,
}

impl ArtifactEnvironment {
    pub fn from_env() -> Self {
        Self {
            run_number: std::env::var("GITHUB_RUN_NUMBER")
                .ok()
                .filter(|v| !v.is_empty()),
            step_output: std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }
}

/// Stages both report files as a named artifact bundle.
///
/// The bundle is a `user-report-<epoch millis>` directory next to the report
/// files. Its name and path are exported as step outputs so the workflow's
/// upload step can pick it up. Does nothing outside of a workflow run.
///
/// # Errors
///
/// Returns an IO error if the bundle or the step output cannot be written.
pub fn stage_artifact(
    files: &ReportFiles,
    output_dir: &Path,
    environment: &ArtifactEnvironment,
) -> Result<Option<PathBuf>> {
    if environment.run_number.is_none() {
        debug!("not running in actions, skipping artifact upload");
        return Ok(None);
    }

    let artifact_name = format!("user-report-{}", Utc::now().timestamp_millis());
    let bundle = output_dir.join(&artifact_name);
    fs::create_dir_all(&bundle)?;

    for file in [&files.json, &files.csv] {
        if let Some(name) = file.file_name() {
            fs::copy(file, bundle.join(name))?;
        }
    }

    if let Some(step_output) = &environment.step_output {
        let mut output = OpenOptions::new()
            .create(true)
            .append(true)
            .open(step_output)?;
        writeln!(output, "artifact-name={artifact_name}")?;
        writeln!(output, "artifact-path={}", bundle.display())?;
    }

    info!("Artifact {artifact_name} staged at {}", bundle.display());
    Ok(Some(bundle))
}

/// Scope label used in the issue title.
pub fn report_type(enterprise: Option<&str>) -> &'static str {
    if enterprise.is_some() {
        "Enterprise"
    } else {
        "Organization"
    }
}

pub fn issue_title(enterprise: Option<&str>) -> String {
    format!(
        "{} audit log report for {}",
        report_type(enterprise),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

fn split_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(AuditError::InvalidInput(format!(
            "Repository must be in format 'owner/name', got '{repository}'"
        ))),
    }
}

/// Posts the CSV report as a Markdown table to a new issue, then closes it.
///
/// # Errors
///
/// Returns an error for a malformed repository or a failed API call.
pub async fn post_issue(
    client: &GitHubClient,
    repository: &str,
    enterprise: Option<&str>,
    csv: &str,
) -> Result<u64> {
    let (owner, repo) = split_repository(repository)?;
    let body = to_markdown(csv);

    info!("Posting result to issue {repository}.");
    let issue = client
        .create_issue(owner, repo, &issue_title(enterprise), &body)
        .await?;
    if let Some(url) = &issue.html_url {
        info!("Created issue {url}");
    }

    client.close_issue(owner, repo, issue.number).await?;
    Ok(issue.number)
}
