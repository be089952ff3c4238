use serde::Serialize;

use super::applications::{Application, ApplicationStatus};
use super::assessment::AssessmentResult;
use super::domain::JobId;
use super::jobs::Job;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCountEntry {
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssessmentTally {
    pub completed: usize,
    pub passed: usize,
    pub expired: usize,
}

/// Per-job funnel view used by project leaders.
#[derive(Debug, Clone, Serialize)]
pub struct JobPipelineSummary {
    pub job_id: JobId,
    pub title: String,
    pub job_status: &'static str,
    pub views: u64,
    pub applications: usize,
    pub by_status: Vec<StatusCountEntry>,
    pub technical: AssessmentTally,
    pub hr: AssessmentTally,
    pub average_overall_score: Option<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub fn summarize(job: &Job, applications: &[Application]) -> JobPipelineSummary {
    let by_status = ApplicationStatus::ordered()
        .into_iter()
        .map(|status| StatusCountEntry {
            status,
            status_label: status.label(),
            count: applications
                .iter()
                .filter(|application| application.status == status)
                .count(),
        })
        .filter(|entry| entry.count > 0)
        .collect();

    let scores: Vec<u32> = applications
        .iter()
        .filter_map(|application| application.overall_score)
        .map(u32::from)
        .collect();
    let average_overall_score = if scores.is_empty() {
        None
    } else {
        let mean = scores.iter().sum::<u32>() as f64 / scores.len() as f64;
        Some(mean.round() as u8)
    };

    JobPipelineSummary {
        job_id: job.id.clone(),
        title: job.title.clone(),
        job_status: job.status.label(),
        views: job.views_count,
        applications: applications.len(),
        by_status,
        technical: tally(applications.iter().map(|a| &a.technical_assessment)),
        hr: tally(applications.iter().map(|a| &a.hr_assessment)),
        average_overall_score,
    }
}

fn tally<'a>(results: impl Iterator<Item = &'a AssessmentResult>) -> AssessmentTally {
    results.fold(AssessmentTally::default(), |mut tally, result| {
        if result.is_completed() {
            tally.completed += 1;
            if result.passed {
                tally.passed += 1;
            }
        } else if result.status.is_finished() {
            tally.expired += 1;
        }
        tally
    })
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Application")]
    application_id: &'a str,
    #[serde(rename = "Candidate")]
    candidate: &'a str,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Progress")]
    progress: u8,
    #[serde(rename = "Technical %")]
    technical: Option<u8>,
    #[serde(rename = "HR %")]
    hr: Option<u8>,
    #[serde(rename = "Overall")]
    overall: Option<u8>,
    #[serde(rename = "Decision")]
    decision: &'static str,
}

/// One row per application, in submission order.
pub fn export_csv(applications: &[Application]) -> Result<String, ReportError> {
    let mut ordered: Vec<&Application> = applications.iter().collect();
    ordered.sort_by(|left, right| {
        left.submitted_at
            .cmp(&right.submitted_at)
            .then_with(|| left.id.cmp(&right.id))
    });

    let mut writer = csv::Writer::from_writer(Vec::new());
    for application in ordered {
        let view = application.view();
        writer.serialize(ExportRow {
            application_id: &application.id.0,
            candidate: &application.candidate.name,
            email: &application.candidate.email,
            status: view.status,
            progress: view.progress_percentage,
            technical: view.technical_percentage,
            hr: view.hr_percentage,
            overall: view.overall_score,
            decision: view.decision,
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}
