//! Result types returned by a batch run.

use serde::Serialize;
use std::path::PathBuf;

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The abstract was appended to the output file.
    Rendered {
        file: String,
        figure: Option<String>,
    },
    /// The submission could not be used (no template tables, converter
    /// failure); the batch went on.
    Skipped { file: String, reason: String },
    /// The submission's data is invalid (malformed id); the batch went on.
    Failed { file: String, reason: String },
}

impl SubmissionOutcome {
    pub fn file(&self) -> &str {
        match self {
            SubmissionOutcome::Rendered { file, .. }
            | SubmissionOutcome::Skipped { file, .. }
            | SubmissionOutcome::Failed { file, .. } => file,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, SubmissionOutcome::Rendered { .. })
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// The LaTeX file that was written.
    pub output_path: PathBuf,
    /// One entry per discovered submission, in processing order.
    pub submissions: Vec<SubmissionOutcome>,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.submissions.len()
    }

    pub fn rendered(&self) -> usize {
        self.submissions.iter().filter(|s| s.is_rendered()).count()
    }

    /// Submissions that were not rendered, skipped or failed.
    pub fn problems(&self) -> impl Iterator<Item = &SubmissionOutcome> {
        self.submissions.iter().filter(|s| !s.is_rendered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BatchReport {
        BatchReport {
            output_path: PathBuf::from("output.tex"),
            submissions: vec![
                SubmissionOutcome::Rendered {
                    file: "A_B.docx".into(),
                    figure: Some("A_B.png".into()),
                },
                SubmissionOutcome::Skipped {
                    file: "C_D.docx".into(),
                    reason: "no tables".into(),
                },
                SubmissionOutcome::Failed {
                    file: "E_F.docx".into(),
                    reason: "malformed id".into(),
                },
            ],
            duration_ms: 12,
        }
    }

    #[test]
    fn counts() {
        let r = report();
        assert_eq!(r.total(), 3);
        assert_eq!(r.rendered(), 1);
        let problems: Vec<&str> = r.problems().map(SubmissionOutcome::file).collect();
        assert_eq!(problems, vec!["C_D.docx", "E_F.docx"]);
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["submissions"][0]["status"], "rendered");
        assert_eq!(json["submissions"][1]["status"], "skipped");
        assert_eq!(json["submissions"][2]["reason"], "malformed id");
    }
}
