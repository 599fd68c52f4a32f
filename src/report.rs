//! JSON report of an import run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reconcile::{ImportOutcome, ImportSummary, OverwritePolicy};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub timestamp: DateTime<Utc>,
    pub policy: OverwritePolicy,
    pub dry_run: bool,
    pub summary: ImportSummary,
    pub outcomes: Vec<ReportEntry>,
    pub failures: Vec<ReportFailure>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub source: String,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFailure {
    pub source: String,
    pub error: String,
}

impl ImportReport {
    pub fn new(policy: OverwritePolicy, dry_run: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            policy,
            dry_run,
            summary: ImportSummary::default(),
            outcomes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_outcome(&mut self, source: String, outcome: ImportOutcome) {
        self.summary.add_outcome(&outcome);
        self.outcomes.push(ReportEntry { source, outcome });
    }

    pub fn record_failure(&mut self, source: String, error: String) {
        self.summary.add_failure();
        self.failures.push(ReportFailure { source, error });
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{EntityKind, ImportDecision, SkipReason};
    use tempfile::TempDir;

    fn outcome(decision: ImportDecision) -> ImportOutcome {
        ImportOutcome {
            kind: EntityKind::DeviceConfiguration,
            display_name: Some("Baseline".to_string()),
            source_id: Some("A".to_string()),
            decision,
            created_id: None,
        }
    }

    #[test]
    fn test_summary_tracks_records() {
        let mut report = ImportReport::new(OverwritePolicy::OverwriteByName, false);
        report.record_outcome("a.json".into(), outcome(ImportDecision::PatchByName("B".into())));
        report.record_outcome("b.json".into(), outcome(ImportDecision::Skip(SkipReason::NameExists)));
        report.record_failure("c.json".into(), "Unsupported configuration type x".into());

        assert_eq!(report.summary.patched, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn test_written_report_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/report.json");

        let mut report = ImportReport::new(OverwritePolicy::Discard, true);
        report.record_outcome("a.json".into(), outcome(ImportDecision::PatchByName("B".into())));
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["policy"], "discard");
        assert_eq!(value["dryRun"], true);
        assert_eq!(value["summary"]["patched"], 1);

        let entry = &value["outcomes"][0];
        assert_eq!(entry["source"], "a.json");
        assert_eq!(entry["kind"], "device-configuration");
        assert_eq!(entry["decision"]["action"], "patch-by-name");
        assert_eq!(entry["decision"]["target"], "B");
        assert!(entry.get("createdId").is_none());
    }
}
