use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{
    BatchProgress, DryRunTenant, ImportDecision, ImportOutcome, NotificationSink, OverwritePolicy,
    Reconciler, TenantApi,
};

use crate::Context;
use crate::cli::ImportArgs;
use crate::commands::{connect, remote_advice};
use crate::config::AppConfig;
use crate::loader::{self, Loaded};
use crate::report::ImportReport;
use crate::ui;

pub fn run(ctx: &Context, config: &AppConfig, args: ImportArgs) -> Result<()> {
    let policy = args.policy.unwrap_or(config.import.policy);
    let jobs = args.jobs.unwrap_or(config.import.jobs).max(1);

    let loaded = loader::load(&args.path)?;
    if loaded.payloads.is_empty() && loaded.failures.is_empty() {
        ui::warn(&format!("No JSON documents found in {}", args.path.display()));
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Import");
        ui::kv("Source", &args.path.display().to_string());
        ui::kv("Documents", &loaded.payloads.len().to_string());
        ui::kv("Policy", policy.name());
        ui::kv("Jobs", &jobs.to_string());
        if args.dry_run {
            ui::kv("Mode", "dry run (no changes will be made)");
        }
        println!();
    }

    if policy.overwrites() && !args.yes && !args.dry_run && !confirm_overwrite(policy)? {
        bail!("Import cancelled");
    }

    let client = connect(config)?;
    let report = if args.dry_run {
        execute(ctx, DryRunTenant::new(client), policy, jobs, loaded, true)
    } else {
        execute(ctx, client, policy, jobs, loaded, false)
    };

    if let Some(path) = &args.report {
        report.write(path)?;
        if !ctx.quiet {
            ui::dim(&format!("Report written to {}", path.display()));
        }
    }

    print_summary(ctx, &report);

    if !report.summary.is_success() {
        bail!(
            "{} failed",
            ui::plural(report.summary.failed, "document")
        );
    }
    Ok(())
}

fn confirm_overwrite(policy: OverwritePolicy) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Policy '{}' updates existing objects in the tenant. Continue?",
            policy
        ))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

fn execute<A: TenantApi>(
    ctx: &Context,
    api: A,
    policy: OverwritePolicy,
    jobs: usize,
    loaded: Loaded,
    dry_run: bool,
) -> ImportReport {
    let bar = progress_bar(ctx, loaded.payloads.len());
    let sink = BarNotify { bar: bar.clone() };
    let reconciler = Reconciler::new(api, sink, policy);

    let payloads: Vec<_> = loaded.payloads.iter().map(|p| p.payload.clone()).collect();
    let results =
        reconciler.import_batch_with_progress(&payloads, jobs, &BarProgress { bar: bar.clone() });
    bar.finish_and_clear();

    let mut report = ImportReport::new(policy, dry_run);

    for failure in loaded.failures {
        ui::error(&format!("{}: {}", failure.source, failure.error));
        report.record_failure(failure.source, failure.error);
    }

    for (item, result) in loaded.payloads.iter().zip(results) {
        let source = item.source_label();
        match result {
            Ok(outcome) => {
                print_outcome(ctx, &outcome, dry_run);
                report.record_outcome(source, outcome);
            }
            Err(e) => {
                ui::error(&format!("{}: {}", source, e));
                if let Some(advice) = remote_advice(&e) {
                    ui::dim(advice);
                }
                report.record_failure(source, format!("{:#}", e));
            }
        }
    }

    report
}

fn print_outcome(ctx: &Context, outcome: &ImportOutcome, dry_run: bool) {
    if ctx.quiet {
        return;
    }

    let kind = outcome.kind.label().dimmed();
    let prefix = if dry_run { "Would " } else { "" };
    match &outcome.decision {
        ImportDecision::Create => {
            let verb = if dry_run { "create" } else { "Created" };
            ui::success(&format!("{}{} {} ({})", prefix, verb, outcome.label(), kind));
        }
        ImportDecision::PatchById(target) | ImportDecision::PatchByName(target) => {
            let verb = if dry_run { "update" } else { "Updated" };
            ui::success(&format!(
                "{}{} {} -> {} ({})",
                prefix,
                verb,
                outcome.label(),
                target,
                kind
            ));
        }
        ImportDecision::Skip(_) => {
            if ctx.verbose > 0 {
                ui::dim(&format!("Skipped {} ({})", outcome.label(), outcome.kind.label()));
            }
        }
    }
}

fn print_summary(ctx: &Context, report: &ImportReport) {
    if ctx.quiet {
        return;
    }

    let summary = &report.summary;
    ui::section("Summary");
    ui::kv("Created", &summary.created.to_string());
    ui::kv("Updated", &summary.patched.to_string());
    ui::kv("Skipped", &summary.skipped.to_string());
    ui::kv("Failed", &summary.failed.to_string());
    println!();

    if summary.is_success() {
        ui::success(&format!(
            "Processed {}{}",
            ui::plural(summary.total(), "document"),
            if report.dry_run { " (dry run)" } else { "" }
        ));
    }
}

fn progress_bar(ctx: &Context, len: usize) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}

/// Prints skip notifications above the progress bar
struct BarNotify {
    bar: ProgressBar,
}

impl NotificationSink for BarNotify {
    fn notify(&self, message: &str) {
        self.bar.suspend(|| ui::warn(message));
    }
}

struct BarProgress {
    bar: ProgressBar,
}

impl BatchProgress for BarProgress {
    fn on_payload_complete(&self, _index: usize, _result: &reconcile::Result<ImportOutcome>) {
        self.bar.inc(1);
    }
}
