use anyhow::Result;
use colored::Colorize;
use reconcile::REGISTRY;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    if !ctx.quiet {
        ui::header("Supported Kinds");
        println!();
    }

    let width = REGISTRY.iter().map(|s| s.kind.name().len()).max().unwrap_or(0);
    for spec in REGISTRY {
        let strategy = if spec.resend.is_raw() { "raw" } else { "typed" };
        println!(
            "  {:width$}  {}  {}",
            spec.kind.name().bold(),
            spec.label,
            format!("[{}] {}", strategy, spec.resource).dimmed(),
            width = width
        );
    }
    Ok(())
}
