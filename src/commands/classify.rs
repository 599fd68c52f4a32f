use anyhow::Result;
use colored::Colorize;
use reconcile::classify_spec;
use std::path::Path;

use crate::Context;
use crate::loader;
use crate::ui;

pub fn run(ctx: &Context, path: &Path) -> Result<()> {
    let loaded = loader::load(path)?;

    if !ctx.quiet {
        ui::header("Classification");
        ui::kv("Source", &path.display().to_string());
        println!();
    }

    let mut unsupported = 0;
    for item in &loaded.payloads {
        let name = item.payload.display_name().unwrap_or("(unnamed)");
        match classify_spec(item.payload.discriminator()) {
            Ok(spec) => println!(
                "  {} {} {}",
                "✓".green(),
                name,
                format!("{} -> {}", spec.label, spec.resource).dimmed()
            ),
            Err(e) => {
                unsupported += 1;
                ui::error(&format!("{}: {}", item.source_label(), e));
            }
        }
    }

    for failure in &loaded.failures {
        ui::error(&format!("{}: {}", failure.source, failure.error));
    }

    let failed = unsupported + loaded.failures.len();
    if !ctx.quiet {
        println!();
        let total = loaded.payloads.len() + loaded.failures.len();
        ui::kv("Recognised", &format!("{} of {}", total - failed, total));
    }

    if failed > 0 {
        anyhow::bail!("{} could not be classified", ui::plural(failed, "document"));
    }
    Ok(())
}
