use anyhow::Result;
use colored::Colorize;
use reconcile::{EntityKind, RemoteEntitySummary};

use crate::Context;
use crate::commands::connect;
use crate::config::AppConfig;
use crate::ui;

pub fn run(ctx: &Context, config: &AppConfig, kind: Option<EntityKind>) -> Result<()> {
    let client = connect(config)?;
    let kinds: Vec<EntityKind> = match kind {
        Some(kind) => vec![kind],
        None => EntityKind::all().to_vec(),
    };

    if !ctx.quiet {
        ui::header("Tenant Inventory");
        ui::kv("Graph API", client.base_url());
    }

    let mut failed = 0;
    for kind in kinds {
        ui::section(kind.label());
        match client.list_all::<RemoteEntitySummary>(kind.resource()) {
            Ok(objects) if objects.is_empty() => ui::dim("(none)"),
            Ok(objects) => {
                for object in &objects {
                    let marker = if object.is_built_in == Some(true) {
                        " (built-in)".yellow().to_string()
                    } else {
                        String::new()
                    };
                    println!("  {}{} {}", object.display_name, marker, object.id.dimmed());
                }
                if ctx.verbose > 0 {
                    ui::dim(&ui::plural(objects.len(), "object"));
                }
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("Failed to list {}: {}", kind.resource(), e));
                ui::dim(e.category().advice());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} could not be listed", ui::plural(failed, "kind"));
    }
    Ok(())
}
