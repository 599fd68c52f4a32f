use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{AppConfig, config_path};
use crate::ui;

pub fn run(
    ctx: &Context,
    explicit: Option<&str>,
    config: &AppConfig,
    cmd: ConfigCommand,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx, explicit, config),
        ConfigCommand::Path => {
            println!("{}", config_path(explicit)?.display());
            Ok(())
        }
    }
}

fn show(ctx: &Context, explicit: Option<&str>, config: &AppConfig) -> Result<()> {
    let path = config_path(explicit)?;

    if !ctx.quiet {
        ui::header("Configuration");
        ui::kv("File", &path.display().to_string());
        if !path.exists() {
            ui::dim("Not found, showing defaults");
        }
        ui::kv("Graph API", &config.graph_config().base_url());
        println!();
    }

    print!("{}", config.to_toml()?);
    Ok(())
}
