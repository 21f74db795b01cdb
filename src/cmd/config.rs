//! Configuration view and validation commands: `bvs config`.

use anyhow::Result;
use bvs::config::{BvsConfig, BvsToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &BvsConfig, command: Option<ConfigCommands>) -> Result<bool> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No bvs.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let effective = BvsToml {
                gates: config.effective_gate_config(),
                scheduler: config.scheduler_limits(),
            };
            println!("Effective values (with env/CLI overrides):");
            println!();
            print!("{}", toml::to_string_pretty(&effective)?);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No bvs.toml found. Using defaults (valid).");
                return Ok(true);
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
                return Ok(false);
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("bvs.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(true);
            }

            std::fs::create_dir_all(&config.bvs_dir)?;
            BvsToml::default().save(&config_path)?;

            println!("Created bvs.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [gates] run_in_parallel, max_fix_attempts, allow_skip");
            println!("  - [gates.typecheck|lint|tests|build] command, args, timeout_secs");
            println!("  - [scheduler] task and dependency limits");
        }
    }

    Ok(true)
}
