//! rfgen CLI: validate plans, explain runtime filter placement, and print the
//! executor messages a plan dispatches.

use clap::{Args, Parser, Subcommand};
use rfgen_core::config::RuntimeFilterConfig;
use rfgen_core::id::IdGenerator;
use rfgen_planner::{
    apply_plan_config, explain_plan, generate_runtime_filters, parse_yaml_plan, to_wire_executors,
    ConvertContext, ParsedPlan, PlanConfig, PushdownClient, WireExprConverter,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rfgen")]
#[command(about = "Runtime filter generation for hash join plans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plan YAML file (syntax and tree shape)
    Validate {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Show the plan with runtime filters placed (EXPLAIN)
    Explain {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Print the executor messages, runtime filters included, as JSON
    Wire {
        /// Path to the plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Runtime filter settings that take priority over env and plan config.
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Filter mode: LOCAL, GLOBAL, or OFF
    #[arg(long)]
    mode: Option<String>,

    /// Comma separated filter types, e.g. IN,MIN_MAX
    #[arg(long)]
    types: Option<String>,

    /// Scan wait budget in milliseconds
    #[arg(long)]
    max_wait_ms: Option<u64>,
}

impl ConfigOverrides {
    fn as_plan_config(&self) -> PlanConfig {
        PlanConfig {
            enabled: None,
            types: self.types.clone().map(|t| vec![t]),
            mode: self.mode.clone(),
            max_wait_time_ms: self.max_wait_ms,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { plan } => {
            if let Err(e) = validate_plan(&plan) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Plan is valid");
        }
        Commands::Explain { plan, overrides } => {
            if let Err(e) = explain(&plan, &overrides) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Wire {
            plan,
            overrides,
            pretty,
        } => {
            if let Err(e) = wire(&plan, &overrides, pretty) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn validate_plan(plan_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(plan_path)?;
    let _ = parse_yaml_plan(&yaml_content)?;
    Ok(())
}

/// Parse the plan and place runtime filters with the resolved config.
fn plan_with_filters(
    plan_path: &Path,
    overrides: &ConfigOverrides,
) -> Result<ParsedPlan, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(plan_path)?;
    let mut parsed = parse_yaml_plan(&yaml_content)?;

    let config = resolve_config(&parsed.config, overrides)?;
    tracing::info!(?config, "runtime filter config");

    let mut ids = IdGenerator::new();
    let placed = generate_runtime_filters(&mut parsed.plan, &mut ids, &config)?;
    tracing::info!(count = placed.len(), "runtime filters placed");
    Ok(parsed)
}

fn explain(
    plan_path: &Path,
    overrides: &ConfigOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = plan_with_filters(plan_path, overrides)?;
    print!("{}", explain_plan(&parsed.plan)?);
    Ok(())
}

fn wire(
    plan_path: &Path,
    overrides: &ConfigOverrides,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = plan_with_filters(plan_path, overrides)?;
    let client = PushdownClient::new("default");
    let ctx = ConvertContext::new();
    let executors = to_wire_executors(&parsed.plan, &WireExprConverter::new(&client, &ctx))?;
    let json = if pretty {
        serde_json::to_string_pretty(&executors)?
    } else {
        serde_json::to_string(&executors)?
    };
    println!("{json}");
    Ok(())
}

/// env < plan `config` block < CLI flags.
fn resolve_config(
    doc: &PlanConfig,
    overrides: &ConfigOverrides,
) -> Result<RuntimeFilterConfig, Box<dyn std::error::Error>> {
    let mut config = RuntimeFilterConfig::from_env();
    apply_plan_config(doc, &mut config)?;
    apply_plan_config(&overrides.as_plan_config(), &mut config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{apply_plan_config, ConfigOverrides, PlanConfig};
    use rfgen_core::config::{RuntimeFilterConfig, RuntimeFilterMode, RuntimeFilterType};

    #[test]
    fn plan_config_overrides_defaults() {
        let mut config = RuntimeFilterConfig::default();
        let doc = PlanConfig {
            mode: Some("GLOBAL".into()),
            max_wait_time_ms: Some(2_000),
            ..Default::default()
        };
        apply_plan_config(&doc, &mut config).unwrap();
        assert_eq!(config.mode, RuntimeFilterMode::Global);
        assert_eq!(config.max_wait_time_ms, 2_000);
        assert_eq!(config.types, vec![RuntimeFilterType::In]);
    }

    #[test]
    fn cli_overrides_higher_priority_than_config() {
        let mut config = RuntimeFilterConfig::default();
        let doc = PlanConfig {
            mode: Some("GLOBAL".into()),
            ..Default::default()
        };
        apply_plan_config(&doc, &mut config).unwrap();

        let cli = ConfigOverrides {
            mode: Some("local".into()),
            types: Some("IN,MIN_MAX".into()),
            max_wait_ms: None,
        };
        apply_plan_config(&cli.as_plan_config(), &mut config).unwrap();
        assert_eq!(config.mode, RuntimeFilterMode::Local);
        assert_eq!(
            config.types,
            vec![RuntimeFilterType::In, RuntimeFilterType::MinMax]
        );
        assert_eq!(config.max_wait_time_ms, 10_000);
    }

    #[test]
    fn cli_can_switch_generation_off() {
        let mut config = RuntimeFilterConfig::default();
        let cli = ConfigOverrides {
            mode: Some("OFF".into()),
            ..Default::default()
        };
        apply_plan_config(&cli.as_plan_config(), &mut config).unwrap();
        assert!(!config.is_active());
    }
}
