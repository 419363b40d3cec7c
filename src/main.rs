use anyhow::{Context, Result, bail};
use serde_json::json;
use tasktree::cli::{Args, ConfigDiscovery, ExecutionMode, Plan, RunOptions, run_offline, run_realtime};
use tasktree::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Run(options) => run(options).await,
        ExecutionMode::Show { plan, json } => {
            init_logging(env::DEFAULT_LOG_FILTER);
            show(&plan, json)
        }
        ExecutionMode::ShowConfig { config_override } => {
            init_logging(env::DEFAULT_LOG_FILTER);
            ConfigDiscovery::show_discovery_info(config_override.as_deref())
        }
    }
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(options: RunOptions) -> Result<()> {
    let (config, source) = ConfigDiscovery::discover_config(options.config_override.as_deref())?;
    let config = options.apply(config);
    config.validate()?;

    let filter = if options.verbose {
        env::VERBOSE_LOG_FILTER
    } else {
        config.log_filter()
    };
    init_logging(filter);
    match source {
        Some(path) => info!("Using configuration from: {:?}", path),
        None => info!("Using built-in configuration defaults"),
    }

    let plan = Plan::load(&options.plan)
        .with_context(|| format!("failed to load plan {}", options.plan.display()))?;
    let mut tree = plan.build()?;
    info!(
        tasks = tree.len(),
        tick = config.tick_seconds,
        realtime = config.realtime,
        "Starting plan"
    );

    let report = if config.realtime {
        run_realtime(&mut tree, &config).await?
    } else {
        run_offline(&mut tree, &config)?
    };

    if options.json {
        let output = json!({
            "report": report,
            "snapshot": tree.tree_snapshot(report.ticks),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if options.verbose || !report.finished {
        print!("{tree}");
    }

    if !report.finished {
        bail!("plan did not finish within {} ticks", config.max_ticks);
    }
    Ok(())
}

fn show(path: &std::path::Path, json: bool) -> Result<()> {
    let plan = Plan::load(path).with_context(|| format!("failed to load plan {}", path.display()))?;
    let tree = plan.build()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tree.tree_snapshot(0))?);
    } else {
        print!("{tree}");
    }
    Ok(())
}
