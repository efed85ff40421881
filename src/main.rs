use anyhow::{Context, Result};
use chimera_core::{init_logging, AppConfig};
use chimera_lib::Session;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless organism runtime", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "chimera.toml")]
    config: PathBuf,

    /// Override the number of steps
    #[arg(short, long)]
    steps: Option<u64>,

    /// Override the step size
    #[arg(long)]
    dt: Option<f64>,

    /// Start from the configured snapshot instead of the configured organism
    #[arg(long)]
    resume: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config);
    if let Some(steps) = args.steps {
        config.runtime.steps = steps;
    }
    if let Some(dt) = args.dt {
        config.runtime.delta_time = dt;
    }
    let runtime = config.runtime.clone();

    let mut session = Session::from_config(&config);

    if let Some(path) = &runtime.rules_path {
        let count = chimera_io::load_rule_archive(session.registry_mut(), path)
            .with_context(|| format!("loading rules from {path}"))?;
        tracing::info!(path = %path, count, "Rules loaded");
    }

    if args.resume {
        let path = runtime
            .snapshot_path
            .as_deref()
            .context("--resume needs runtime.snapshot_path in the config")?;
        let state = chimera_io::read_snapshot_file(path)
            .with_context(|| format!("resuming from {path}"))?;
        tracing::info!(path = %path, age = state.age(), "Resumed from snapshot");
        session.replace_state(state);
    }

    let mut failures = 0usize;
    for _ in 0..runtime.steps {
        if runtime.apply_rules {
            let (_, failed) = session.tick_with_rules(runtime.delta_time, &runtime.rule_params);
            failures += failed;
        } else {
            session.tick(runtime.delta_time);
        }
    }

    if let Some(path) = &runtime.snapshot_path {
        chimera_io::write_snapshot_file(session.state(), path)?;
    }
    if let Some(path) = &runtime.checkpoint_path {
        chimera_io::save_checkpoint(session.state(), path)?;
    }

    let state = session.state();
    tracing::info!(
        steps = runtime.steps,
        age = state.age(),
        generation = state.generation(),
        rule_failures = failures,
        "Run finished"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&state_report(&session))?
    );
    Ok(())
}

fn state_report(session: &Session) -> serde_json::Value {
    serde_json::json!({
        "organism": chimera_lib::StateCodec::snapshot(session.state()),
        "rules": session.registry().all_stats(),
    })
}
