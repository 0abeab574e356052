//! Main entry point for the planner binary
//!
//! Local commands (`project`, `curve`) work from a results artifact on disk
//! and never touch the network. Service commands (`optimize`, `goal`,
//! `health`) talk to the Model Service.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use planner::core::response;
use planner::services::artifacts;
use planner::{
    AllocationPreset, HttpModelService, ModelService, OptimizationOrchestrator, PlannerConfig, PlannerState,
    Projection, RequestOutcome,
};
use shared::{logging, ChannelId, ComponentId, ModelResults};

/// What-if budget planning against a trained marketing-mix model
#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Project, optimize and goal-seek media budgets against a marketing-mix model")]
pub struct Args {
    /// Model Service root URL (overrides MMM_SERVICE_URL)
    #[arg(long, global = true)]
    pub service_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Project sales and ROI for a hypothetical allocation, locally
    Project {
        /// Results artifact (JSON) from a training run
        #[arg(long)]
        results: PathBuf,

        /// Channel spend override, e.g. --spend TV=1200000
        #[arg(long, value_parser = parse_spend)]
        spend: Vec<(ChannelId, f64)>,

        /// Scale every channel's historical spend before overrides
        #[arg(long)]
        scale: Option<f64>,
    },

    /// Sample a channel's response curve
    Curve {
        #[arg(long)]
        results: PathBuf,

        #[arg(long)]
        channel: String,

        #[arg(long, default_value = "21")]
        points: usize,

        /// Upper end of the curve as a multiple of historical spend
        #[arg(long, default_value = "3.0")]
        max_multiplier: f64,
    },

    /// Optimize a fixed total budget via the Model Service
    Optimize {
        #[arg(long)]
        budget: f64,

        /// Channel bounds as budget fractions, e.g. --bounds TV=0.1:0.5
        #[arg(long, value_parser = parse_bounds)]
        bounds: Vec<(ChannelId, f64, f64)>,

        /// Keep a copy of the fetched results artifact for offline planning
        #[arg(long)]
        save_results: Option<PathBuf>,
    },

    /// Find the budget needed to reach a sales target
    Goal {
        #[arg(long)]
        target: f64,

        /// Cap on the searched budget as a multiple of the historical budget
        #[arg(long)]
        multiplier: Option<f64>,

        /// Keep a copy of the fetched results artifact for offline planning
        #[arg(long)]
        save_results: Option<PathBuf>,
    },

    /// Check the Model Service is reachable
    Health,
}

fn parse_spend(raw: &str) -> Result<(ChannelId, f64), String> {
    let (channel, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CHANNEL=VALUE, got '{raw}'"))?;
    let channel = ChannelId::parse(channel).map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid spend '{value}': {e}"))?;
    Ok((channel, value))
}

fn parse_bounds(raw: &str) -> Result<(ChannelId, f64, f64), String> {
    let (channel, range) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CHANNEL=MIN:MAX, got '{raw}'"))?;
    let (min, max) = range
        .split_once(':')
        .ok_or_else(|| format!("expected MIN:MAX, got '{range}'"))?;
    let channel = ChannelId::parse(channel).map_err(|e| e.to_string())?;
    let min = min.trim().parse::<f64>().map_err(|e| format!("invalid min '{min}': {e}"))?;
    let max = max.trim().parse::<f64>().map_err(|e| format!("invalid max '{max}': {e}"))?;
    Ok((channel, min, max))
}

async fn load_results(path: &Path) -> anyhow::Result<ModelResults> {
    artifacts::read_results(path)
        .await
        .with_context(|| format!("loading results artifact {}", path.display()))
}

fn print_projection(title: &str, projection: &Projection) {
    println!("{title}");
    println!(
        "  {:<20} {:>14} {:>14} {:>9} {:>14} {:>8}",
        "channel", "historical", "candidate", "delta %", "contribution", "roi"
    );
    for delta in &projection.per_channel {
        println!(
            "  {:<20} {:>14.2} {:>14.2} {:>+9.1} {:>14.2} {:>8.3}",
            delta.channel.as_str(),
            delta.historical_spend,
            delta.candidate_spend,
            delta.delta_pct,
            delta.projected_contribution,
            delta.channel_roi
        );
    }
    println!(
        "  total spend {:.2}  projected sales {:.2}  roi {:.3}",
        projection.total_spend, projection.total_sales, projection.roi
    );
}

fn print_waterfall(state: &PlannerState) {
    println!("Reallocation");
    for step in state.waterfall() {
        println!(
            "  {:<20} {:>14.2} -> {:>14.2} ({:+.2})",
            step.channel.as_str(),
            step.reference_spend,
            step.candidate_spend,
            step.delta
        );
    }
    let comparison = state.comparison();
    println!(
        "  spend {:+.1}%  sales {:+.1}%  roi {:+.1}%",
        comparison.spend_change_pct, comparison.sales_change_pct, comparison.roi_change_pct
    );
}

async fn remote_session<S: ModelService>(
    service: S,
    config: &PlannerConfig,
    save_results: Option<&Path>,
) -> anyhow::Result<OptimizationOrchestrator<S>> {
    let results = service.fetch_results().await?;
    if let Some(path) = save_results {
        artifacts::write_results(path, &results)
            .await
            .with_context(|| format!("saving results artifact {}", path.display()))?;
    }
    let state = PlannerState::resume_from_results(results, config.constraint_set())?;
    Ok(OptimizationOrchestrator::new(service, state.into_shared()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut builder = planner::PlannerConfigBuilder::from_config(PlannerConfig::from_env()?);
    if let Some(url) = args.service_url.clone() {
        builder = builder.service_url(url);
    }
    if let Some(level) = args.log_level.clone() {
        builder = builder.log_level(level);
    }
    let config = builder.build()?;

    logging::init_tracing_with_level(Some(&config.log_level));
    logging::log_startup(ComponentId::Cli, &format!("service_url={}", config.service_url));

    match args.command {
        Command::Project { results, spend, scale } => {
            let mut state = PlannerState::resume_from_results(load_results(&results).await?, config.constraint_set())?;
            if let Some(factor) = scale {
                state.apply_preset(AllocationPreset::Scale(factor))?;
            }
            for (channel, value) in &spend {
                state.set_channel_spend(channel, *value)?;
            }

            print_projection("Projection", &state.projection());
            print_waterfall(&state);
            for violation in state.bounds_violations() {
                println!(
                    "  note: {} holds {:.1}% of spend, outside [{:.0}%, {:.0}%]",
                    violation.channel,
                    violation.share * 100.0,
                    violation.bounds.min_fraction * 100.0,
                    violation.bounds.max_fraction * 100.0
                );
            }
        }

        Command::Curve {
            results,
            channel,
            points,
            max_multiplier,
        } => {
            let results = load_results(&results).await?;
            let id = ChannelId::parse(&channel)?;
            let Some(channel) = results.channels().into_iter().find(|c| c.id == id) else {
                bail!("channel '{id}' is not in the results artifact");
            };

            println!("{:>14} {:>14} {:>10}", "spend", "contribution", "marginal");
            for point in response::response_curve(&channel, max_multiplier, points) {
                println!(
                    "{:>14.2} {:>14.2} {:>10.4}{}",
                    point.spend,
                    point.contribution,
                    point.marginal_return,
                    if point.is_current { "  <- current" } else { "" }
                );
            }
        }

        Command::Optimize {
            budget,
            bounds,
            save_results,
        } => {
            let service = HttpModelService::new(&config.service_url)?;
            let orchestrator = remote_session(service, &config, save_results.as_deref()).await?;
            {
                let state = orchestrator.state();
                let mut state = state.lock().await;
                for (channel, min, max) in &bounds {
                    state.set_bounds(channel, *min, *max)?;
                }
            }

            match orchestrator.optimize_budget(budget).await? {
                RequestOutcome::Applied(result) => {
                    let state = orchestrator.state();
                    let state = state.lock().await;
                    print_projection("Optimal allocation", &state.projection());
                    print_waterfall(&state);
                    println!(
                        "Expected lift {:.2} ({:+.1}%)",
                        result.expected_lift.lift, result.expected_lift.lift_pct
                    );
                }
                RequestOutcome::Superseded => println!("Optimization was superseded"),
            }
        }

        Command::Goal {
            target,
            multiplier,
            save_results,
        } => {
            let service = HttpModelService::new(&config.service_url)?;
            let orchestrator = remote_session(service, &config, save_results.as_deref()).await?;
            let multiplier = multiplier.unwrap_or(config.max_budget_multiplier);

            match orchestrator.optimize_for_target(target, multiplier).await? {
                RequestOutcome::Applied(goal) if goal.achievable => {
                    println!(
                        "Target {:.2} reachable with budget {:.2} ({:+.1}%)",
                        goal.target_sales, goal.required_budget, goal.budget_change_pct
                    );
                    orchestrator.apply_goal_plan().await?;
                    let state = orchestrator.state();
                    let state = state.lock().await;
                    print_projection("Goal plan", &state.projection());
                }
                RequestOutcome::Applied(goal) => {
                    println!("Target {:.2} is not reachable: {}", goal.target_sales, goal.message);
                }
                RequestOutcome::Superseded => println!("Goal request was superseded"),
            }
        }

        Command::Health => {
            let status = HttpModelService::new(&config.service_url)?.health_check().await?;
            println!(
                "Model Service {} ({})",
                status.status,
                status.version.as_deref().unwrap_or("unknown version")
            );
            if !status.is_healthy() {
                bail!("Model Service reports status '{}'", status.status);
            }
        }
    }

    logging::log_success(ComponentId::Cli, "Done");
    Ok(())
}
