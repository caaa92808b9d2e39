use std::path::PathBuf;

use anyhow::Context;
use ballot_race::animation::{run_to_completion, AnimationController, AnimationEvent};
use ballot_race::config::{load_config, BallotConfig};
use ballot_race::logging::{init_logging, LogConfig, LogFormat};
use ballot_race::monte_carlo::{run_monte_carlo, summarize};
use ballot_race::output::{create_timestamped_output_dir, write_path_csvs, write_summary_json};
use ballot_race::{IntervalTicker, ProbabilityPolicy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Parser)]
#[command(author, version, about = "Ballot problem probabilities and animated counts")]
struct Cli {
    /// JSON config file (defaults to ./ballot.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormatArg::Compact, global = true)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the closed-form probability
    Theory {
        #[command(flatten)]
        counts: CountArgs,

        /// Which candidate must lead throughout
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// Estimate the probability by Monte Carlo
    Estimate {
        #[command(flatten)]
        counts: CountArgs,

        /// Number of random counts to sample
        #[arg(long)]
        trials: Option<u64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Which candidate must lead throughout
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Write summary.json into a timestamped directory under this root
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay one random count in real time
    Animate {
        #[command(flatten)]
        counts: CountArgs,

        /// Playback speed percentage (1-100)
        #[arg(long)]
        speed: Option<u32>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the rendered path CSVs into a timestamped directory under this root
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct CountArgs {
    /// Votes for candidate A
    #[arg(short, long)]
    a: Option<u32>,

    /// Votes for candidate B
    #[arg(short, long)]
    b: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Classic,
    Symmetric,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Json => LogFormat::Json,
    };
    init_logging(&LogConfig::from_verbosity(cli.verbose).with_format(format))
        .context("failed to install log subscriber")?;

    let mut cfg = load_config(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Theory { counts, policy } => {
            apply_counts(&mut cfg, &counts);
            apply_policy(&mut cfg, policy);
            cfg.validate()?;
            println!(
                "P = {:.6}  (a={}, b={}, policy={})",
                cfg.theoretical(),
                cfg.a,
                cfg.b,
                cfg.policy.label()
            );
        }
        Command::Estimate {
            counts,
            trials,
            seed,
            policy,
            output,
        } => {
            apply_counts(&mut cfg, &counts);
            apply_policy(&mut cfg, policy);
            if let Some(v) = trials {
                cfg.trials = v;
            }
            if let Some(v) = seed {
                cfg.seed = v;
            }
            cfg.validate()?;
            estimate(&cfg, output)?;
        }
        Command::Animate {
            counts,
            speed,
            seed,
            output,
        } => {
            apply_counts(&mut cfg, &counts);
            if let Some(v) = speed {
                cfg.speed = v;
            }
            if let Some(v) = seed {
                cfg.seed = v;
            }
            cfg.validate()?;
            animate(&cfg, output)?;
        }
    }

    Ok(())
}

fn apply_counts(cfg: &mut BallotConfig, counts: &CountArgs) {
    if let Some(v) = counts.a {
        cfg.a = v;
    }
    if let Some(v) = counts.b {
        cfg.b = v;
    }
}

fn apply_policy(cfg: &mut BallotConfig, policy: Option<PolicyArg>) {
    if let Some(policy) = policy {
        cfg.policy = match policy {
            PolicyArg::Classic => ProbabilityPolicy::Classic,
            PolicyArg::Symmetric => ProbabilityPolicy::Symmetric,
        };
    }
}

fn estimate(cfg: &BallotConfig, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mc = cfg.monte_carlo();
    let result = run_monte_carlo(&mc)?;
    let summary = summarize(&mc, &result);

    println!(
        "Trials: {}  (a={}, b={}, policy={})",
        summary.trials,
        summary.a,
        summary.b,
        summary.policy.label()
    );
    println!("Theoretical P = {:.6}", summary.theoretical);
    println!(
        "Empirical P   = {:.6}  (+/- {:.6})",
        summary.empirical,
        1.96 * summary.std_error
    );

    if let Some(root) = output {
        let dir = create_timestamped_output_dir(&root)?;
        let path = dir.join("summary.json");
        write_summary_json(&path, &summary)?;
        println!("Summary: {}", path.display());
    }
    Ok(())
}

fn animate(cfg: &BallotConfig, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut controller =
        AnimationController::new(IntervalTicker::new(), StdRng::seed_from_u64(cfg.seed))
            .with_max_interval(cfg.max_interval_ms);
    controller.start(cfg.a, cfg.b, cfg.speed)?;
    let counts = controller.counts();
    println!(
        "Counting {} ballots (a={}, b={}), P = {:.6}",
        counts.total(),
        counts.a,
        counts.b,
        controller.theoretical()
    );

    let status = run_to_completion(&mut controller, |event| match event {
        AnimationEvent::PointAdded { step, lead } => {
            println!("{step:>5}  {lead:>+5}  {}", lead_bar(*lead));
        }
        AnimationEvent::LeadLost { step } => {
            println!("       A not leading at step {step}");
        }
        AnimationEvent::StatusChanged(_) | AnimationEvent::RunFinished(_) => {}
    })?;

    println!(
        "A: {}  B: {}  Status: {status}",
        controller.count_a(),
        controller.count_b()
    );

    if let Some(root) = output {
        let dir = create_timestamped_output_dir(&root)?;
        let outputs = write_path_csvs(&dir, controller.renderer())?;
        println!("Points: {}", outputs.points_path.display());
        println!("Segments: {}", outputs.segments_path.display());
        println!("Tie markers: {}", outputs.markers_path.display());
    }
    Ok(())
}

fn lead_bar(lead: i64) -> String {
    let width = lead.unsigned_abs().min(40) as usize;
    match lead.signum() {
        1 => format!("|{}", "A".repeat(width)),
        -1 => format!("{}|", "B".repeat(width)),
        _ => "|".to_string(),
    }
}
