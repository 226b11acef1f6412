//! main.rs: UWBot bench tool entry point
//!
//! Offline companion to the operator station and the vehicle firmware:
//!   validate   run a command file through the validator and capability clamp
//!   check      replay a telemetry session through the consistency checker
//!   encode     JSON to firmware binary layout
//!   decode     firmware binary layout to JSON
//!   simulate   emit synthetic telemetry, optionally with injected faults
//!
//! Nothing here opens a socket; records come from files and go to files or stdout.

mod config;
mod records;
mod scenarios;
mod vehicle_sim;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info, warn};

use uwbot_types::{format_uptime, validate, CommandRecord, HealthSummary, StateChecker};

use config::FullConfig;
use records::Kind;
use scenarios::{ScenarioConfig, ScenarioType};
use vehicle_sim::VehicleSim;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "uwbot-inspect", about = "UWBot command/state record bench tool")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "uwbot.toml", global = true)]
    config: PathBuf,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Validate a command (.json or .bin) and print the clamped result
    Validate { input: PathBuf },
    /// Check a telemetry session (.ndjson or .bin) record by record
    Check {
        input: PathBuf,
        /// Command the vehicle was last given, for auto-mode consistency
        #[arg(long)]
        command: Option<PathBuf>,
    },
    /// Convert a JSON record file to the firmware binary layout
    Encode {
        input: PathBuf,
        #[arg(long, value_enum)]
        kind: Kind,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Convert a firmware binary file to JSON
    Decode {
        input: PathBuf,
        #[arg(long, value_enum)]
        kind: Kind,
        /// Defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Emit synthetic telemetry as newline-delimited JSON
    Simulate {
        #[arg(long, default_value = "100")]
        cycles: u32,
        /// counter_reset, bad_status, leak, low_battery, link_degraded (repeatable)
        #[arg(long)]
        scenario: Vec<ScenarioType>,
        /// Command to drive the vehicle with; neutral if absent
        #[arg(long)]
        command: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        /// Defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uwbot_inspect=info,uwbot_types=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let cfg = FullConfig::load(&args.config)?;

    match args.cmd {
        Cmd::Validate { input } => cmd_validate(&cfg, &input),
        Cmd::Check { input, command } => cmd_check(&cfg, &input, command.as_deref()),
        Cmd::Encode { input, kind, output } => cmd_encode(&input, kind, &output),
        Cmd::Decode { input, kind, output } => cmd_decode(&input, kind, output.as_deref()),
        Cmd::Simulate { cycles, scenario, command, seed, output } => {
            let mut scenarios = cfg.scenarios.clone();
            scenarios.active.extend(scenario);
            cmd_simulate(&cfg, scenarios, cycles, command.as_deref(), seed, output.as_deref())
        }
    }
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

// ── Subcommands ───────────────────────────────────────────────────────────────

fn cmd_validate(cfg: &FullConfig, input: &Path) -> anyhow::Result<ExitCode> {
    let record = records::read_command(input)?;
    match validate(record) {
        Ok(accepted) => {
            let clamped = cfg.limits.clamp(&accepted);
            let out = json!({
                "accepted": true,
                "emergency_stop": clamped.is_emergency_stop(),
                "locomotion": clamped.locomotion(),
                "record": clamped.record(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(rejection) => {
            let message = rejection.to_string();
            let out = json!({
                "accepted": false,
                "category": rejection.kind(),
                "rejection": rejection,
                "message": message,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(ExitCode::from(1))
        }
    }
}

fn cmd_check(cfg: &FullConfig, input: &Path, command: Option<&Path>) -> anyhow::Result<ExitCode> {
    let states = records::read_states(input)?;
    let mut checker = StateChecker::new();
    if let Some(path) = command {
        let accepted = validate(records::read_command(path)?)
            .with_context(|| format!("command {} was rejected", path.display()))?;
        checker.acknowledge(&accepted);
    }

    let mut out = open_output(None)?;
    let mut flagged = 0usize;
    for (index, state) in states.into_iter().enumerate() {
        let checked = checker.check(state);
        if !checked.is_clean() {
            flagged += 1;
        }
        let health = HealthSummary::assess(&checked.record, &cfg.status_bar);
        let line = json!({
            "index": index,
            "session": checked.session,
            "uptime": format_uptime(checked.record.diagnostics.uptime_s),
            "anomalies": checked.anomalies,
            "health": health,
            "overall": health.overall(),
        });
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    if flagged > 0 {
        warn!("{flagged} record(s) flagged across {} session(s)", checker.session() + 1);
    } else {
        info!("session clean");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_encode(input: &Path, kind: Kind, output: &Path) -> anyhow::Result<ExitCode> {
    let mut bytes = Vec::new();
    match kind {
        Kind::Command => records::write_command_bin(&mut bytes, &records::read_command(input)?)?,
        Kind::State => {
            let states = records::read_states(input)?;
            records::write_states_bin(&mut bytes, &states)?;
            info!("encoded {} state record(s)", states.len());
        }
    }
    std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_decode(input: &Path, kind: Kind, output: Option<&Path>) -> anyhow::Result<ExitCode> {
    if !records::is_binary(input) {
        warn!("{} has no .bin extension, decoding as binary anyway", input.display());
    }
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut out = open_output(output)?;
    match kind {
        Kind::Command => {
            let cmd = uwbot_types::wire::decode_command(&bytes)
                .with_context(|| format!("decoding {}", input.display()))?;
            serde_json::to_writer_pretty(&mut out, &cmd)?;
            out.write_all(b"\n")?;
        }
        Kind::State => {
            let states = records::split_states(&bytes)
                .with_context(|| format!("decoding {}", input.display()))?;
            records::write_states_ndjson(&mut out, &states)?;
        }
    }
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_simulate(
    cfg: &FullConfig,
    scenarios: ScenarioConfig,
    cycles: u32,
    command: Option<&Path>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let record = match command {
        Some(path) => records::read_command(path)?,
        None => CommandRecord::default(),
    };
    let accepted = validate(record).context("simulation command was rejected")?;
    let accepted = cfg.limits.clamp(&accepted);

    info!(
        "simulating {cycles} cycle(s) at {} Hz, scenarios {:?}",
        cfg.simulation.update_rate_hz, scenarios.active
    );
    let mut sim = VehicleSim::new(cfg.simulation.clone(), scenarios, seed);
    let mut out = open_output(output)?;
    for _ in 0..cycles {
        let state = sim.tick(&accepted);
        serde_json::to_writer(&mut out, &state)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}
