use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use penplot::{init_logging, list_ports, CancelFlag, Config, Pipeline, Progress, Stage};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "penplot",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("PENPLOT_BUILD_DATE"), ")"),
    about = "Turn images into pen plots: FPGA edge acquisition, path planning and plotting"
)]
struct Cli {
    /// Configuration file (.toml or .json); defaults to the per-user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edge-filter an image on the host and write an accelerator-style artifact
    Filter {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Plan a command file from a received artifact
    Plan {
        #[arg(long)]
        artifact: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Render the ordered path to this image
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Send an image to the FPGA and store its response
    Acquire {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        artifact: PathBuf,
        /// Also dump the RGB payload as a .mem file
        #[arg(long)]
        mem: Option<PathBuf>,
    },
    /// Stream a command file to the controller
    Plot {
        #[arg(long)]
        commands: PathBuf,
    },
    /// Acquire, plan and plot in one go
    Run {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        artifact: PathBuf,
        #[arg(long)]
        commands: PathBuf,
    },
    /// List available serial ports
    Ports,
}

/// Logs progress at every tenth of completion
fn progress_logger(label: &'static str) -> impl FnMut(Progress) {
    let mut last_decile = None;
    move |p: Progress| {
        let decile = p.percent() / 10;
        if last_decile != Some(decile) {
            last_decile = Some(decile);
            tracing::info!("{}: {}/{} ({}%)", label, p.done, p.total, p.percent());
        }
    }
}

fn print_ports() -> penplot::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        match port.usb_ids {
            Some((vid, pid)) => println!(
                "{}  {:04x}:{:04x}  {}",
                port.port_name, vid, pid, port.description
            ),
            None => println!("{}  {}", port.port_name, port.description),
        }
    }
    Ok(())
}

fn execute(pipeline: &Pipeline, command: Command, cancel: &CancelFlag) -> penplot::Result<()> {
    match command {
        Command::Filter { image, out } => {
            let frame = pipeline.filter_file(&image, &out)?;
            println!(
                "{}x{} edge frame, {} pixels on -> {}",
                frame.width(),
                frame.height(),
                frame.count_on(),
                out.display()
            );
        }
        Command::Plan {
            artifact,
            out,
            preview,
        } => {
            let report = pipeline.plan_file(&artifact, &out, preview.as_deref())?;
            println!("contours:      {}", report.contours);
            println!(
                "pen-up travel: {:.1}px -> {:.1}px ({:.0}% saved)",
                report.travel_before,
                report.travel_after,
                report.travel_saved() * 100.0
            );
            println!(
                "points:        {} -> {}",
                report.points_before, report.points_after
            );
            println!("commands:      {} -> {}", report.commands, out.display());
        }
        Command::Acquire {
            image,
            artifact,
            mem,
        } => {
            if let Some(mem) = mem {
                let payload = pipeline.prepare_payload(&image)?;
                penplot_camtools::payload::write_mem(&mem, &payload)?;
            }
            let report = pipeline.acquire(&image, &artifact, cancel, progress_logger("upload"))?;
            println!(
                "sent {} bytes, received {} -> {}",
                report.sent,
                report.received,
                report.artifact.display()
            );
        }
        Command::Plot { commands } => {
            let report = pipeline.plot(&commands, cancel, progress_logger("plot"))?;
            println!(
                "{} commands acknowledged (peak {} in flight)",
                report.commands, report.peak_outstanding
            );
        }
        Command::Run {
            image,
            artifact,
            commands,
        } => {
            let mut upload = progress_logger("upload");
            let mut plot = progress_logger("plot");
            let report = pipeline.run_cycle(&image, &artifact, &commands, cancel, |stage, p| {
                match stage {
                    Stage::Acquire => upload(p),
                    _ => plot(p),
                }
            })?;
            println!(
                "received {} bytes, {} contours, {} commands plotted",
                report.acquire.received, report.plan.contours, report.plot.commands
            );
        }
        Command::Ports => print_ports()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    if let Command::Ports = cli.command {
        return print_ports().context("enumerating serial ports");
    }

    let config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    let pipeline = Arc::new(Pipeline::from_config(&config).context("building pipeline")?);

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next poll");
            on_signal.cancel();
        }
    });

    let command = cli.command;
    let outcome = tokio::task::spawn_blocking(move || execute(&pipeline, command, &cancel))
        .await
        .context("pipeline worker failed")?;

    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancelled() => {
            tracing::info!("Cancelled by user");
            std::process::exit(130);
        }
        Err(e) => Err(e.into()),
    }
}
