use clap::{Parser, Subcommand};
use rf_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, RunTimingSummary, StartFrom,
    case_service, fields, query, run_service,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "rotaflow")]
#[command(about = "rotaflow - incompressible flow in a single rotating frame", long_about = None)]
struct Cli {
    /// Log solver output (time steps, residuals, continuity) instead of a
    /// progress bar
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a case directory from the rotating cavity template
    New {
        case_dir: PathBuf,
        #[arg(long, default_value = "rotatingCavity")]
        name: String,
    },
    /// Validate a case definition, mesh and models
    Validate { case_dir: PathBuf },
    /// Write the initial fields to the start time directory
    Init { case_dir: PathBuf },
    /// Run the case
    Run {
        case_dir: PathBuf,
        /// Override the case end time
        #[arg(long)]
        end_time: Option<f64>,
        /// Do not write fields, step log or manifest
        #[arg(long)]
        no_write: bool,
        /// Continue from the latest time directory
        #[arg(long)]
        latest_time: bool,
        #[arg(long)]
        max_steps: Option<usize>,
        /// Print the solver phase breakdown
        #[arg(long)]
        timing: bool,
    },
    /// List time directories
    Times { case_dir: PathBuf },
    /// Summarise a stored field
    Show {
        case_dir: PathBuf,
        time: String,
        field: String,
    },
    /// Export the step log, or one field's initial residuals, as CSV
    Steps {
        case_dir: PathBuf,
        /// Residual field, e.g. p or Urelx
        #[arg(long)]
        field: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::New { case_dir, name } => cmd_new(&case_dir, &name),
        Commands::Validate { case_dir } => cmd_validate(&case_dir),
        Commands::Init { case_dir } => cmd_init(&case_dir),
        Commands::Run {
            case_dir,
            end_time,
            no_write,
            latest_time,
            max_steps,
            timing,
        } => {
            if timing {
                rf_core::timing::enable_timing();
            }
            let options = RunOptions {
                end_time,
                write: !no_write,
                start_from: if latest_time {
                    StartFrom::LatestTime
                } else {
                    StartFrom::StartTime
                },
                max_steps,
                ..RunOptions::default()
            };
            cmd_run(&case_dir, options, cli.verbose)
        }
        Commands::Times { case_dir } => cmd_times(&case_dir),
        Commands::Show {
            case_dir,
            time,
            field,
        } => cmd_show(&case_dir, &time, &field),
        Commands::Steps {
            case_dir,
            field,
            output,
        } => cmd_steps(&case_dir, field.as_deref(), output.as_deref()),
    }
}

fn cmd_new(case_dir: &Path, name: &str) -> AppResult<()> {
    case_service::create_from_template(case_dir, name)?;
    println!("✓ Created case {} in {}", name, case_dir.display());
    Ok(())
}

fn cmd_validate(case_dir: &Path) -> AppResult<()> {
    println!("Validating case: {}", case_dir.display());
    let summary = case_service::validate_case_dir(case_dir)?;
    println!("✓ Case '{}' is valid", summary.name);
    println!(
        "  Mesh: {} cells, {} faces{}",
        summary.n_cells,
        summary.n_faces,
        if summary.non_orthogonal {
            " (non-orthogonal)"
        } else {
            ""
        }
    );
    for (name, kind, size) in &summary.patches {
        println!("    {:<16} {:?} ({} faces)", name, kind, size);
    }
    println!("  Frame: {}", summary.frame);
    println!("  Turbulence: {}", summary.turbulence);
    if !summary.sources.is_empty() {
        println!("  Sources: {}", summary.sources.join(", "));
    }
    println!(
        "  Time: {} to {}, deltaT {}",
        summary.start_time, summary.end_time, summary.delta_t
    );
    Ok(())
}

fn cmd_init(case_dir: &Path) -> AppResult<()> {
    let report = fields::init_case(case_dir)?;
    println!(
        "✓ Wrote {} for {} cells at time {}",
        report.fields.join(", "),
        report.n_cells,
        report.time
    );
    Ok(())
}

fn cmd_run(case_dir: &Path, options: RunOptions, verbose: bool) -> AppResult<()> {
    println!("Running case: {}", case_dir.display());
    let request = RunRequest { case_dir, options };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let response = if verbose {
        run_service::run_case(&request)?
    } else {
        let response = run_service::run_case_with_progress(
            &request,
            Some(&mut |event| {
                let fraction = event
                    .transient
                    .as_ref()
                    .map(|t| t.fraction_complete)
                    .unwrap_or(-1.0);
                let emit_now = (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                    || event.transient.is_none()
                    || last_emit.elapsed().as_millis() >= 100;
                if emit_now {
                    render_cli_progress(&event);
                    if fraction >= 0.0 {
                        last_fraction = fraction;
                    }
                    last_emit = Instant::now();
                }
            }),
        );
        clear_progress_line();
        response?
    };

    let summary = &response.summary;
    println!(
        "✓ {} steps to t = {}",
        summary.steps, summary.end_time
    );
    if !summary.written.is_empty() {
        println!("  Written: {}", summary.written.join(" "));
    }
    println!(
        "  Courant max: {:.4}  continuity cumulative: {:.3e}",
        summary.last_courant.max, summary.continuity.cumulative
    );
    if summary.unconverged_steps > 0 {
        println!("  Unconverged steps: {}", summary.unconverged_steps);
    }
    if summary.continuity_warnings > 0 {
        println!("  Continuity warnings: {}", summary.continuity_warnings);
    }
    print_timing_summary(&response.timing);
    rf_core::timing::phases::print_summary();
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.transient) {
        (RunStage::Running, Some(t)) => {
            let width = 28usize;
            let filled = ((t.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            let mut line = format!(
                "\r[{}] {:>6.2}%  t={:.4}/{:.4}  dt={:.3e}  step={}  outer={}",
                bar,
                t.fraction_complete * 100.0,
                t.time,
                t.end_time,
                t.delta_t,
                t.step,
                t.n_outer
            );
            if let Some(co) = t.courant {
                line.push_str(&format!("  Co={:.3}", co));
            }
            line.push_str(&format!("  elapsed={:.1}s", event.elapsed_wall_s));
            print!("{}", line);
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    println!(
        "  Compile: {:.3}s ({:.1}%)",
        timing.compile_time_s,
        100.0 * timing.compile_time_s / total
    );
    println!(
        "  Read:    {:.3}s ({:.1}%)",
        timing.read_time_s,
        100.0 * timing.read_time_s / total
    );
    println!(
        "  Solve:   {:.3}s ({:.1}%)",
        timing.solve_time_s,
        100.0 * timing.solve_time_s / total
    );
    println!(
        "  Write:   {:.3}s ({:.1}%)",
        timing.write_time_s,
        100.0 * timing.write_time_s / total
    );
    println!("  Total:   {:.3}s", timing.total_time_s);
    if timing.linear_solve_count > 0 {
        println!(
            "  Momentum {:.3}s, pressure {:.3}s, {} linear solves in {:.3}s",
            timing.momentum_time_s,
            timing.pressure_time_s,
            timing.linear_solve_count,
            timing.linear_solve_time_s
        );
    }
}

fn cmd_times(case_dir: &Path) -> AppResult<()> {
    let times = query::list_times(case_dir)?;
    if times.is_empty() {
        println!("No time directories in {}", case_dir.display());
    } else {
        for t in times {
            println!("{}", t);
        }
    }
    Ok(())
}

fn cmd_show(case_dir: &Path, time: &str, field: &str) -> AppResult<()> {
    let s = query::field_summary(case_dir, time, field)?;
    println!("{} at {} ({} cells)", field, time, s.count);
    println!("  min  {:.6e}", s.min);
    println!("  max  {:.6e}", s.max);
    println!("  mean {:.6e}", s.mean);
    Ok(())
}

fn cmd_steps(case_dir: &Path, field: Option<&str>, output: Option<&Path>) -> AppResult<()> {
    let records = query::load_steps(case_dir)?;

    let csv = match field {
        Some(field) => {
            let mut csv = String::from("time,initial_residual\n");
            for (t, r) in query::residual_series(&records, field) {
                csv.push_str(&format!("{},{}\n", t, r));
            }
            csv
        }
        None => {
            let mut csv = String::from(
                "time,delta_t,courant,n_outer,converged,unconverged_solves,continuity_sum_local,continuity_global,continuity_cumulative\n",
            );
            for r in &records {
                csv.push_str(&format!(
                    "{},{},{},{},{},{},{},{},{}\n",
                    r.time,
                    r.delta_t,
                    r.courant.map(|c| c.to_string()).unwrap_or_default(),
                    r.n_outer,
                    r.converged,
                    r.unconverged_solves,
                    r.continuity_sum_local,
                    r.continuity_global,
                    r.continuity_cumulative
                ));
            }
            csv
        }
    };

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!("✓ Exported {} steps to {}", records.len(), path.display());
    } else {
        print!("{}", csv);
    }
    Ok(())
}
