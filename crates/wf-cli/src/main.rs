use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wf_db::Database;

use wf_cli::commands::clock::Direction;
use wf_cli::commands::employment::CreateEmployment;
use wf_cli::commands::payroll::AddPiece;
use wf_cli::commands::{clock, employment, entity, event, hours, init, payroll, shift, status};
use wf_cli::{
    ClockAction, Cli, Commands, Config, EmploymentAction, EntityAction, EventAction, HoursAction,
    PayrollAction, ShiftAction,
};

/// Load config and open database, ensuring the parent directory exists.
///
/// The event type catalog is seeded on every open; seeding skips types that
/// are already registered.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let mut db = Database::open_with(&config.database_path, config.database_options())
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let seeded = db.seed_catalog().context("failed to seed event types")?;
    if seeded > 0 {
        tracing::info!(seeded, "registered catalog event types");
    }
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let db = &mut db;

    match command {
        Commands::Init => init::run(out, db, &config)?,
        Commands::Status => status::run(out, db, &config)?,
        Commands::Entity(action) => match action {
            EntityAction::Create {
                entity_type,
                name,
                props,
            } => entity::create(out, db, entity_type, name.as_deref(), &props.props)?,
            EntityAction::List { entity_type } => entity::list(out, db, entity_type.as_deref())?,
            EntityAction::Show { id } => entity::show(out, db, id)?,
        },
        Commands::Employment(EmploymentAction::Create {
            worker,
            start,
            end,
            role,
            contract_type,
            props,
        }) => {
            let opts = CreateEmployment {
                worker,
                start: Some(*start),
                end: *end,
                role: role.as_deref(),
                contract_type: contract_type.as_deref(),
                props: &props.props,
            };
            employment::create(out, db, &opts)?;
        }
        Commands::Shift(action) => match action {
            ShiftAction::Create {
                employment,
                worker,
                span,
                location,
                auto_periods,
                props,
            } => shift::create(
                out,
                db,
                employment,
                worker,
                span,
                location,
                *auto_periods,
                &props.props,
            )?,
            ShiftAction::AddBreak {
                shift: id,
                span,
                paid,
                props,
            } => shift::add_break(out, db, id, span, *paid, &props.props)?,
            ShiftAction::AddWorkPeriod {
                shift: id,
                span,
                activity,
                props,
            } => shift::add_work_period(out, db, id, span, activity.as_deref(), &props.props)?,
            ShiftAction::AddTask {
                shift: id,
                span,
                title,
                props,
            } => shift::add_task(out, db, id, span, title, &props.props)?,
        },
        Commands::Clock(action) => match action {
            ClockAction::In(args) => clock::punch(out, db, Direction::In, args)?,
            ClockAction::Out(args) => clock::punch(out, db, Direction::Out, args)?,
            ClockAction::Period {
                worker,
                clock_in,
                clock_out,
            } => clock::period(out, db, worker, clock_in, clock_out)?,
        },
        Commands::Payroll(PayrollAction::Add {
            clock_period,
            span,
            rate_type,
            cost_center,
            job_code,
        }) => payroll::add(
            out,
            db,
            AddPiece {
                clock_period,
                span,
                rate_type: rate_type.as_deref(),
                cost_center: cost_center.as_deref(),
                job_code: job_code.as_deref(),
            },
        )?,
        Commands::Event(EventAction::Show { id, tree }) => event::show(out, db, id, *tree)?,
        Commands::Hours(action) => match action {
            HoursAction::Shift { id, json } => hours::shift(out, db, id, *json)?,
            HoursAction::Rates { id } => hours::rates(out, db, id)?,
        },
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON output on stdout stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)?;
    out.flush()?;
    Ok(())
}
