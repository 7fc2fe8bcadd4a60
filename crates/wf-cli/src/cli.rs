//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::commands::util::parse_datetime;

/// Workforce temporal engine.
///
/// Records employment, shifts, clock punches and payroll pieces as nested,
/// time-bounded events, and derives worked hours from them.
#[derive(Debug, Parser)]
#[command(name = "wf", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database and seed the event type catalog.
    Init,

    /// Manage participants (people, locations, resources).
    #[command(subcommand)]
    Entity(EntityAction),

    /// Manage employment periods.
    #[command(subcommand)]
    Employment(EmploymentAction),

    /// Create shifts and their breaks, work periods and tasks.
    #[command(subcommand)]
    Shift(ShiftAction),

    /// Record clock punches and pair them into clock periods.
    #[command(subcommand)]
    Clock(ClockAction),

    /// Allocate clock period time to payroll pieces.
    #[command(subcommand)]
    Payroll(PayrollAction),

    /// Inspect stored events.
    #[command(subcommand)]
    Event(EventAction),

    /// Derived hours.
    #[command(subcommand)]
    Hours(HoursAction),

    /// Show database location and event counts.
    Status,
}

/// Extra `key=value` properties; values are parsed as JSON when possible.
#[derive(Debug, Clone, Default, Args)]
pub struct PropArgs {
    /// Additional property (repeatable), e.g. `--prop notes="late start"`.
    #[arg(long = "prop", value_name = "KEY=VALUE")]
    pub props: Vec<String>,
}

/// A closed time span.
#[derive(Debug, Clone, Args)]
pub struct SpanArgs {
    /// Start time (RFC 3339 or e.g. "2 hours ago").
    #[arg(long, value_parser = parse_datetime)]
    pub start: DateTime<Utc>,

    /// End time (RFC 3339 or e.g. "30 minutes ago").
    #[arg(long, value_parser = parse_datetime)]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Subcommand)]
pub enum EntityAction {
    /// Create an entity.
    Create {
        /// Entity type, e.g. `person` or `location`.
        entity_type: String,

        /// Display name, stored as the `name` property.
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        props: PropArgs,
    },

    /// List entities.
    List {
        /// Only entities of this type.
        #[arg(long = "type")]
        entity_type: Option<String>,
    },

    /// Show an entity and its participations.
    Show {
        /// Entity ID.
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum EmploymentAction {
    /// Start an employment for a worker.
    Create {
        /// Worker entity ID.
        #[arg(long)]
        worker: String,

        /// Start time.
        #[arg(long, value_parser = parse_datetime)]
        start: DateTime<Utc>,

        /// End time; omit for an open-ended employment.
        #[arg(long, value_parser = parse_datetime)]
        end: Option<DateTime<Utc>>,

        /// Job role, also recorded on the employee participation.
        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        contract_type: Option<String>,

        #[command(flatten)]
        props: PropArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum ShiftAction {
    /// Create a shift under an employment.
    Create {
        /// Employment event ID.
        #[arg(long)]
        employment: String,

        /// Worker entity ID; must be the employment's employee.
        #[arg(long)]
        worker: String,

        #[command(flatten)]
        span: SpanArgs,

        /// Where the shift takes place.
        #[arg(long)]
        location: String,

        /// Generate work periods and an unpaid break.
        #[arg(long)]
        auto_periods: bool,

        #[command(flatten)]
        props: PropArgs,
    },

    /// Add a break to a shift.
    AddBreak {
        /// Shift event ID.
        #[arg(long)]
        shift: String,

        #[command(flatten)]
        span: SpanArgs,

        /// The break is paid.
        #[arg(long)]
        paid: bool,

        #[command(flatten)]
        props: PropArgs,
    },

    /// Add a work period to a shift.
    AddWorkPeriod {
        /// Shift event ID.
        #[arg(long)]
        shift: String,

        #[command(flatten)]
        span: SpanArgs,

        #[arg(long)]
        activity: Option<String>,

        #[command(flatten)]
        props: PropArgs,
    },

    /// Add a task to a shift.
    AddTask {
        /// Shift event ID.
        #[arg(long)]
        shift: String,

        #[command(flatten)]
        span: SpanArgs,

        #[arg(long)]
        title: String,

        #[command(flatten)]
        props: PropArgs,
    },
}

/// Options shared by clock-in and clock-out.
#[derive(Debug, Clone, Args)]
pub struct PunchArgs {
    /// Worker entity ID.
    #[arg(long)]
    pub worker: String,

    /// Punch time; defaults to now.
    #[arg(long, value_parser = parse_datetime)]
    pub at: Option<DateTime<Utc>>,

    /// Where the punch came from, e.g. `kiosk` or `mobile`.
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ClockAction {
    /// Record a clock-in punch.
    In(PunchArgs),

    /// Record a clock-out punch.
    Out(PunchArgs),

    /// Pair a clock-in and clock-out punch into a clock period.
    Period {
        /// Worker entity ID.
        #[arg(long)]
        worker: String,

        /// Clock-in event ID.
        #[arg(long = "in")]
        clock_in: String,

        /// Clock-out event ID.
        #[arg(long = "out")]
        clock_out: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum PayrollAction {
    /// Add a payroll piece inside a clock period.
    Add {
        /// Clock period event ID.
        #[arg(long)]
        clock_period: String,

        #[command(flatten)]
        span: SpanArgs,

        /// Pay rate category; defaults to `regular`.
        #[arg(long)]
        rate_type: Option<String>,

        #[arg(long)]
        cost_center: Option<String>,

        #[arg(long)]
        job_code: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum EventAction {
    /// Show an event with its parent, children and participations.
    Show {
        /// Event ID.
        id: String,

        /// Show the full nested tree instead.
        #[arg(long)]
        tree: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum HoursAction {
    /// Worked, break and net hours of a shift.
    Shift {
        /// Shift event ID.
        id: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Payroll hours of a clock period by rate type.
    Rates {
        /// Clock period event ID.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn shift_create_parses_span_and_flags() {
        let cli = Cli::try_parse_from([
            "wf",
            "shift",
            "create",
            "--employment",
            "emp-1",
            "--worker",
            "ada",
            "--start",
            "2025-06-02T09:00:00Z",
            "--end",
            "2025-06-02T17:00:00Z",
            "--location",
            "Depot",
            "--auto-periods",
            "--prop",
            "department=Logistics",
        ])
        .unwrap();
        let Some(Commands::Shift(ShiftAction::Create {
            span,
            auto_periods,
            props,
            ..
        })) = cli.command
        else {
            panic!("expected shift create");
        };
        assert!(auto_periods);
        assert_eq!(span.start.to_rfc3339(), "2025-06-02T09:00:00+00:00");
        assert_eq!(props.props, vec!["department=Logistics"]);
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let result = Cli::try_parse_from([
            "wf", "clock", "in", "--worker", "ada", "--at", "tomorrow-ish",
        ]);
        assert!(result.is_err());
    }
}
