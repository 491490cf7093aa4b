//! `crm` command-line front end over the CRM core.
//!
//! # Responsibility
//! - Resolve configuration from flags and `CRM_*` environment variables.
//! - Map subcommands onto core services and render their results.

mod output;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crm_core::config::DEFAULT_DB_PATH;
use crm_core::model::tenant::DEFAULT_TENANT;
use crm_core::repo::now_epoch_ms;
use crm_core::{
    ContactListQuery, ContactService, CrmConfig, InteractionListQuery, InteractionService,
    NewContact, NewStage, NewTask, SqliteContactRepository, SqliteInteractionRepository,
    SqliteStageRepository, SqliteStatsRepository, SqliteTaskRepository, StageService,
    StatsService, TaskListQuery, TaskPriority, TaskService, TenantId, DEFAULT_ACTIVITY_DAYS,
};
use log::debug;
use output::{print_output, OutputFormat};
use crm_core::rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

const DAY_MS: i64 = 86_400_000;

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "Tenant-scoped sales pipeline: stages, contacts, interactions and tasks", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    output: OutputFormat,

    /// SQLite database file
    #[arg(long, global = true, env = "CRM_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Tenant every command is scoped to
    #[arg(long, global = true, env = "CRM_TENANT_ID", default_value = DEFAULT_TENANT)]
    tenant: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CRM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write rolling log files here instead of stderr
    #[arg(long, global = true, env = "CRM_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pipeline stage management
    #[command(subcommand)]
    Stages(StageCommands),

    /// Contact management
    #[command(subcommand)]
    Contacts(ContactCommands),

    /// Log a touchpoint with a contact
    #[command(subcommand)]
    Log(LogCommands),

    /// Browse logged interactions
    #[command(subcommand)]
    Interactions(InteractionCommands),

    /// Follow-up task management
    #[command(subcommand)]
    Tasks(TaskCommands),

    /// Pipeline and activity reports
    #[command(subcommand)]
    Stats(StatsCommands),
}

#[derive(Subcommand)]
enum StageCommands {
    /// List stages in pipeline order
    List,

    /// Create a stage
    Add {
        name: String,

        /// Ordinal position; appended after existing stages when omitted
        #[arg(short, long)]
        position: Option<i64>,

        /// Display color, e.g. #3B82F6
        #[arg(short, long)]
        color: Option<String>,
    },

    /// Seed the default stages unless the tenant already has some
    Init,

    /// Rewrite positions to follow the given id order
    Reorder {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Delete a stage; its contacts become unstaged
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum ContactCommands {
    /// List contacts, newest first
    List {
        /// Only contacts in this stage
        #[arg(long, conflicts_with = "unstaged")]
        stage: Option<Uuid>,

        /// Only contacts without a stage
        #[arg(long)]
        unstaged: bool,

        #[arg(long)]
        assigned_to: Option<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Filter by active flag
        #[arg(long)]
        active: Option<bool>,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show one contact with recent interactions and open tasks
    Show { id: Uuid },

    /// Create a contact
    Add(AddContactArgs),

    /// Search name, email, company and phone
    Search {
        query: String,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Move a contact into a stage
    Move { id: Uuid, stage: Uuid },

    /// Mark a contact as lost
    Lost {
        id: Uuid,

        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Re-activate a lost contact
    Reactivate { id: Uuid },

    /// Delete a contact with its interactions and tasks
    Delete { id: Uuid },
}

#[derive(Args)]
struct AddContactArgs {
    name: String,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    role: Option<String>,

    #[arg(long)]
    stage: Option<Uuid>,

    #[arg(long)]
    source: Option<String>,

    #[arg(long)]
    assigned_to: Option<String>,

    /// Repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    deal_value: Option<f64>,

    #[arg(long)]
    currency: Option<String>,
}

#[derive(Subcommand)]
enum LogCommands {
    /// Record a note
    Note {
        contact: Uuid,
        content: String,

        /// Author of the entry
        #[arg(long, env = "CRM_ACTOR")]
        by: String,
    },

    /// Record a call
    Call {
        contact: Uuid,
        summary: String,

        #[arg(long, env = "CRM_ACTOR")]
        by: String,

        /// Call length in minutes
        #[arg(short, long)]
        duration: Option<u32>,
    },

    /// Record an email
    Email {
        contact: Uuid,
        subject: String,

        #[arg(long)]
        body: Option<String>,

        #[arg(long, env = "CRM_ACTOR")]
        by: String,
    },
}

#[derive(Subcommand)]
enum InteractionCommands {
    /// List interactions, newest first
    List {
        #[arg(long)]
        contact: Option<Uuid>,

        /// Interaction type, e.g. call
        #[arg(long = "type")]
        kind: Option<String>,

        #[arg(short, long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks: open first, earliest due first
    List {
        #[arg(long)]
        contact: Option<Uuid>,

        #[arg(long)]
        assigned_to: Option<String>,

        /// Filter by completion flag
        #[arg(long)]
        completed: Option<bool>,

        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Create a task
    Add {
        title: String,

        #[arg(long)]
        contact: Option<Uuid>,

        #[arg(long)]
        description: Option<String>,

        /// Due time in epoch milliseconds
        #[arg(long, conflicts_with = "due_in_days")]
        due_at: Option<i64>,

        /// Due this many days from now
        #[arg(long)]
        due_in_days: Option<u32>,

        #[arg(long)]
        assigned_to: Option<String>,

        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
    },

    /// Mark a task completed
    Done { id: Uuid },

    /// Re-open a completed task
    Undone { id: Uuid },

    /// List open tasks past their due time
    Overdue {
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Delete a task
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Active contacts and deal value per stage
    Pipeline,

    /// Counts of records created in a trailing window
    Activity {
        #[arg(short, long, default_value_t = DEFAULT_ACTIVITY_DAYS)]
        days: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => TaskPriority::Low,
            PriorityArg::Medium => TaskPriority::Medium,
            PriorityArg::High => TaskPriority::High,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let tenant_id = TenantId::new(cli.tenant.as_str())
        .ok_or_else(|| anyhow!("tenant id must not be blank"))?;
    let mut config = CrmConfig {
        db_path: cli.db.clone(),
        tenant_id,
        log_dir: cli.log_dir.clone(),
        ..CrmConfig::default()
    };
    if let Some(level) = cli.log_level.as_ref() {
        config.log_level = level.clone();
    }

    config.init_logging().context("Failed to initialize logging")?;
    let conn = config
        .open_db()
        .with_context(|| format!("Failed to open database `{}`", config.db_path.display()))?;
    debug!(
        "event=cli_command module=cli status=start tenant={}",
        config.tenant_id
    );

    let value = execute_command(&cli.command, &conn, &config.tenant_id)?;
    print_output(cli.output, &value)
}

fn execute_command(command: &Commands, conn: &Connection, tenant: &TenantId) -> Result<Value> {
    match command {
        Commands::Stages(command) => execute_stage_command(command, conn, tenant),
        Commands::Contacts(command) => execute_contact_command(command, conn, tenant),
        Commands::Log(command) => execute_log_command(command, conn, tenant),
        Commands::Interactions(command) => execute_interaction_command(command, conn, tenant),
        Commands::Tasks(command) => execute_task_command(command, conn, tenant),
        Commands::Stats(command) => execute_stats_command(command, conn, tenant),
    }
}

fn execute_stage_command(
    command: &StageCommands,
    conn: &Connection,
    tenant: &TenantId,
) -> Result<Value> {
    let service = StageService::new(
        SqliteStageRepository::try_new(conn, tenant.clone()).context("Failed to open stages")?,
    );
    match command {
        StageCommands::List => to_value(service.list_stages().context("Failed to list stages")?),
        StageCommands::Add {
            name,
            position,
            color,
        } => {
            let input = NewStage {
                name: name.clone(),
                position: *position,
                color: color.clone(),
            };
            to_value(service.create_stage(&input).context("Failed to create stage")?)
        }
        StageCommands::Init => to_value(
            service
                .initialize_default_stages()
                .context("Failed to initialize default stages")?,
        ),
        StageCommands::Reorder { ids } => to_value(
            service
                .reorder_stages(ids)
                .context("Failed to reorder stages")?,
        ),
        StageCommands::Delete { id } => {
            service.delete_stage(*id).context("Failed to delete stage")?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn execute_contact_command(
    command: &ContactCommands,
    conn: &Connection,
    tenant: &TenantId,
) -> Result<Value> {
    let service = ContactService::new(
        SqliteContactRepository::try_new(conn, tenant.clone())
            .context("Failed to open contacts")?,
    );
    match command {
        ContactCommands::List {
            stage,
            unstaged,
            assigned_to,
            source,
            tag,
            active,
            limit,
        } => {
            let query = ContactListQuery {
                stage_id: *stage,
                unstaged: *unstaged,
                assigned_to: assigned_to.clone(),
                source: source.clone(),
                tag: tag.clone(),
                is_active: *active,
                limit: *limit,
            };
            to_value(service.list_contacts(&query).context("Failed to list contacts")?)
        }
        ContactCommands::Show { id } => {
            let interactions = InteractionService::new(
                SqliteInteractionRepository::try_new(conn, tenant.clone())
                    .context("Failed to open interactions")?,
            );
            let tasks = TaskService::new(
                SqliteTaskRepository::try_new(conn, tenant.clone())
                    .context("Failed to open tasks")?,
            );
            to_value(
                service
                    .contact_overview(*id, &interactions, &tasks)
                    .context("Failed to load contact")?,
            )
        }
        ContactCommands::Add(args) => {
            let input = NewContact {
                name: args.name.clone(),
                email: args.email.clone(),
                phone: args.phone.clone(),
                company: args.company.clone(),
                role: args.role.clone(),
                stage_id: args.stage,
                source: args.source.clone(),
                assigned_to: args.assigned_to.clone(),
                tags: args.tags.clone(),
                deal_value: args.deal_value,
                currency: args.currency.clone(),
                ..NewContact::default()
            };
            to_value(service.create_contact(&input).context("Failed to create contact")?)
        }
        ContactCommands::Search { query, limit } => to_value(
            service
                .search_contacts(query, *limit)
                .context("Failed to search contacts")?,
        ),
        ContactCommands::Move { id, stage } => to_value(
            service
                .move_stage(*id, *stage)
                .context("Failed to move contact")?,
        ),
        ContactCommands::Lost { id, reason } => to_value(
            service
                .mark_lost(*id, reason.as_deref())
                .context("Failed to mark contact lost")?,
        ),
        ContactCommands::Reactivate { id } => to_value(
            service
                .reactivate(*id)
                .context("Failed to reactivate contact")?,
        ),
        ContactCommands::Delete { id } => {
            service
                .delete_contact(*id)
                .context("Failed to delete contact")?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn execute_log_command(
    command: &LogCommands,
    conn: &Connection,
    tenant: &TenantId,
) -> Result<Value> {
    let service = InteractionService::new(
        SqliteInteractionRepository::try_new(conn, tenant.clone())
            .context("Failed to open interactions")?,
    );
    let interaction = match command {
        LogCommands::Note {
            contact,
            content,
            by,
        } => service.add_note(*contact, content, by),
        LogCommands::Call {
            contact,
            summary,
            by,
            duration,
        } => service.log_call(*contact, summary, by, *duration),
        LogCommands::Email {
            contact,
            subject,
            body,
            by,
        } => service.log_email(*contact, subject, body.as_deref(), by),
    }
    .context("Failed to log interaction")?;
    to_value(interaction)
}

fn execute_interaction_command(
    command: &InteractionCommands,
    conn: &Connection,
    tenant: &TenantId,
) -> Result<Value> {
    let service = InteractionService::new(
        SqliteInteractionRepository::try_new(conn, tenant.clone())
            .context("Failed to open interactions")?,
    );
    match command {
        InteractionCommands::List {
            contact,
            kind,
            limit,
        } => {
            let query = InteractionListQuery {
                contact_id: *contact,
                kind: kind.clone(),
                limit: *limit,
            };
            to_value(
                service
                    .list_interactions(&query)
                    .context("Failed to list interactions")?,
            )
        }
    }
}

fn execute_task_command(
    command: &TaskCommands,
    conn: &Connection,
    tenant: &TenantId,
) -> Result<Value> {
    let service = TaskService::new(
        SqliteTaskRepository::try_new(conn, tenant.clone()).context("Failed to open tasks")?,
    );
    match command {
        TaskCommands::List {
            contact,
            assigned_to,
            completed,
            priority,
            limit,
        } => {
            let query = TaskListQuery {
                contact_id: *contact,
                assigned_to: assigned_to.clone(),
                completed: *completed,
                priority: priority.map(TaskPriority::from),
                limit: *limit,
                ..TaskListQuery::default()
            };
            to_value(service.list_tasks(&query).context("Failed to list tasks")?)
        }
        TaskCommands::Add {
            title,
            contact,
            description,
            due_at,
            due_in_days,
            assigned_to,
            priority,
        } => {
            let due_at = due_at.or_else(|| {
                due_in_days.map(|days| now_epoch_ms() + i64::from(days) * DAY_MS)
            });
            let input = NewTask {
                title: title.clone(),
                contact_id: *contact,
                description: description.clone(),
                due_at,
                assigned_to: assigned_to.clone(),
                priority: priority.map(TaskPriority::from),
            };
            to_value(service.add_task(&input).context("Failed to create task")?)
        }
        TaskCommands::Done { id } => to_value(
            service
                .complete_task(*id)
                .context("Failed to complete task")?,
        ),
        TaskCommands::Undone { id } => to_value(
            service
                .uncomplete_task(*id)
                .context("Failed to re-open task")?,
        ),
        TaskCommands::Overdue { limit } => to_value(
            service
                .overdue_tasks(*limit)
                .context("Failed to list overdue tasks")?,
        ),
        TaskCommands::Delete { id } => {
            service.delete_task(*id).context("Failed to delete task")?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn execute_stats_command(
    command: &StatsCommands,
    conn: &Connection,
    tenant: &TenantId,
) -> Result<Value> {
    let service = StatsService::new(
        SqliteStatsRepository::try_new(conn, tenant.clone()).context("Failed to open stats")?,
    );
    match command {
        StatsCommands::Pipeline => to_value(
            service
                .pipeline_stats()
                .context("Failed to compute pipeline stats")?,
        ),
        StatsCommands::Activity { days } => to_value(
            service
                .activity_stats(*days)
                .context("Failed to compute activity stats")?,
        ),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, ContactCommands, StatsCommands};
    use clap::{CommandFactory, Parser};

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn activity_days_defaults_to_thirty() {
        let cli = Cli::try_parse_from(["crm", "stats", "activity"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Stats(StatsCommands::Activity { days: 30 })
        ));
    }

    #[test]
    fn contact_add_collects_repeated_tags() {
        let cli = Cli::try_parse_from([
            "crm", "contacts", "add", "Ada", "--tag", "vip", "--tag", "lead",
        ])
        .unwrap();
        match cli.command {
            Commands::Contacts(ContactCommands::Add(args)) => {
                assert_eq!(args.name, "Ada");
                assert_eq!(args.tags, vec!["vip", "lead"]);
            }
            _ => panic!("expected contacts add"),
        }
    }
}
