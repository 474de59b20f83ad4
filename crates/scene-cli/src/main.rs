use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "scene",
    about = "scenegrid — formations and automatic scenario assignments",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to scene.toml (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the redb data file from the config
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Register and inspect tenants
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Manage formations and assign them to tenants or applications
    Formation {
        #[command(subcommand)]
        action: FormationAction,
    },
    /// Inspect automatic scenario assignments
    Assignment {
        #[command(subcommand)]
        action: AssignmentAction,
    },
    /// Register applications
    Application {
        #[command(subcommand)]
        action: ApplicationAction,
    },
    /// Manage runtimes and their labels
    Runtime {
        #[command(subcommand)]
        action: RuntimeAction,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Register a tenant unless its external id is already known
    Add {
        /// External id of the tenant
        external_id: String,
        #[arg(short, long)]
        name: Option<String>,
        /// Internal or external id of the parent tenant
        #[arg(short, long)]
        parent: Option<String>,
        /// account, subaccount or customer
        #[arg(short = 't', long = "type", default_value = "account")]
        tenant_type: String,
    },
    /// Show a tenant by internal or external id
    Show { id: String },
}

#[derive(Subcommand)]
enum FormationAction {
    /// List formation names of a tenant
    List {
        #[arg(long)]
        tenant: String,
    },
    /// Add a formation to the tenant's schema
    Create {
        name: String,
        #[arg(long)]
        tenant: String,
    },
    /// Remove an unused formation from the tenant's schema
    Delete {
        name: String,
        #[arg(long)]
        tenant: String,
    },
    /// Put an application or tenant into a formation
    Assign {
        name: String,
        #[arg(long)]
        tenant: String,
        /// APPLICATION or TENANT
        #[arg(long = "type")]
        object_type: String,
        #[arg(long = "object")]
        object_id: String,
    },
    /// Take an application or tenant out of a formation
    Unassign {
        name: String,
        #[arg(long)]
        tenant: String,
        #[arg(long = "type")]
        object_type: String,
        #[arg(long = "object")]
        object_id: String,
    },
}

#[derive(Subcommand)]
enum AssignmentAction {
    /// Page through the tenant's assignments
    List {
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value_t = 100)]
        page_size: usize,
        /// Scenario name to continue after
        #[arg(long)]
        cursor: Option<String>,
    },
}

#[derive(Subcommand)]
enum ApplicationAction {
    /// Register an application in the tenant
    Register {
        name: String,
        #[arg(long)]
        tenant: String,
    },
    /// List applications visible to the tenant
    List {
        #[arg(long)]
        tenant: String,
    },
}

#[derive(Subcommand)]
enum RuntimeAction {
    /// Register a runtime; labels are key=value, value parsed as JSON if possible
    Create {
        name: String,
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long = "label")]
        labels: Vec<String>,
    },
    /// List runtimes of the tenant, optionally filtered by key=value
    List {
        #[arg(long)]
        tenant: String,
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },
    /// Delete a runtime and its labels
    Delete {
        id: String,
        #[arg(long)]
        tenant: String,
    },
    /// Show the runtime's labels, including derived scenarios
    Labels {
        id: String,
        #[arg(long)]
        tenant: String,
    },
    /// Set one label on a runtime
    SetLabel {
        id: String,
        key: String,
        value: String,
        #[arg(long)]
        tenant: String,
    },
    /// Remove one label from a runtime
    DeleteLabel {
        id: String,
        key: String,
        #[arg(long)]
        tenant: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("scene=info".parse()?);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    let plane = commands::open_plane(cli.config.as_deref(), cli.data.as_deref())?;

    match cli.command {
        Commands::Tenant { action } => match action {
            TenantAction::Add {
                external_id,
                name,
                parent,
                tenant_type,
            } => commands::tenant::add(&plane, &external_id, name, parent, &tenant_type),
            TenantAction::Show { id } => commands::tenant::show(&plane, &id),
        },
        Commands::Formation { action } => match action {
            FormationAction::List { tenant } => commands::formation::list(&plane, &tenant),
            FormationAction::Create { name, tenant } => {
                commands::formation::create(&plane, &tenant, &name)
            }
            FormationAction::Delete { name, tenant } => {
                commands::formation::delete(&plane, &tenant, &name)
            }
            FormationAction::Assign {
                name,
                tenant,
                object_type,
                object_id,
            } => commands::formation::assign(&plane, &tenant, &name, &object_type, &object_id),
            FormationAction::Unassign {
                name,
                tenant,
                object_type,
                object_id,
            } => commands::formation::unassign(&plane, &tenant, &name, &object_type, &object_id),
        },
        Commands::Assignment { action } => match action {
            AssignmentAction::List {
                tenant,
                page_size,
                cursor,
            } => commands::formation::list_assignments(&plane, &tenant, page_size, cursor.as_deref()),
        },
        Commands::Application { action } => match action {
            ApplicationAction::Register { name, tenant } => {
                commands::runtime::register_application(&plane, &tenant, &name)
            }
            ApplicationAction::List { tenant } => {
                commands::runtime::list_applications(&plane, &tenant)
            }
        },
        Commands::Runtime { action } => match action {
            RuntimeAction::Create {
                name,
                tenant,
                description,
                labels,
            } => commands::runtime::create(&plane, &tenant, &name, description, &labels),
            RuntimeAction::List { tenant, filters } => {
                commands::runtime::list(&plane, &tenant, &filters)
            }
            RuntimeAction::Delete { id, tenant } => commands::runtime::delete(&plane, &tenant, &id),
            RuntimeAction::Labels { id, tenant } => commands::runtime::labels(&plane, &tenant, &id),
            RuntimeAction::SetLabel {
                id,
                key,
                value,
                tenant,
            } => commands::runtime::set_label(&plane, &tenant, &id, &key, &value),
            RuntimeAction::DeleteLabel { id, key, tenant } => {
                commands::runtime::delete_label(&plane, &tenant, &id, &key)
            }
        },
    }
}
