//! Admin CLI over the grantbook account store.
//!
//! Usage:
//! ```bash
//! GRANTBOOK_DB_URL=sqlite:accounts.db grantbook privilege add --name Admin --description Administrator
//! grantbook account add --name "Admin 1" --email admin1@cool.com --password secret --privilege Admin
//! grantbook account find --name-like "User%" --limit 10
//! grantbook account login --name "Admin 1" --password secret
//! ```
//!
//! Results are printed to stdout as JSON. Errors are printed to stderr as
//! `{"error":{"code":..,"message":..}}`; exit status is 1 for caller errors
//! and 2 for store or configuration failures.

use clap::{ArgGroup, Args, Parser, Subcommand};
use grantbook_core::repo::sqlite::BACKEND_NAME;
use grantbook_core::{
    default_log_level, init_stderr_logging, AccountFilter, AccountService, AccountStore,
    AccountUpdateRequest, Argon2Codec, DatabaseUrl, NewAccountRequest, NewPrivilege, OpContext,
    PrivilegeFilter, ServiceError, SqliteAccountStore, StoreConfig, StoreError, StoreRegistry,
};
use log::error;
use serde_json::{json, Value};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "grantbook",
    version,
    about = "Manage accounts, privileges and grants"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override (`:memory:`, `sqlite:<path>` or a bare path)
    #[arg(long)]
    database_url: Option<String>,

    /// Log level written to stderr
    #[arg(long)]
    log_level: Option<String>,

    /// Per-command deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Privilege catalog
    Privilege {
        #[command(subcommand)]
        command: PrivilegeCommand,
    },
    /// Accounts and their grants
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value = "0")]
    offset: u64,
    #[arg(long, default_value = "20")]
    limit: u32,
}

#[derive(Subcommand)]
enum PrivilegeCommand {
    /// Create one privilege
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Load one privilege by id or name
    #[command(group(ArgGroup::new("key").required(true).args(["id", "name"])))]
    Get {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
    },
    /// List privileges matching all given criteria
    Find {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        name_like: Option<String>,
        #[arg(long)]
        description_like: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Delete privileges; fails while any is still granted
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Register one account
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Privilege name to grant (repeatable)
        #[arg(long = "privilege")]
        privileges: Vec<String>,
    },
    /// Load one account with its privileges
    #[command(group(ArgGroup::new("key").required(true).args(["id", "name", "email"])))]
    Get {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List accounts matching all given criteria
    Find {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        name_like: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        email_like: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Change fields of one account; omitted flags are left untouched
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Target privilege set (repeatable); replaces current grants
        #[arg(long = "privilege", conflicts_with = "clear_privileges")]
        privileges: Vec<String>,
        /// Revoke every grant
        #[arg(long)]
        clear_privileges: bool,
    },
    /// Delete accounts and their grants
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Privileges granted to one account
    Grants { id: i64 },
    /// Verify a password
    Login {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
}

/// Command failure, split by exit status.
enum CliError {
    Setup(String),
    Service(ServiceError),
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Service(value.into())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_stderr_logging(level) {
        eprintln!("{}", error_json("logging", &err));
        return ExitCode::from(2);
    }

    match run(cli) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(CliError::Setup(message)) => {
            error!("event=cli_setup module=cli status=error error_code=setup");
            eprintln!("{}", error_json("setup", &message));
            ExitCode::from(2)
        }
        Err(CliError::Service(err)) => {
            eprintln!("{}", error_json(err.code(), &err.to_string()));
            if err.is_client_error() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let mut config = StoreConfig::from_env().map_err(|err| CliError::Setup(err.to_string()))?;
    if let Some(url) = cli.database_url.as_deref() {
        config.database =
            DatabaseUrl::parse(url).map_err(|err| CliError::Setup(err.to_string()))?;
    }

    let mut registry = StoreRegistry::new();
    registry
        .register_with(BACKEND_NAME, || SqliteAccountStore::open(&config))
        .map_err(|err| CliError::Setup(err.to_string()))?;
    let store = registry
        .get(&config.backend)
        .map_err(|err| CliError::Setup(err.to_string()))?;

    let codec = Argon2Codec::default();
    let service = AccountService::new(store, Arc::new(codec));
    let cx = match cli.timeout_ms {
        Some(ms) => OpContext::with_timeout(Duration::from_millis(ms)),
        None => OpContext::background(),
    };

    match cli.command {
        Command::Privilege { command } => run_privilege(&service, &cx, command),
        Command::Account { command } => run_account(&service, &cx, command),
    }
}

fn run_privilege(
    service: &AccountService<dyn AccountStore>,
    cx: &OpContext,
    command: PrivilegeCommand,
) -> Result<Value, CliError> {
    let store = service.store();
    let output = match command {
        PrivilegeCommand::Add { name, description } => {
            let created = store.add_privileges(cx, vec![NewPrivilege::new(name, description)])?;
            to_json(&created)?
        }
        PrivilegeCommand::Get { id, name } => {
            let privilege = match (id, name) {
                (Some(id), _) => store.get_privilege(cx, id)?,
                (None, Some(name)) => store.get_privilege_by_name(cx, &name)?,
                (None, None) => return Err(missing_key().into()),
            };
            to_json(&privilege)?
        }
        PrivilegeCommand::Find {
            name,
            name_like,
            description_like,
            page,
        } => {
            let mut filter = PrivilegeFilter::default();
            if let Some(name) = name {
                filter = filter.name_eq(name);
            }
            if let Some(pattern) = name_like {
                filter = filter.name_like(pattern);
            }
            if let Some(pattern) = description_like {
                filter = filter.description_like(pattern);
            }
            to_json(&store.find_privileges(cx, &filter, page.offset, page.limit)?)?
        }
        PrivilegeCommand::Delete { ids } => {
            store.delete_privileges(cx, &ids)?;
            json!({ "deleted": ids })
        }
    };
    Ok(output)
}

fn run_account(
    service: &AccountService<dyn AccountStore>,
    cx: &OpContext,
    command: AccountCommand,
) -> Result<Value, CliError> {
    let store = service.store();
    let output = match command {
        AccountCommand::Add {
            name,
            email,
            password,
            privileges,
        } => {
            let created = service.register(
                cx,
                NewAccountRequest {
                    name,
                    email,
                    password,
                    privileges,
                },
            )?;
            to_json(&created)?
        }
        AccountCommand::Get { id, name, email } => {
            let account = match (id, name, email) {
                (Some(id), _, _) => store.get_account(cx, id)?,
                (None, Some(name), _) => store.get_account_by_name(cx, &name)?,
                (None, None, Some(email)) => store.get_account_by_email(cx, &email)?,
                (None, None, None) => return Err(missing_key().into()),
            };
            to_json(&account)?
        }
        AccountCommand::Find {
            name,
            name_like,
            email,
            email_like,
            page,
        } => {
            let mut filter = AccountFilter::default();
            if let Some(name) = name {
                filter = filter.name_eq(name);
            }
            if let Some(pattern) = name_like {
                filter = filter.name_like(pattern);
            }
            if let Some(email) = email {
                filter = filter.email_eq(email);
            }
            if let Some(pattern) = email_like {
                filter = filter.email_like(pattern);
            }
            to_json(&store.find_accounts(cx, &filter, page.offset, page.limit)?)?
        }
        AccountCommand::Update {
            id,
            name,
            email,
            password,
            privileges,
            clear_privileges,
        } => {
            let privileges = if clear_privileges {
                Some(Vec::new())
            } else if privileges.is_empty() {
                None
            } else {
                Some(privileges)
            };
            let summary = service.update(
                cx,
                id,
                AccountUpdateRequest {
                    name,
                    email,
                    password,
                    privileges,
                },
            )?;
            to_json(&summary)?
        }
        AccountCommand::Delete { ids } => {
            store.delete_accounts(cx, &ids)?;
            json!({ "deleted": ids })
        }
        AccountCommand::Grants { id } => to_json(&store.account_privileges(cx, id)?)?,
        AccountCommand::Login { name, password } => {
            let account = service.authenticate(cx, &name, &password)?;
            json!({ "authenticated": true, "account_id": account.id })
        }
    };
    Ok(output)
}

fn missing_key() -> StoreError {
    StoreError::Validation("one lookup key is required".to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Setup(err.to_string()))
}

fn error_json(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}
