// crates/switchboard-cli/src/main.rs
// ============================================================================
// Module: Switchboard CLI Entry Point
// Description: Command dispatcher for the Switchboard tool server.
// Purpose: Run the server and manage the locally stored session.
// Dependencies: clap, switchboard-config, switchboard-core, switchboard-mcp, thiserror, tokio
// ============================================================================

//! ## Overview
//! `switchboard serve` runs the MCP server. `login`, `logout`, and `whoami`
//! manage the session file the server reads on every request, so signing in
//! or out takes effect without restarting a running server. `tools` prints
//! what the current session can see, and `config validate` checks a config
//! file without starting anything.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::json;
use switchboard_config::CONFIG_ENV_VAR;
use switchboard_config::DEFAULT_CONFIG_NAME;
use switchboard_config::ServerTransport;
use switchboard_config::SwitchboardConfig;
use switchboard_core::AuthContext;
use switchboard_core::AuthContextResolver;
use switchboard_core::CredentialStore;
use switchboard_core::IdentityAuthority;
use switchboard_core::IdentityValidation;
use switchboard_core::Session;
use switchboard_core::ToolDefinition;
use switchboard_mcp::FileCredentialStore;
use switchboard_mcp::HttpIdentityAuthority;
use switchboard_mcp::McpServer;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP server.
    Serve(ConfigArgs),
    /// Validate a bearer token and store it as the active session.
    Login(LoginCommand),
    /// Remove the stored session.
    Logout(ConfigArgs),
    /// Show who the stored session resolves to.
    Whoami(ConfigArgs),
    /// List the tools visible to the stored session.
    Tools(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to switchboard.toml or `SWITCHBOARD_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `login`.
#[derive(Args, Debug)]
struct LoginCommand {
    /// Bearer token issued by the identity service.
    #[arg(long, value_name = "TOKEN")]
    token: String,
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigArgs),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error with a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(&args).await,
        Commands::Login(command) => command_login(command).await,
        Commands::Logout(args) => command_logout(&args),
        Commands::Whoami(args) => command_whoami(&args).await,
        Commands::Tools(args) => command_tools(&args).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(args) => command_config_validate(&args),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = SwitchboardConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if config.server.transport == ServerTransport::Http && config.server.allow_non_loopback {
        stderr_line("warning: HTTP transport is reachable from the network")?;
    }
    let server =
        McpServer::from_config(config).map_err(|err| CliError::new(format!("{err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `login` command.
async fn command_login(command: LoginCommand) -> CliResult<ExitCode> {
    let config = load_session_config(command.config.config.as_deref())?;
    let token = command.token.trim();
    if token.is_empty() {
        return Err(CliError::new("token must not be empty"));
    }
    let authority = HttpIdentityAuthority::from_config(&config.identity)
        .map_err(|err| CliError::new(format!("identity authority: {err}")))?;
    let validation = authority
        .validate(token)
        .await
        .map_err(|err| CliError::new(format!("could not validate token: {err}")))?;
    let session = session_from_validation(token, validation)?;
    credential_store(&config)?
        .write_session(&session)
        .map_err(|err| CliError::new(format!("failed to store session: {err}")))?;
    stdout_line(&signed_in_message(&session))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `logout` command.
fn command_logout(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_session_config(args.config.as_deref())?;
    credential_store(&config)?
        .clear_session()
        .map_err(|err| CliError::new(format!("failed to clear session: {err}")))?;
    stdout_line("Signed out.")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `whoami` command.
async fn command_whoami(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_session_config(args.config.as_deref())?;
    let store: Arc<dyn CredentialStore> = Arc::new(credential_store(&config)?);
    let authority = HttpIdentityAuthority::from_config(&config.identity)
        .map_err(|err| CliError::new(format!("identity authority: {err}")))?;
    let resolver = AuthContextResolver::new(store, Arc::new(authority));
    let resolution = resolver.resolve_detailed(OffsetDateTime::now_utc()).await;
    let Some(context) = resolution.context else {
        stdout_line(&format!("Not signed in ({}).", resolution.outcome.as_str()))?;
        return Ok(ExitCode::FAILURE);
    };
    let rendered = serde_json::to_string_pretty(&describe_context(&context))
        .map_err(|err| CliError::new(format!("failed to render identity: {err}")))?;
    stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `tools` command.
async fn command_tools(args: &ConfigArgs) -> CliResult<ExitCode> {
    let mut config = load_session_config(args.config.as_deref())?;
    config.server.audit.enabled = false;
    let server =
        McpServer::from_config(config).map_err(|err| CliError::new(format!("{err}")))?;
    let tools = server.router().visible_tools().await;
    for line in tool_lines(&tools) {
        stdout_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = SwitchboardConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let tool_count: usize = config.domains.iter().map(|domain| domain.tools.len()).sum();
    stdout_line(&format!(
        "Config OK: {} domain(s), {tool_count} forwarding tool(s).",
        config.domains.len()
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads config for session commands; defaults apply when no file exists.
fn load_session_config(path: Option<&Path>) -> CliResult<SwitchboardConfig> {
    let implicit = path.is_none() && std::env::var_os(CONFIG_ENV_VAR).is_none();
    if implicit && !Path::new(DEFAULT_CONFIG_NAME).exists() {
        return Ok(SwitchboardConfig::default());
    }
    SwitchboardConfig::load(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured session file.
fn credential_store(config: &SwitchboardConfig) -> CliResult<FileCredentialStore> {
    FileCredentialStore::from_config(&config.session)
        .map_err(|err| CliError::new(format!("session file: {err}")))
}

/// Builds the session to persist from a successful validation.
fn session_from_validation(token: &str, validation: IdentityValidation) -> CliResult<Session> {
    if !validation.valid {
        return Err(CliError::new("token was rejected by the identity service"));
    }
    let mut session = Session::new(token);
    session.user_id = validation.user_id;
    session.email = validation.email;
    session.organization_id = validation.organization_id;
    session.organization_name = validation.organization_name;
    session.permissions = validation.permissions;
    Ok(session)
}

/// Confirmation line printed after login.
fn signed_in_message(session: &Session) -> String {
    let who = session.email.as_deref().or(session.user_id.as_deref()).unwrap_or("unknown user");
    match session.organization_name.as_deref().or(session.organization_id.as_deref()) {
        Some(org) => format!("Signed in as {who} ({org})."),
        None => format!("Signed in as {who}."),
    }
}

/// JSON view of a resolved context; the token is never included.
fn describe_context(context: &AuthContext) -> serde_json::Value {
    json!({
        "userId": context.user_id(),
        "email": context.email(),
        "organizationId": context.organization_id(),
        "organizationName": context.organization_name(),
        "permissions": context.permissions().grants(),
    })
}

/// One `name  description` line per tool, names padded to a common width.
fn tool_lines(tools: &[ToolDefinition]) -> Vec<String> {
    let width = tools.iter().map(|tool| tool.name.len()).max().unwrap_or(0);
    tools.iter().map(|tool| format!("{:width$}  {}", tool.name, tool.description)).collect()
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a line to stdout.
fn stdout_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stderr.
fn stderr_line(message: &str) -> CliResult<()> {
    write_stderr_line(message).map_err(|err| CliError::new(format!("failed to write stderr: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
