use adctl::{cmd, config, error};
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser, Debug)]
#[command(
    name = "adctl",
    about = "Active Directory and Microsoft 365 health reporting",
    version,
    long_about = "Health reporting CLI for hybrid Active Directory environments\n\n\
                  Probe domain controllers, parse dcdiag output, classify readings\n\
                  against thresholds, and render HTML or CSV reports. Directory\n\
                  reports (stale accounts, mailbox usage) come from Microsoft Graph."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate to Microsoft Graph API
    Login(cmd::login::LoginArgs),

    /// Logout and clear cached credentials
    Logout(cmd::login::LogoutArgs),

    /// Manage tenant configurations
    #[command(subcommand)]
    Tenant(TenantCommands),

    /// Domain controller health checks and reports
    #[command(subcommand)]
    Health(HealthCommands),

    /// Account sign-in staleness reports
    #[command(subcommand)]
    Lastlogon(LastLogonCommands),

    /// Mailbox usage reports
    #[command(subcommand)]
    Mailbox(MailboxCommands),
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Add a new tenant configuration
    Add(cmd::tenant::TenantAddArgs),

    /// List all configured tenants
    List(cmd::tenant::TenantListArgs),

    /// Switch active tenant
    Switch(cmd::tenant::TenantSwitchArgs),

    /// Remove a tenant configuration
    Remove(cmd::tenant::TenantRemoveArgs),
}

#[derive(Subcommand, Debug)]
enum HealthCommands {
    /// Sweep domain controllers and write an HTML or CSV report
    Report(cmd::health::HealthReportArgs),

    /// Probe a single host and print the results
    Probe(cmd::health::HealthProbeArgs),

    /// Write the default health.toml for editing
    #[command(name = "init-config")]
    InitConfig(cmd::health::HealthInitConfigArgs),
}

#[derive(Subcommand, Debug)]
enum LastLogonCommands {
    /// Report last sign-in per account and flag stale ones
    Report(cmd::lastlogon::LastLogonArgs),
}

#[derive(Subcommand, Debug)]
enum MailboxCommands {
    /// Report mailbox storage consumption against quota
    Usage(cmd::mailbox::MailboxUsageArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    let cli = Cli::parse();

    // Initialize logging: --verbose wins, otherwise the configured level
    let log_filter = config::ConfigManager::new()
        .and_then(|manager| manager.load_config())
        .unwrap_or_default()
        .log_filter(cli.verbose);
    if let Some(filter) = log_filter {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Login(args) => cmd::login::login(args).await?,
        Commands::Logout(args) => cmd::login::logout(args).await?,
        Commands::Tenant(tenant_cmd) => match tenant_cmd {
            TenantCommands::Add(args) => cmd::tenant::add(args).await?,
            TenantCommands::List(args) => cmd::tenant::list(args).await?,
            TenantCommands::Switch(args) => cmd::tenant::switch(args).await?,
            TenantCommands::Remove(args) => cmd::tenant::remove(args).await?,
        },
        Commands::Health(health_cmd) => match health_cmd {
            HealthCommands::Report(args) => cmd::health::report(args).await?,
            HealthCommands::Probe(args) => cmd::health::probe(args).await?,
            HealthCommands::InitConfig(args) => cmd::health::init_config(args).await?,
        },
        Commands::Lastlogon(lastlogon_cmd) => match lastlogon_cmd {
            LastLogonCommands::Report(args) => cmd::lastlogon::report(args).await?,
        },
        Commands::Mailbox(mailbox_cmd) => match mailbox_cmd {
            MailboxCommands::Usage(args) => cmd::mailbox::usage(args).await?,
        },
    }

    Ok(())
}
