//! nftprof - nftables profile manager
//!
//! Manages named firewall profiles stored in `/etc/nftables.conf`. Each
//! profile becomes an address set, a port set and one accept rule in the
//! input chain.
//!
//! # Usage
//!
//! ```bash
//! nftprof list                                            # Show all profiles
//! nftprof add brazil --ip 200.1.2.0/24 --ports 22,443 --comment "Brazil office"
//! nftprof edit brazil add-ip 200.1.3.0/24                 # Incremental edits
//! nftprof edit brazil add-ports 80,8080
//! nftprof remove brazil                                   # Asks y/N first
//! nftprof apply --check                                   # nft --check, then nft -f
//! nftprof diff                                            # On-disk vs generated file
//! nftprof --conf ./test.conf render                       # Work on another file
//! ```
//!
//! Every mutating command loads the file, runs one operation and writes the
//! whole file back.

use clap::{Parser, Subcommand};
use nftprof::config::{self, AppConfig};
use nftprof::core::conf_file::{self, LoadedConf};
use nftprof::core::profiles::{ProfileEdit, ProfileError};
use nftprof::core::{apply, verify};
use nftprof::{ProfileStore, audit, formatting, utils, validators};
use std::error::Error as StdError;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T = ()> = Result<T, Box<dyn StdError>>;

/// Exit status for Ctrl-C, as a shell reports SIGINT
const EXIT_INTERRUPTED: u8 = 130;

/// Raised when Ctrl-C arrives while the terminal is in raw mode
#[derive(Debug, thiserror::Error)]
#[error("Interrupted by operator")]
struct Interrupted;

#[derive(Parser)]
#[command(name = "nftprof", version)]
#[command(about = "Manage nftables firewall profiles", long_about = None)]
struct Cli {
    /// nftables configuration file to manage (default: /etc/nftables.conf)
    #[arg(long, global = true, value_name = "PATH")]
    conf: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all profiles
    List,
    /// Add a new profile
    Add {
        /// Profile name (letters, digits, underscore)
        name: String,
        /// Allowed source address or CIDR network (repeatable)
        #[arg(long = "ip", value_name = "ADDR", required = true)]
        ips: Vec<String>,
        /// Comma-separated TCP ports, e.g. 22,443
        #[arg(long)]
        ports: String,
        /// Free-text comment attached to the accept rule
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Edit an existing profile (shows it when no change is given)
    Edit {
        /// Profile name
        name: String,
        #[command(subcommand)]
        action: Option<EditAction>,
    },
    /// Remove a profile
    Remove {
        /// Profile name
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Rewrite the configuration file and load it with nft -f
    Apply {
        /// Run nft --check on the written file first
        #[arg(long)]
        check: bool,
    },
    /// Rewrite the configuration file and check it with nft --check
    Check,
    /// Print the configuration the current profiles generate
    Render,
    /// Show how the on-disk file differs from the generated configuration
    Diff,
    /// Print the live kernel ruleset (nft list ruleset)
    Ruleset,
    /// Show recent audit log entries
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },
    /// Show or change stored settings
    Config {
        /// Store a new default configuration file path
        #[arg(long, value_name = "PATH")]
        conf_path: Option<PathBuf>,
        /// Store a new nft binary name or path
        #[arg(long, value_name = "CMD")]
        nft_command: Option<String>,
        /// Always run nft --check before apply
        #[arg(long, value_name = "BOOL")]
        check_before_apply: Option<bool>,
    },
}

#[derive(Subcommand)]
enum EditAction {
    /// Add an allowed address or network
    AddIp { ip: String },
    /// Remove an allowed address or network
    RemoveIp { ip: String },
    /// Add comma-separated ports (existing ones are skipped)
    AddPorts { ports: String },
    /// Remove one port
    RemovePort { port: String },
    /// Replace the comment
    Comment {
        #[arg(default_value = "")]
        text: String,
    },
}

fn main() -> ExitCode {
    let _ = utils::ensure_dirs();
    init_logging();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        tokio::select! {
            result = handle_cli(cli) => match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) if e.is::<Interrupted>() => {
                    eprintln!("\n{e}");
                    ExitCode::from(EXIT_INTERRUPTED)
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", Interrupted);
                ExitCode::from(EXIT_INTERRUPTED)
            }
        }
    })
}

/// Logs to `nftprof.log` in the state directory, or warnings to stderr
fn init_logging() {
    let log_file = utils::get_state_dir().and_then(|mut path| {
        path.push("nftprof.log");
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init(),
        None => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init(),
    }
}

async fn handle_cli(cli: Cli) -> CliResult {
    let config = config::load_config().await.with_overrides(cli.conf.as_deref());

    match cli.command {
        Commands::List => {
            let loaded = load(&config).await?;
            println!("Firewall profiles in {}:\n", config.conf_path.display());
            print!("{}", formatting::format_profile_table(&loaded.store));
        }
        Commands::Add {
            name,
            ips,
            ports,
            comment,
        } => {
            let ips = validate_ips(&ips)?;
            let ports = validate_ports(&ports)?;
            let comment = validators::sanitize_comment(&comment);

            let mut loaded = load(&config).await?;
            loaded.store.add_profile(&name, ips, ports, &comment)?;
            conf_file::save_store(&config.conf_path, &loaded.store).await?;

            audit::log_profile_change(audit::EventType::AddProfile, &name, "created").await;
            println!("Profile '{name}' added.");
        }
        Commands::Edit { name, action } => {
            let mut loaded = load(&config).await?;

            let Some(action) = action else {
                let profile = loaded
                    .store
                    .get(&name)
                    .ok_or_else(|| not_found(&loaded.store, &name))?;
                print!("{}", formatting::format_profile_details(profile));
                return Ok(());
            };

            let edit = edit_from_action(action)?;
            let change = edit.to_string();
            let outcome = loaded.store.edit_profile(&name, edit)?;

            if outcome.changed() {
                conf_file::save_store(&config.conf_path, &loaded.store).await?;
                audit::log_profile_change(audit::EventType::EditProfile, &name, &change).await;
            }
            println!("{}", outcome.message());
        }
        Commands::Remove { name, yes } => {
            let mut loaded = load(&config).await?;

            match loaded.store.get(&name) {
                None => {
                    println!("{}", not_found(&loaded.store, &name));
                    return Ok(());
                }
                Some(_) if !yes => {
                    if !utils::stdin_is_tty() {
                        return Err("Refusing to remove without a terminal; pass --yes".into());
                    }
                    if !confirm(&format!("Confirm removal of profile '{name}'?"))? {
                        println!("Cancelled.");
                        return Ok(());
                    }
                }
                Some(_) => {}
            }

            loaded.store.remove_profile(&name)?;
            conf_file::save_store(&config.conf_path, &loaded.store).await?;

            audit::log_profile_change(audit::EventType::RemoveProfile, &name, "removed").await;
            println!("Profile '{name}' removed.");
        }
        Commands::Apply { check } => {
            let loaded = load(&config).await?;
            conf_file::save_store(&config.conf_path, &loaded.store).await?;

            if check || config.check_before_apply {
                run_check(&config).await?;
            }

            apply::apply_store(&config.nft_command, &config.conf_path, &loaded.store).await?;
            println!("Rules applied successfully.");
        }
        Commands::Check => {
            let loaded = load(&config).await?;
            conf_file::save_store(&config.conf_path, &loaded.store).await?;
            run_check(&config).await?;
        }
        Commands::Render => {
            let loaded = load(&config).await?;
            print!("{}", loaded.store.to_nft_text());
        }
        Commands::Diff => {
            let loaded = load(&config).await?;
            let on_disk = loaded.text.as_deref().unwrap_or_default();
            match formatting::format_diff(on_disk, &loaded.store.to_nft_text()) {
                Some(diff) => print!("{diff}"),
                None => println!("{} is up to date.", config.conf_path.display()),
            }
        }
        Commands::Ruleset => {
            let ruleset = apply::list_ruleset(&config.nft_command).await?;
            print!("{ruleset}");
        }
        Commands::History { count } => {
            let log = audit::AuditLog::new()?;
            let events = log.read_recent(count).await?;
            if events.is_empty() {
                println!("No audit entries in {}", log.path().display());
            }
            for event in events.iter().rev() {
                println!(
                    "{} {:<15} {:<3} {}{}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type,
                    if event.success { "ok" } else { "ERR" },
                    event.details,
                    event
                        .error
                        .as_ref()
                        .map(|e| format!(" ({e})"))
                        .unwrap_or_default()
                );
            }
        }
        Commands::Config {
            conf_path,
            nft_command,
            check_before_apply,
        } => {
            let mut stored = config::load_config().await;
            let changed = conf_path.is_some() || nft_command.is_some() || check_before_apply.is_some();

            if let Some(path) = conf_path {
                stored.conf_path = path;
            }
            if let Some(nft) = nft_command {
                stored.nft_command = nft;
            }
            if let Some(check) = check_before_apply {
                stored.check_before_apply = check;
            }
            if changed {
                config::save_config(&stored).await?;
            }

            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
    }

    Ok(())
}

/// Loads the configured file, reporting outside edits to the operator
async fn load(config: &AppConfig) -> nftprof::Result<LoadedConf> {
    let loaded = conf_file::load_store(&config.conf_path).await?;

    if loaded.text.is_none() {
        println!(
            "{} not found; it will be created when profiles are saved.",
            config.conf_path.display()
        );
    }
    if loaded.externally_modified {
        eprintln!(
            "Warning: {} was changed outside nftprof; saving will normalize it (see `nftprof diff`).",
            config.conf_path.display()
        );
    }

    Ok(loaded)
}

/// Runs nft --check on the written file and fails on any reported error
async fn run_check(config: &AppConfig) -> CliResult {
    let result = verify::verify_conf(&config.nft_command, &config.conf_path).await?;

    if result.success {
        println!("Configuration check passed.");
        Ok(())
    } else {
        Err(format!("Verification failed:\n{}", result.errors.join("\n")).into())
    }
}

fn not_found(store: &ProfileStore, name: &str) -> ProfileError {
    if store.is_empty() {
        ProfileError::Empty
    } else {
        ProfileError::NotFound(name.to_string())
    }
}

fn validate_ips(inputs: &[String]) -> nftprof::Result<Vec<String>> {
    let mut ips = Vec::with_capacity(inputs.len());
    for input in inputs {
        ips.push(validate_ip(input)?);
    }
    Ok(ips)
}

fn validate_ip(input: &str) -> nftprof::Result<String> {
    let ip = validators::validate_ip_or_network(input)
        .map_err(|msg| nftprof::Error::validation("ip", msg))?;
    if let Some(warning) = validators::check_address_family(&ip) {
        eprintln!("Warning: {warning}");
    }
    Ok(ip)
}

fn validate_ports(input: &str) -> nftprof::Result<Vec<String>> {
    let ports =
        validators::parse_ports(input).map_err(|msg| nftprof::Error::validation("ports", msg))?;
    for port in &ports {
        if let Some(note) = validators::check_well_known_port(port) {
            tracing::info!("{note}");
        }
    }
    Ok(ports)
}

fn edit_from_action(action: EditAction) -> nftprof::Result<ProfileEdit> {
    Ok(match action {
        EditAction::AddIp { ip } => ProfileEdit::AddIp(validate_ip(&ip)?),
        EditAction::RemoveIp { ip } => ProfileEdit::RemoveIp(ip.trim().to_string()),
        EditAction::AddPorts { ports } => ProfileEdit::AddPorts(validate_ports(&ports)?),
        EditAction::RemovePort { port } => ProfileEdit::RemovePort(port.trim().to_string()),
        EditAction::Comment { text } => {
            ProfileEdit::SetComment(validators::sanitize_comment(&text))
        }
    })
}

/// Asks a y/N question with a single raw-mode keypress.
///
/// Ctrl-C yields [`Interrupted`]; any key other than `y` means no.
fn confirm(prompt: &str) -> CliResult<bool> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    crossterm::terminal::enable_raw_mode()?;

    let answer = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                break match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        Err(Box::new(Interrupted) as Box<dyn StdError>)
                    }
                    KeyCode::Char('y' | 'Y') => Ok(true),
                    _ => Ok(false),
                };
            }
            Ok(_) => {}
            Err(e) => break Err(e.into()),
        }
    };

    // Always restore terminal to normal mode
    let _ = crossterm::terminal::disable_raw_mode();
    println!();
    answer
}
