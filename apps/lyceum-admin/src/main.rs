//! Administrative CLI for lyceum site invitations.

mod config;
mod email;
mod offline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use config::AdminConfig;
use email::InvitationEmailContent;
use lyceum_events_memory::MemoryEventBus;
use lyceum_invitations::{InvitationService, NewInvitation, SiteContext};
use lyceum_signer::Signer;
use lyceum_storage::{Invitation, InvitationCode, InvitationFilter, InvitationStore};
use lyceum_store_sqlite::SqliteInvitationStore;
use offline::OfflineDirectory;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "lyceum-admin")]
#[command(about = "Administer site invitations")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "LYCEUM_DATABASE_URL")]
    database_url: Option<String>,

    /// Path to the admin config file (defaults to ~/.lyceum/config.json)
    #[arg(long, global = true, env = "LYCEUM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a fresh config with a newly generated signing key
    Init {
        /// Site whose invitations this tool administers
        #[arg(long)]
        site: String,

        /// Base URL redemption links are built against
        #[arg(long)]
        base_url: String,
    },
    /// Invitation management commands
    Invite {
        #[command(subcommand)]
        invite_cmd: InviteCommand,
    },
}

#[derive(Subcommand)]
enum InviteCommand {
    /// Create a site invitation and email the redemption link
    Send {
        /// Receiver email address
        #[arg(long)]
        email: String,

        /// Receiver real name
        #[arg(long)]
        realname: String,

        /// Grant site-admin on acceptance
        #[arg(long)]
        site_admin: bool,

        /// Require the accepting account's email to match the invitation
        #[arg(long)]
        require_matching_email: bool,

        /// Personal note included in the email
        #[arg(long)]
        message: Option<String>,

        /// Expiration in hours (0 = never expires)
        #[arg(long, default_value = "336")]
        expires_hours: i64,

        /// Print the link without sending email
        #[arg(long)]
        no_email: bool,
    },
    /// Install the site's generic (link-style) invitation
    Generic {
        /// Explicit code instead of a random one
        #[arg(long)]
        code: Option<String>,
    },
    /// List invitations
    List {
        #[arg(long, value_enum, default_value = "pending")]
        state: StateArg,

        /// Filter by receiver (email or username)
        #[arg(long)]
        receiver: Option<String>,

        /// Filter by sender
        #[arg(long)]
        sender: Option<String>,
    },
    /// Delete an invitation (soft-deletes by backdating expiry if pending)
    Revoke {
        /// Invitation code to revoke
        code: String,
    },
    /// Flip the kill-switch on an invitation
    Disable {
        /// Invitation code
        code: String,

        /// Re-enable instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete all expired invitations
    PurgeExpired,
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Pending,
    Expired,
    Accepted,
    All,
}

// ────────────────────────────────────── Commands ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init { site, base_url } => {
            cmd_init(cli.config, site, base_url)?;
        }
        Command::Invite { invite_cmd } => {
            let config = load_config(cli.config.as_deref())?;
            let store = open_store(cli.database_url.as_deref(), &config).await?;
            let service = build_service(store.clone(), &config)?;
            let ctx = SiteContext::new(config.site.clone());

            match invite_cmd {
                InviteCommand::Send {
                    email,
                    realname,
                    site_admin,
                    require_matching_email,
                    message,
                    expires_hours,
                    no_email,
                } => {
                    cmd_invite_send(
                        &service,
                        &ctx,
                        &config,
                        SendArgs {
                            email,
                            realname,
                            site_admin,
                            require_matching_email,
                            message,
                            expires_hours,
                            no_email,
                        },
                    )
                    .await?;
                }
                InviteCommand::Generic { code } => {
                    cmd_invite_generic(&service, &ctx, &config, code).await?;
                }
                InviteCommand::List {
                    state,
                    receiver,
                    sender,
                } => {
                    cmd_invite_list(store.as_ref(), state, receiver, sender).await?;
                }
                InviteCommand::Revoke { code } => {
                    service
                        .delete_or_soft_delete(&InvitationCode(code.clone()))
                        .await?;
                    println!("✓ Invitation {} revoked", code);
                }
                InviteCommand::Disable { code, undo } => {
                    service
                        .set_disabled(&InvitationCode(code.clone()), !undo)
                        .await?;
                    if undo {
                        println!("✓ Invitation {} re-enabled", code);
                    } else {
                        println!("✓ Invitation {} disabled", code);
                    }
                }
                InviteCommand::PurgeExpired => {
                    let count = service.delete_expired(&InvitationFilter::default()).await?;
                    println!("✓ Deleted {} expired invitation(s)", count);
                }
            }
        }
    }

    Ok(())
}

fn cmd_init(
    config_path: Option<PathBuf>,
    site: String,
    base_url: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(AdminConfig::default_path);
    if path.exists() {
        return Err(format!(
            "Config already exists at {}; delete it first to rotate the signing key",
            path.display()
        )
        .into());
    }
    let config = AdminConfig::generate(site, base_url);
    config.save_to(&path)?;
    println!("✓ Config written to {}", path.display());
    println!("\nEdit it to configure the database URL and email provider.");
    Ok(())
}

struct SendArgs {
    email: String,
    realname: String,
    site_admin: bool,
    require_matching_email: bool,
    message: Option<String>,
    expires_hours: i64,
    no_email: bool,
}

async fn cmd_invite_send(
    service: &InvitationService,
    ctx: &SiteContext,
    config: &AdminConfig,
    args: SendArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut new = if args.site_admin {
        NewInvitation::site_admin(config.sender.clone(), args.email.clone())
    } else {
        NewInvitation::site(config.sender.clone(), args.email.clone())
    };
    new.receiver_name = Some(args.realname.clone());
    new.require_matching_email = args.require_matching_email;
    new.message = args.message.clone();
    if args.expires_hours > 0 {
        new.expires_at = Some(Utc::now() + Duration::hours(args.expires_hours));
    }

    let invitation = service.create_invitation(ctx, new).await?;
    let url = redemption_url(service, config, &invitation)?;

    println!("✓ Invitation created!\n");
    print_invitation(&invitation);
    println!("Link:     {}", url);

    if args.no_email {
        return Ok(());
    }
    match &config.email {
        Some(email_config) => {
            let provider = email::create_provider(email_config)?;
            let content = InvitationEmailContent::new(
                &config.site,
                &args.realname,
                &url,
                args.message.as_deref(),
            );
            provider
                .send_invitation(
                    &args.email,
                    &content,
                    &email_config.from_address,
                    email_config.from_name.as_deref(),
                )
                .await?;
            println!("\n✓ Invitation email sent to {}", args.email);
        }
        None => {
            println!("\nNo email provider configured; share the link yourself.");
        }
    }
    Ok(())
}

async fn cmd_invite_generic(
    service: &InvitationService,
    ctx: &SiteContext,
    config: &AdminConfig,
    code: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let invitation = service
        .set_generic_invitation(ctx, config.sender.clone(), code.map(InvitationCode))
        .await?;
    let url = redemption_url(service, config, &invitation)?;

    println!("✓ Generic site invitation installed!\n");
    println!("Code: {}", invitation.code.as_str());
    println!("Link: {}", url);
    println!("\nAnyone with this link may join {}.", config.site);
    Ok(())
}

async fn cmd_invite_list(
    store: &dyn InvitationStore,
    state: StateArg,
    receiver: Option<String>,
    sender: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = InvitationFilter {
        receivers: receiver.map(|r| vec![r]),
        senders: sender.map(|s| vec![s]),
        ..Default::default()
    };
    let invitations = match state {
        StateArg::Pending => store.pending(&filter).await?,
        StateArg::Expired => store.expired(&filter).await?,
        StateArg::Accepted => store.accepted(&filter).await?,
        StateArg::All => store.all(&filter).await?,
    };

    if invitations.is_empty() {
        println!("No invitations found.");
        return Ok(());
    }
    for invitation in invitations {
        print_invitation(&invitation);
        println!();
    }
    Ok(())
}

fn redemption_url(
    service: &InvitationService,
    config: &AdminConfig,
    invitation: &Invitation,
) -> Result<String, Box<dyn std::error::Error>> {
    let token = service.signed_link(invitation)?;
    Ok(format!(
        "{}/invitations/accept?scode={}",
        config.base_url.trim_end_matches('/'),
        token
    ))
}

fn print_invitation(invitation: &Invitation) {
    println!("Code:     {}", invitation.code.as_str());
    println!("Kind:     {}", invitation.kind.as_str());
    println!("Sender:   {}", invitation.sender);
    if let Some(receiver) = invitation.receiver() {
        println!("Receiver: {}", receiver);
    }
    match invitation.expires_at {
        Some(expiry) => println!("Expires:  {}", expiry),
        None => println!("Expires:  never"),
    }
    if invitation.accepted {
        if let Some(at) = invitation.accepted_at {
            println!("Accepted: {}", at);
        }
    }
    if invitation.disabled {
        println!("Disabled: yes");
    }
}

fn load_config(path: Option<&Path>) -> Result<AdminConfig, config::ConfigError> {
    match path {
        Some(path) => AdminConfig::load_from(path),
        None => AdminConfig::load(),
    }
}

async fn open_store(
    cli_url: Option<&str>,
    config: &AdminConfig,
) -> Result<Arc<SqliteInvitationStore>, Box<dyn std::error::Error>> {
    let store = match cli_url.or(config.database_url.as_deref()) {
        Some(url) => SqliteInvitationStore::open(url).await?,
        None => SqliteInvitationStore::open_default().await?,
    };
    Ok(Arc::new(store))
}

fn build_service(
    store: Arc<SqliteInvitationStore>,
    config: &AdminConfig,
) -> Result<InvitationService, Box<dyn std::error::Error>> {
    let key = config.signing_key_bytes()?;
    let directory = Arc::new(OfflineDirectory);
    Ok(InvitationService::new(
        store,
        directory.clone(),
        directory.clone(),
        directory,
        Arc::new(MemoryEventBus::new()),
        Signer::new(key),
    ))
}
