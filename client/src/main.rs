use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use plotter_client::api::ApiClient;
use plotter_client::config::ClientConfig;
use plotter_client::controller::{Controller, Notification};
use plotter_client::session::{self, SessionStore};
use plotter_shared::interest::tooltip;
use plotter_shared::{AssignmentUpload, DisplayMode, PlotId, priority_color};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plotter")]
#[command(about = "Rank housing plots and manage community plot assignments", long_about = None)]
struct Cli {
    /// Backend base URL (overrides PLOTTER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// File holding the session token (overrides PLOTTER_SESSION_FILE)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a session token and remember it
    Login { token: String },
    /// Forget the stored session token
    Logout,
    /// Show your ranking, the current overlay, and who wants a plot
    Show {
        /// Only show interest for this plot
        #[arg(long)]
        plot: Option<u32>,
    },
    /// Toggle plots in or out of your ranking, then sync
    Select {
        #[arg(required = true)]
        plots: Vec<u32>,
    },
    /// Give a plot an exact priority, then sync
    Set {
        plot: u32,
        priority: u32,
        /// Unrank the plot currently holding that priority without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove plots from your ranking, then sync
    Deselect {
        #[arg(required = true)]
        plots: Vec<u32>,
    },
    /// Drop your whole ranking, then sync
    Clear,
    /// Show the optimizer's proposal without committing it (admin)
    Preview,
    /// Lock or unlock the community (admin)
    Lock,
    /// Assign a plot to a member by hand (admin, locked community)
    Overwrite {
        plot: u32,
        /// Battletag, optionally followed by the character name
        #[arg(required = true, num_args = 1..)]
        occupant: Vec<String>,
    },
    /// Make the locked assignments permanent (admin)
    Finalize,
    /// Read or change the community guidelines (admin)
    Config {
        #[arg(long)]
        officer_rank: Option<u32>,
        #[arg(long)]
        member_rank: Option<u32>,
    },
    /// Download the full community data as JSON (admin)
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all assignments from an exported JSON file (admin, locked community)
    Upload { file: PathBuf },
    /// Join a community by its ID
    Join { community_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    let api = ApiClient::new(&config).context("failed to build HTTP client")?;
    let store = SessionStore::new(config.session_file.clone());
    tracing::debug!(api_url = %config.api_url, "using backend");

    match cli.command {
        Command::Login { token } => {
            let session = session::login(&api, &store, &token).await?;
            let community = &session.user().community;
            if community.is_joined() {
                println!(
                    "Logged in as {} ({} on {}).",
                    session.battletag(),
                    community.name,
                    community.realm
                );
            } else {
                println!(
                    "Logged in as {}. Join a community with `plotter join <id>`.",
                    session.battletag()
                );
            }
        }
        Command::Logout => match session::init(&api, &store).await {
            Ok(session) => {
                session::logout(session, &store)?;
                println!("Logged out.");
            }
            Err(e) => {
                tracing::debug!(error = %e, "no valid session to end");
                store.clear()?;
                println!("Logged out.");
            }
        },
        Command::Join { community_id } => {
            let session = session::init(&api, &store).await?;
            api.join(&session, &community_id).await?;
            println!("Joined community {}.", community_id.trim());
        }
        command => {
            let session = session::init(&api, &store).await?;
            let controller = Controller::load(api, store, session).await?;
            run(controller, command).await?;
        }
    }

    Ok(())
}

async fn run(mut controller: Controller, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show { plot } => show(&controller, plot)?,
        Command::Select { plots } => {
            for plot in plots {
                let outcome = controller.click(plot)?;
                tracing::debug!(?outcome, "plot toggled");
            }
            report(controller.sync().await)?;
        }
        Command::Set {
            plot,
            priority,
            yes,
        } => {
            let check = controller.check_priority(plot, priority)?;
            if check.needs_confirmation() && !yes {
                bail!("{check}. Re-run with --yes to confirm.");
            }
            controller.set_priority(plot, priority)?;
            report(controller.sync().await)?;
        }
        Command::Deselect { plots } => {
            for plot in plots {
                controller.deselect(plot)?;
            }
            report(controller.sync().await)?;
        }
        Command::Clear => {
            let removed = controller.clear()?;
            tracing::info!(removed, "ranking cleared");
            report(controller.sync().await)?;
        }
        Command::Preview => {
            report(controller.preview().await)?;
            print_overlay(&controller);
        }
        Command::Lock => {
            report(controller.toggle_lock().await)?;
            print_overlay(&controller);
        }
        Command::Overwrite { plot, occupant } => {
            report(controller.overwrite(plot, &occupant.join(" ")).await)?;
        }
        Command::Finalize => report(controller.finalize().await)?,
        Command::Config {
            officer_rank,
            member_rank,
        } => {
            let mut settings = controller.settings().await.map_err(anyhow::Error::msg)?;
            if officer_rank.is_none() && member_rank.is_none() {
                println!("officer rank: {}", settings.officer_rank);
                println!("member rank:  {}", settings.member_rank);
                return Ok(());
            }
            if let Some(rank) = officer_rank {
                settings.officer_rank = rank;
            }
            if let Some(rank) = member_rank {
                settings.member_rank = rank;
            }
            report(controller.update_settings(settings).await)?;
        }
        Command::Export { output } => {
            let document = controller.export().await.map_err(anyhow::Error::msg)?;
            let text = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Community data written to {}.", path.display());
                }
                None => println!("{text}"),
            }
        }
        Command::Upload { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let upload: AssignmentUpload = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not an assignment export", file.display()))?;
            report(controller.upload(&upload).await)?;
            print_overlay(&controller);
        }
        Command::Login { .. } | Command::Logout | Command::Join { .. } => {}
    }
    Ok(())
}

fn report(notification: Notification) -> anyhow::Result<()> {
    if notification.is_error() {
        bail!("{notification}");
    }
    println!("{notification}");
    Ok(())
}

fn show(controller: &Controller, plot: Option<u32>) -> anyhow::Result<()> {
    let index = controller.interest_index();
    if let Some(plot) = plot {
        let plot = PlotId::new(plot)?;
        println!("{}", tooltip(&index, plot));
        if let Some(assigned) = controller.reconciler().assignment_for_plot(plot) {
            println!("assigned to {}", assigned.display_name());
        }
        return Ok(());
    }

    if let Some(session) = controller.session() {
        let community = &session.user().community;
        println!(
            "{} in {} [{}], mode: {}",
            session.battletag(),
            community.name,
            community.realm,
            mode_label(controller.mode())
        );
    }

    match controller.own_plot_data() {
        Some(plot_data) if !plot_data.is_empty() => {
            println!("Your ranking:");
            for (plot, priority) in plot_data.ranked() {
                let (r, g, b) = priority_color(priority.get());
                println!(
                    "  \x1b[38;2;{r};{g};{b}m\u{25a0}\x1b[0m {:>2}. plot {plot}",
                    priority.get()
                );
            }
        }
        _ => println!("You have not ranked any plots yet."),
    }

    print_overlay(controller);

    let contested: Vec<String> = index
        .keys()
        .map(|plot| tooltip(&index, *plot))
        .collect();
    if !contested.is_empty() {
        println!("Interest:");
        for line in contested {
            println!("  {line}");
        }
    }
    Ok(())
}

fn print_overlay(controller: &Controller) {
    let overlay = controller.overlay();
    if overlay.is_empty() {
        return;
    }
    println!("Assignments ({}):", mode_label(controller.mode()));
    for assignment in overlay {
        let (r, g, b) = priority_color(assignment.score);
        let note = if assignment.is_manual() {
            " (set by admin)"
        } else if assignment.is_unranked() {
            " (unranked)"
        } else {
            ""
        };
        println!(
            "  \x1b[38;2;{r};{g};{b}m\u{25a0}\x1b[0m plot {} -> {}{note}",
            assignment.plot,
            assignment.display_name()
        );
    }
}

fn mode_label(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::OwnPreferences => "own preferences",
        DisplayMode::Preview => "preview",
        DisplayMode::Locked => "locked",
    }
}
