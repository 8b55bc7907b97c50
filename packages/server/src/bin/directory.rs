//! Directory pipeline CLI
//!
//! Operator entry point for sourcing, enrichment, review and approval.
//! Batch commands stop cleanly between items on Ctrl+C.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use directory_core::common::{EntryId, SubmissionId};
use directory_core::config::Config;
use directory_core::domains::directory::models::Category;
use directory_core::domains::enrichment::activities::{
    enrich_entries, enrich_submissions, SubmissionEnrichment,
};
use directory_core::domains::review::activities::{
    review_entry, review_submissions, ReviewedSubmission,
};
use directory_core::domains::review::models::ReviewDecision;
use directory_core::domains::sourcing::activities::{run_all, RunOptions};
use directory_core::domains::sourcing::models::SourcingRun;
use directory_core::domains::sourcing::sources::queries::QuerySet;
use directory_core::domains::sourcing::sources::{SerpSource, SourcePlugin, UrlListSource};
use directory_core::domains::submissions::activities::{
    approve_submission, approve_submissions, cleanup_submissions, reject_submission,
    reject_submissions, reopen_submission, submit_form, ApprovalOutcome, BatchApproval,
    CleanupAction, CleanupOptions, SubmissionForm,
};
use directory_core::kernel::ServerDeps;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CLI_ACTOR: &str = "cli";

#[derive(Parser)]
#[command(name = "directory")]
#[command(about = "Agent directory submission pipeline")]
struct Cli {
    /// Reviewer name recorded on approvals and rejections
    #[arg(long, global = true, default_value = CLI_ACTOR)]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations and seed the default categories
    Migrate,

    /// List directory categories
    Categories,

    /// Create a pending submission as if sent through the public form
    Submit {
        name: String,
        website: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Discover candidates and create pending submissions
    Source {
        /// basic, trending, all, daily or category:<name>
        #[arg(long, default_value = "daily")]
        queries: String,
        /// Search time window, e.g. qdr:w
        #[arg(long)]
        tbs: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Use search results directly instead of extracting listed products
        #[arg(long)]
        direct: bool,
        /// Explicit product URLs; skips web search
        #[arg(long, num_args = 1..)]
        urls: Vec<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Enrich new submissions after the run
        #[arg(long)]
        auto_enrich: bool,
    },

    /// Scrape and store enrichment data for submissions
    Enrich {
        ids: Vec<SubmissionId>,
        #[arg(long)]
        limit: Option<i64>,
        /// Re-enrich submissions that already have data
        #[arg(long)]
        force: bool,
    },

    /// Re-scrape published entries and fill selected fields
    EnrichEntries {
        ids: Vec<EntryId>,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Run AI review on enriched submissions
    Review {
        ids: Vec<SubmissionId>,
        #[arg(long)]
        limit: Option<i64>,
        /// Apply confident decisions immediately
        #[arg(long)]
        auto: bool,
        /// Re-review submissions that already have a result
        #[arg(long)]
        force: bool,
    },

    /// Review a published entry (report only)
    ReviewEntry { id: EntryId },

    /// Approve submissions; without ids, every AI-approved pending one
    Approve {
        ids: Vec<SubmissionId>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Reject submissions; without ids, every AI-rejected pending one
    Reject {
        ids: Vec<SubmissionId>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Move a rejected submission back to pending
    Reopen {
        id: SubmissionId,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Reject blocked URLs and resolve aggregator links in pending submissions
    Cleanup {
        #[arg(long)]
        dry_run: bool,
        #[arg(long, conflicts_with = "extract_only")]
        reject_only: bool,
        #[arg(long)]
        extract_only: bool,
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,directory_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let deps = ServerDeps::from_config(&config, pool.clone())?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        eprintln!("{}", "Stopping after the current item...".yellow());
        on_signal.cancel();
    });

    run(cli, &pool, &deps, &cancel).await
}

async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    let seeded = Category::seed_defaults(pool).await?;
    println!("{} ({} categories added)", "Migrations applied".green(), seeded);
    Ok(())
}

fn ids_or_all<T>(ids: Vec<T>) -> Option<Vec<T>> {
    (!ids.is_empty()).then_some(ids)
}

async fn run(
    cli: Cli,
    pool: &PgPool,
    deps: &ServerDeps,
    cancel: &CancellationToken,
) -> Result<()> {
    let actor = cli.actor.as_str();

    match cli.command {
        Commands::Migrate => migrate(pool).await?,

        Commands::Categories => {
            for category in Category::find_all(pool).await? {
                println!("{:>3}  {} {}", category.sort_order, category.name, category.slug.dimmed());
            }
        }

        Commands::Submit {
            name,
            website,
            description,
            email,
        } => {
            let submission = submit_form(
                SubmissionForm {
                    name,
                    website,
                    description,
                    email,
                },
                deps,
            )
            .await?;
            println!(
                "{} {} ({})",
                "Submitted".green(),
                submission.name.bold(),
                submission.id
            );
        }

        Commands::Source {
            queries,
            tbs,
            location,
            direct,
            urls,
            limit,
            auto_enrich,
        } => {
            let source: Box<dyn SourcePlugin> = if urls.is_empty() {
                let query_set: QuerySet = queries.parse()?;
                Box::new(
                    SerpSource::builder()
                        .searcher(deps.searcher.clone())
                        .queries(query_set.queries())
                        .extract_agents(!direct)
                        .tbs(tbs)
                        .location(location)
                        .timeout(deps.settings.scrape_timeout)
                        .retry(deps.settings.retry)
                        .build(),
                )
            } else {
                Box::new(UrlListSource::new(urls))
            };

            let options = RunOptions { limit, auto_enrich };
            let runs = run_all(&[source], options, Some(actor), cancel, deps).await?;
            for run in &runs {
                print_run(run);
            }
        }

        Commands::Enrich { ids, limit, force } => {
            let result = enrich_submissions(ids_or_all(ids), limit, force, cancel, deps).await?;
            for item in &result.items {
                match item {
                    SubmissionEnrichment::Enriched(s) => {
                        println!("{} {} ({})", "✓".green(), s.name, s.website)
                    }
                    SubmissionEnrichment::Failed(s) => {
                        let reason = s
                            .enrichment_data
                            .as_ref()
                            .and_then(|d| d.error.clone())
                            .unwrap_or_default();
                        println!("{} {} {}", "✗".red(), s.name, reason.dimmed())
                    }
                    SubmissionEnrichment::Skipped(s) => {
                        println!("{} {} already enriched", "-".dimmed(), s.name)
                    }
                    SubmissionEnrichment::Error { id, message } => {
                        println!("{} {} {}", "✗".red(), id, message.red())
                    }
                }
            }
            print_cancelled(result.cancelled);
        }

        Commands::EnrichEntries { ids, fields } => {
            let fields = (!fields.is_empty()).then_some(fields);
            let logs =
                enrich_entries(ids_or_all(ids), fields.as_deref(), Some(actor), cancel, deps)
                    .await?;
            for log in &logs {
                if log.success {
                    println!(
                        "{} {} updated: {}",
                        "✓".green(),
                        log.entry_id,
                        if log.applied_fields.is_empty() {
                            "nothing".to_string()
                        } else {
                            log.applied_fields.join(", ")
                        }
                    );
                } else {
                    println!(
                        "{} {} {}",
                        "✗".red(),
                        log.entry_id,
                        log.error_message.as_deref().unwrap_or_default().red()
                    );
                }
            }
        }

        Commands::Review {
            ids,
            limit,
            auto,
            force,
        } => {
            let result =
                review_submissions(ids_or_all(ids), limit, auto, force, cancel, deps).await?;
            for item in &result.items {
                match item {
                    ReviewedSubmission::Reviewed(s) => {
                        if let Some(review) = &s.ai_review_result {
                            println!(
                                "{} {} {:.0}% [{}] {}",
                                decision_label(review.decision),
                                s.name.bold(),
                                review.confidence * 100.0,
                                s.status,
                                review.reasoning.dimmed()
                            );
                        }
                    }
                    ReviewedSubmission::Skipped { name, .. } => {
                        println!("{} {} not enriched", "-".dimmed(), name)
                    }
                    ReviewedSubmission::Error { name, message, .. } => {
                        println!("{} {} {}", "✗".red(), name, message.red())
                    }
                }
            }
            println!(
                "approved {} / rejected {} / needs review {} / errors {}",
                result.count(ReviewDecision::Approved),
                result.count(ReviewDecision::Rejected),
                result.count(ReviewDecision::NeedsReview),
                result.errors()
            );
            print_cancelled(result.cancelled);
        }

        Commands::ReviewEntry { id } => {
            let review = review_entry(id, deps).await?;
            println!(
                "{} {:.0}% {}",
                decision_label(review.decision),
                review.confidence * 100.0,
                review.reasoning
            );
            for flag in &review.flags {
                println!("  {} {}", "!".yellow(), flag);
            }
        }

        Commands::Approve { ids, notes, limit } => {
            if let [id] = ids.as_slice() {
                match approve_submission(*id, actor, notes, deps).await? {
                    ApprovalOutcome::Approved(entry) => {
                        println!("{} {} published as /{}", "✓".green(), entry.name.bold(), entry.slug)
                    }
                    ApprovalOutcome::Conflict(conflict) => {
                        println!("{} {}", "Duplicate:".yellow(), conflict)
                    }
                }
                return Ok(());
            }

            let result = approve_submissions(ids_or_all(ids), limit, actor, cancel, deps).await?;
            for item in &result.items {
                match item {
                    BatchApproval::Approved { entry, .. } => {
                        println!("{} {}", "✓".green(), entry.name)
                    }
                    BatchApproval::AutoRejected { id, conflict } => {
                        println!("{} {} {}", "✗".yellow(), id, conflict)
                    }
                    BatchApproval::Error { id, message } => {
                        println!("{} {} {}", "✗".red(), id, message.red())
                    }
                }
            }
            print_cancelled(result.cancelled);
        }

        Commands::Reject { ids, notes, limit } => {
            if let [id] = ids.as_slice() {
                let submission = reject_submission(*id, actor, notes, deps).await?;
                println!("{} {}", "Rejected".red(), submission.name);
                return Ok(());
            }

            let result =
                reject_submissions(ids_or_all(ids), limit, actor, notes, cancel, deps).await?;
            for submission in &result.rejected {
                println!("{} {}", "✗".red(), submission.name);
            }
            for (id, message) in &result.errors {
                println!("{} {} {}", "!".yellow(), id, message);
            }
            print_cancelled(result.cancelled);
        }

        Commands::Reopen { id, notes } => {
            let submission = reopen_submission(id, actor, notes, deps).await?;
            println!("{} {} is pending again", "✓".green(), submission.name);
        }

        Commands::Cleanup {
            dry_run,
            reject_only,
            extract_only,
            limit,
        } => {
            let options = CleanupOptions {
                dry_run,
                reject_only,
                extract_only,
                limit,
            };
            let report = cleanup_submissions(options, actor, cancel, deps).await?;
            for item in &report.items {
                let line = match &item.action {
                    CleanupAction::Rejected { reason } => format!("{} {}", "reject".red(), reason),
                    CleanupAction::Extracted { to: Some(url) } => {
                        format!("{} -> {}", "extract".cyan(), url)
                    }
                    CleanupAction::Extracted { to: None } => "extract".cyan().to_string(),
                    CleanupAction::Flagged { classification } => {
                        format!("{} {}", "flag".yellow(), classification)
                    }
                    CleanupAction::Skipped => continue,
                    CleanupAction::Error { message } => format!("{} {}", "error".red(), message),
                };
                println!("{} ({}) {}", item.name, item.website.dimmed(), line);
            }
            println!(
                "{}rejected {} / extracted {} / flagged {} / errors {}",
                if report.dry_run { "[dry run] " } else { "" },
                report.rejected(),
                report.extracted(),
                report.flagged(),
                report.errors()
            );
            print_cancelled(report.cancelled);
        }
    }

    Ok(())
}

fn decision_label(decision: ReviewDecision) -> colored::ColoredString {
    match decision {
        ReviewDecision::Approved => decision.to_string().green(),
        ReviewDecision::Rejected => decision.to_string().red(),
        ReviewDecision::NeedsReview => decision.to_string().yellow(),
    }
}

fn print_run(run: &SourcingRun) {
    let status = if run.success {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{} {} discovered {} / new {} / blocked {} / duplicates {}",
        status,
        run.source_id.bold(),
        run.discovered_count,
        run.new_count,
        run.blocked_count,
        run.duplicate_count
    );
    if let Some(error) = &run.error_message {
        println!("  {}", error.red());
    }
}

fn print_cancelled(cancelled: bool) {
    if cancelled {
        println!("{}", "Cancelled before all items were processed".yellow());
    }
}
