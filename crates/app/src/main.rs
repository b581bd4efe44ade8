use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use course_core::model::{ContentSection, CourseSlug, ModuleSlug, ReflectionAnswers};
use course_core::{CourseOverview, UnlockState};
use services::{
    ApiConfig, AppConfig, AppServices, AuthToken, Clock, CourseProgress, Freshness, NextStep,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "course-progress")]
#[command(about = "Browse courses and track module progress", long_about = None)]
struct Cli {
    /// Keep progress in a local SQLite file instead of the remote API
    #[arg(long, global = true)]
    offline: bool,

    /// Base URL of the course API (overrides COURSE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API token (overrides COURSE_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// SQLite URL for offline progress (overrides COURSE_DB_URL)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Catalog JSON file for offline mode (overrides COURSE_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available courses
    Courses,
    /// Show a course with the lock state of each module
    Course {
        /// Course slug
        course: String,
    },
    /// Open a module and print its content
    Module { course: String, module: String },
    /// Complete a module; pass one --answer per reflection question, in order
    Complete {
        course: String,
        module: String,
        #[arg(long = "answer")]
        answers: Vec<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api = ApiConfig::new(url, config.api.timeout)?;
    }
    if let Some(token) = &cli.token {
        config.token = AuthToken::new(token.as_str());
    }
    if let Some(db) = &cli.db {
        config.db_url.clone_from(db);
    }
    if let Some(path) = &cli.catalog {
        config.catalog_path = Some(path.clone());
    }
    config.db_url = normalize_sqlite_url(&config.db_url);
    Ok(config)
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// SQLite refuses to open a missing file without `mode=rwc`; create it up front.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

fn badge(state: UnlockState) -> &'static str {
    match state {
        UnlockState::Completed => "[x]",
        UnlockState::Unlocked => "[ ]",
        UnlockState::Locked => "[locked]",
    }
}

fn print_overview(progress: &CourseProgress) {
    let course = &progress.course;
    let overview: &CourseOverview = &progress.overview;
    println!("{} {}", course.icon(), course.title());
    if !course.description().is_empty() {
        println!("  {}", course.description());
    }
    println!(
        "  {}/{} modules, {}%",
        overview.completed_count(),
        overview.total(),
        overview.completion_percentage()
    );
    match progress.freshness {
        Freshness::Live => {}
        Freshness::Cached => println!("  (progress service unreachable, showing last known state)"),
        Freshness::Unknown => println!("  (progress unavailable)"),
        Freshness::Anonymous => println!("  (sign in to track your progress)"),
    }
    println!();

    for (summary, status) in course.modules().iter().zip(overview.statuses()) {
        println!(
            "  {:>8} {}. {} ({})",
            badge(status.state()),
            status.index + 1,
            summary.title(),
            summary.slug()
        );
    }
    if let Some(next) = overview.resume_module() {
        println!("\nContinue with: {next}");
    } else if overview.is_finished() {
        println!("\nCourse complete.");
    }
}

fn print_section(section: &ContentSection) {
    match section {
        ContentSection::Plain(text) => println!("{text}\n"),
        ContentSection::Structured {
            title,
            description,
            points,
            examples,
        } => {
            println!("## {title}");
            if let Some(description) = description {
                println!("{description}");
            }
            for point in points {
                println!("  - {point}");
            }
            for example in examples {
                println!("  e.g. {example}");
            }
            println!();
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let clock = Clock::default();
    let app = if cli.offline {
        prepare_sqlite_file(&config.db_url)?;
        AppServices::offline(&config, clock).await?
    } else {
        AppServices::remote(&config, clock)?
    };
    debug!(authenticated = app.auth().is_authenticated(), "services ready");

    match cli.command {
        Commands::Courses => {
            let courses = app.catalog().list_courses().await?;
            println!("Courses ({})", courses.len());
            for course in courses {
                println!(
                    "  {} {} - {} ({} modules)",
                    course.icon, course.slug, course.title, course.module_count
                );
            }
        }
        Commands::Course { course } => {
            let course = CourseSlug::new(course)?;
            let progress = app.progress().course_overview(&course).await?;
            print_overview(&progress);
        }
        Commands::Module { course, module } => {
            let course = CourseSlug::new(course)?;
            let module = ModuleSlug::new(module)?;
            let view = app.progress().open_module(&course, &module).await?;
            let summary = view.detail.summary();

            println!("# {} [{}]", summary.title(), view.status.state().as_str());
            if !summary.objective().is_empty() {
                println!("Objective: {}\n", summary.objective());
            }
            for section in view.detail.sections() {
                print_section(section);
            }
            if !view.detail.prompts().is_empty() {
                println!("Reflection:");
                for prompt in view.detail.prompts() {
                    println!("  {}. {}", prompt.index() + 1, prompt.question());
                }
            }
            if let Some(task) = summary.capstone_task() {
                println!("\nCapstone: {task}");
            }
        }
        Commands::Complete {
            course,
            module,
            answers,
        } => {
            let course = CourseSlug::new(course)?;
            let module = ModuleSlug::new(module)?;
            let answers: ReflectionAnswers = answers.into_iter().collect();
            let outcome = app
                .progress()
                .complete_module(&course, &module, answers)
                .await?;

            println!(
                "Completed {module} ({}% of course)",
                outcome.overview.completion_percentage()
            );
            match outcome.next {
                NextStep::Module(next) => println!("Next up: {next}"),
                NextStep::CourseFinished => println!("Course finished."),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
