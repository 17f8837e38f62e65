use std::fmt;

use chrono::{DateTime, Utc};
use course_core::model::{CourseLevel, CourseStatus, LessonContent, slugify};
use storage::repository::{NewCourseRecord, NewLessonRecord, NewModuleRecord, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    title: String,
    modules: u32,
    lessons_per_module: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidModules { raw: String },
    InvalidLessons { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidModules { raw } => write!(f, "invalid --modules value: {raw}"),
            ArgsError::InvalidLessons { raw } => {
                write!(f, "invalid --lessons-per-module value: {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut title =
            std::env::var("COURSE_TITLE").unwrap_or_else(|_| "Rust for Beginners".into());
        let mut modules = std::env::var("COURSE_MODULES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);
        let mut lessons_per_module = std::env::var("COURSE_LESSONS_PER_MODULE")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--title" => {
                    title = require_value(&mut args, "--title")?;
                }
                "--modules" => {
                    let value = require_value(&mut args, "--modules")?;
                    modules = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidModules { raw: value.clone() })?;
                }
                "--lessons-per-module" => {
                    let value = require_value(&mut args, "--lessons-per-module")?;
                    lessons_per_module = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            title,
            modules,
            lessons_per_module,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>           SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --title <name>              Course title (default: Rust for Beginners)");
    eprintln!("  --modules <n>               Number of modules to create (default: 2)");
    eprintln!("  --lessons-per-module <n>    Lessons per module (default: 3)");
    eprintln!("  --now <rfc3339>             Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                  Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DB_URL, COURSE_TITLE, COURSE_MODULES, COURSE_LESSONS_PER_MODULE");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let slug = slugify(&args.title);
    let course_id = match storage.catalog.get_course_by_slug(&slug).await? {
        Some(course) => course.id(),
        None => {
            storage
                .catalog
                .insert_course(NewCourseRecord {
                    title: args.title.clone(),
                    slug,
                    description: Some("Seeded demo course".into()),
                    level: CourseLevel::Beginner,
                    status: CourseStatus::Published,
                    created_at: now,
                })
                .await?
        }
    };

    let mut lesson_total = 0;
    for m in 1..=args.modules {
        let module_id = storage
            .catalog
            .insert_module(NewModuleRecord {
                course_id,
                title: format!("Module {m}"),
                description: None,
                order: m,
            })
            .await?;

        for l in 1..=args.lessons_per_module {
            let content = if l % 2 == 0 {
                LessonContent::Article {
                    body: format!("Reading material for lesson {l} of module {m}."),
                }
            } else {
                LessonContent::Video {
                    url: format!("https://videos.example.com/m{m}/l{l}.mp4"),
                }
            };
            storage
                .catalog
                .insert_lesson(NewLessonRecord {
                    module_id,
                    title: format!("Lesson {m}.{l}"),
                    content,
                    duration_minutes: 5 + l * 5,
                    order: l,
                    free_preview: m == 1 && l == 1,
                })
                .await?;
            lesson_total += 1;
        }
    }

    tracing::info!(
        course_id = %course_id,
        modules = args.modules,
        lessons = lesson_total,
        db = %args.db_url,
        "seeded demo course"
    );
    println!(
        "Seeded course {} with {} modules and {} lessons into {}",
        course_id, args.modules, lesson_total, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
