use std::fmt;

use chrono::{DateTime, Utc};
use course_core::model::{Lesson, LessonId, Module, ModuleId, VideoUrl};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

        Ok(Self { db_url, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DB_URL");
}

const SAMPLE_VIDEO: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

const MODULES: [(&str, &str, &str); 4] = [
    (
        "Programming Fundamentals",
        "Learn the basic concepts of programming",
        "https://images.unsplash.com/photo-1498050108023-c5249f4df085?w=500",
    ),
    (
        "Web Development",
        "HTML, CSS, JavaScript and modern frameworks",
        "https://images.unsplash.com/photo-1547658719-da2b51169166?w=500",
    ),
    (
        "Databases",
        "SQL, schema design and query tuning",
        "https://images.unsplash.com/photo-1544383835-bda2bc66a55d?w=500",
    ),
    (
        "DevOps and Deploy",
        "Git, CI/CD and application deployment",
        "https://images.unsplash.com/photo-1618477388954-7852f32655ec?w=500",
    ),
];

const LESSONS: [(&str, u32); 3] = [
    ("Module Introduction", 480),
    ("Core Concepts", 720),
    ("Hands-on Practice", 900),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let video = VideoUrl::parse(SAMPLE_VIDEO)?;

    let mut lesson_count = 0_u32;
    for (module_idx, (title, description, image_url)) in MODULES.iter().enumerate() {
        let module_id = ModuleId::new(module_idx as u64 + 1);
        let module = Module::new(
            module_id,
            *title,
            Some((*description).to_owned()),
            Some((*image_url).to_owned()),
            None,
            module_idx as u32 + 1,
            true,
            now,
        )?;
        storage.modules.upsert_module(&module).await?;

        for (lesson_idx, (lesson_title, duration)) in LESSONS.iter().enumerate() {
            let lesson_id =
                LessonId::new((module_idx * LESSONS.len() + lesson_idx) as u64 + 1);
            let lesson = Lesson::new(
                lesson_id,
                module_id,
                *lesson_title,
                Some(format!("{lesson_title} for {title}")),
                Some(video.clone()),
                Some(*duration),
                lesson_idx as u32 + 1,
                true,
                now,
            )?;
            storage.lessons.upsert_lesson(&lesson).await?;
            lesson_count += 1;
        }
    }

    println!(
        "Seeded {} modules with {} lessons into {}",
        MODULES.len(),
        lesson_count,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
