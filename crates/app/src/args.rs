use std::fmt;
use std::path::{Path, PathBuf};

use lesson_core::Locale;

pub const DEFAULT_DB_URL: &str = "sqlite://playground.sqlite3";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingSlug { command: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLocale { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSlug { command } => write!(f, "{command} requires a lesson slug"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLocale { raw } => write!(f, "invalid --locale value: {raw}"),
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lessons { search: String },
    Show { slug: String },
    Complete { slug: String },
    Toggle { slug: String },
    Reset,
    Progress,
    Speak { slug: String },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Lessons { .. } => "lessons",
            Command::Show { .. } => "show",
            Command::Complete { .. } => "complete",
            Command::Toggle { .. } => "toggle",
            Command::Reset => "reset",
            Command::Progress => "progress",
            Command::Speak { .. } => "speak",
        }
    }

    fn takes_slug(&self) -> bool {
        matches!(
            self,
            Command::Show { .. }
                | Command::Complete { .. }
                | Command::Toggle { .. }
                | Command::Speak { .. }
        )
    }

    fn slug_mut(&mut self) -> Option<&mut String> {
        match self {
            Command::Show { slug }
            | Command::Complete { slug }
            | Command::Toggle { slug }
            | Command::Speak { slug } => Some(slug),
            _ => None,
        }
    }

    fn from_arg(arg: &str) -> Option<Self> {
        let slug = String::new();
        match arg {
            "lessons" => Some(Self::Lessons {
                search: String::new(),
            }),
            "show" => Some(Self::Show { slug }),
            "complete" => Some(Self::Complete { slug }),
            "toggle" => Some(Self::Toggle { slug }),
            "reset" => Some(Self::Reset),
            "progress" => Some(Self::Progress),
            "speak" => Some(Self::Speak { slug }),
            _ => None,
        }
    }
}

/// Where progress is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite(String),
    Memory,
}

impl Backend {
    /// Backend for a configured database URL or bare path.
    ///
    /// `SQLite` in-memory URLs select [`Backend::Memory`]; such a database
    /// would be gone when the command exits anyway. Other values become an
    /// absolute `sqlite://` URL.
    #[must_use]
    pub fn from_db_url(raw: &str) -> Self {
        let raw = raw.trim();
        if matches!(raw, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
            return Self::Memory;
        }
        if raw.starts_with("sqlite://") {
            return Self::Sqlite(raw.to_owned());
        }
        let path = PathBuf::from(raw.strip_prefix("sqlite:").unwrap_or(raw));
        let absolute = std::path::absolute(&path).unwrap_or(path);
        Self::Sqlite(format!("sqlite://{}", absolute.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub backend: Backend,
    pub locale: Locale,
}

impl Args {
    /// Parse the command line. `env` looks up environment variables.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut args = args.into_iter();
        let first = args.next().ok_or(ArgsError::MissingCommand)?;
        let mut command =
            Command::from_arg(&first).ok_or_else(|| ArgsError::UnknownCommand(first.clone()))?;

        let mut backend =
            Backend::from_db_url(env("PLAYGROUND_DB_URL").as_deref().unwrap_or(DEFAULT_DB_URL));
        let mut locale = Locale::resolve(env("PLAYGROUND_LOCALE").as_deref());
        let mut slug_seen = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    backend = Backend::from_db_url(&value);
                }
                "--memory" => backend = Backend::Memory,
                "--locale" => {
                    let value = require_value(&mut args, "--locale")?;
                    locale = Locale::parse(&value)
                        .ok_or(ArgsError::InvalidLocale { raw: value })?;
                }
                "--search" => {
                    let value = require_value(&mut args, "--search")?;
                    match &mut command {
                        Command::Lessons { search } => *search = value,
                        _ => return Err(ArgsError::UnknownArg(arg)),
                    }
                }
                _ if !arg.starts_with("--") && !slug_seen && command.takes_slug() => {
                    if let Some(slug) = command.slug_mut() {
                        *slug = arg;
                    }
                    slug_seen = true;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command.takes_slug() && !slug_seen {
            return Err(ArgsError::MissingSlug {
                command: command.name(),
            });
        }

        Ok(Self {
            command,
            backend,
            locale,
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app lessons  [--search <query>]");
    eprintln!("  app show     <slug>");
    eprintln!("  app complete <slug>");
    eprintln!("  app toggle   <slug>");
    eprintln!("  app reset");
    eprintln!("  app progress");
    eprintln!("  app speak    <slug>");
    eprintln!();
    eprintln!("Options (any command):");
    eprintln!("  --db <sqlite_url>   default {DEFAULT_DB_URL}");
    eprintln!("  --memory            keep progress for this run only");
    eprintln!("  --locale <th|en>    default th");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PLAYGROUND_DB_URL, PLAYGROUND_LOCALE, PLAYGROUND_SITE_URL, PLAYGROUND_VOICES");
    eprintln!("  RUST_LOG");
}

/// The file behind a `sqlite://` URL, without query parameters.
fn sqlite_file_path(db_url: &str) -> Result<&Path, ArgsError> {
    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_owned(),
    };
    let rest = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        return Err(invalid());
    }
    Ok(Path::new(path))
}

/// Create the database file and its directory so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = sqlite_file_path(db_url)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    // append never truncates an existing database
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(argv.iter().map(|s| (*s).to_owned()), |_| None)
    }

    #[test]
    fn defaults() {
        let args = parse(&["progress"]).unwrap();
        assert_eq!(args.command, Command::Progress);
        assert_eq!(args.backend, Backend::Sqlite(DEFAULT_DB_URL.to_owned()));
        assert_eq!(args.locale, Locale::Th);
    }

    #[test]
    fn slug_and_flags_in_any_order() {
        let args = parse(&["--memory", "--locale", "en"]);
        assert_eq!(args, Err(ArgsError::UnknownCommand("--memory".to_owned())));

        let args = parse(&["toggle", "--memory", "props", "--locale", "en"]).unwrap();
        assert_eq!(
            args.command,
            Command::Toggle {
                slug: "props".to_owned()
            }
        );
        assert_eq!(args.backend, Backend::Memory);
        assert_eq!(args.locale, Locale::En);
    }

    #[test]
    fn search_only_for_lessons() {
        let args = parse(&["lessons", "--search", "props"]).unwrap();
        assert_eq!(
            args.command,
            Command::Lessons {
                search: "props".to_owned()
            }
        );
        assert_eq!(
            parse(&["progress", "--search", "x"]),
            Err(ArgsError::UnknownArg("--search".to_owned()))
        );
    }

    #[test]
    fn slug_commands_need_a_slug() {
        assert_eq!(
            parse(&["show"]),
            Err(ArgsError::MissingSlug { command: "show" })
        );
        assert_eq!(
            parse(&["show", "jsx", "props"]),
            Err(ArgsError::UnknownArg("props".to_owned()))
        );
        assert_eq!(
            parse(&["reset", "jsx"]),
            Err(ArgsError::UnknownArg("jsx".to_owned()))
        );
    }

    #[test]
    fn bad_values() {
        assert_eq!(parse(&[]), Err(ArgsError::MissingCommand));
        assert_eq!(
            parse(&["progress", "--locale", "fr"]),
            Err(ArgsError::InvalidLocale {
                raw: "fr".to_owned()
            })
        );
        assert_eq!(
            parse(&["progress", "--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        );
    }

    #[test]
    fn environment_supplies_defaults() {
        let args = Args::parse(["progress".to_owned()], |key| match key {
            "PLAYGROUND_DB_URL" => Some("sqlite:///tmp/p.sqlite3".to_owned()),
            "PLAYGROUND_LOCALE" => Some("fr".to_owned()),
            _ => None,
        })
        .unwrap();
        assert_eq!(args.backend, Backend::Sqlite("sqlite:///tmp/p.sqlite3".to_owned()));
        // unknown locale in the environment falls back instead of failing
        assert_eq!(args.locale, Locale::Th);
    }

    #[test]
    fn relative_paths_become_absolute() {
        let Backend::Sqlite(url) = Backend::from_db_url("sqlite:data/p.sqlite3") else {
            panic!("expected a sqlite backend");
        };
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/p.sqlite3"));
    }

    #[test]
    fn memory_urls_select_the_memory_backend() {
        for raw in [":memory:", "sqlite::memory:", " sqlite://:memory: "] {
            assert_eq!(Backend::from_db_url(raw), Backend::Memory, "{raw}");
        }
        let args = parse(&["progress", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.backend, Backend::Memory);
    }

    #[test]
    fn file_path_ignores_query() {
        assert_eq!(
            sqlite_file_path("sqlite:///tmp/p.sqlite3?mode=rwc").unwrap(),
            Path::new("/tmp/p.sqlite3")
        );
        assert!(sqlite_file_path("postgres://db").is_err());
        assert!(sqlite_file_path("sqlite://?mode=rwc").is_err());
    }

    #[test]
    fn prepare_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested/progress.sqlite3");
        let url = format!("sqlite://{}", db.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(db.is_file());
        // an existing file is left alone
        std::fs::write(&db, b"keep").unwrap();
        prepare_sqlite_file(&url).unwrap();
        assert_eq!(std::fs::read(&db).unwrap(), b"keep");
    }
}
