mod args;
mod logging;

use lesson_core::Locale;
use lesson_core::site::SiteConfig;
use lesson_core::speech::{SpeechLabels, Utterance, Voice};
use services::{AppServices, LessonPage, SidebarView};

use args::{Args, Backend, Command, prepare_sqlite_file, print_usage};

/// Voices from `PLAYGROUND_VOICES`, e.g. `Kanya=th-TH,Alex=en-US`.
fn voices_from_env(raw: Option<&str>) -> Vec<Voice> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, lang)) => Voice::new(name.trim(), Some(lang.trim())),
            None => Voice::new(entry, None),
        })
        .collect()
}

fn print_sidebar(view: &SidebarView) {
    let messages = view.locale.messages();
    for section in &view.sections {
        println!("{}", section.name);
        for item in &section.items {
            let mark = if item.completed { "✅" } else { "  " };
            println!("  {mark} {:<24} {}", item.slug.as_str(), item.title);
        }
    }
    if view.sections.is_empty() {
        println!("{}", messages.not_found);
    }
    println!();
    println!("{}", view.completed_label());
}

fn print_page(page: &LessonPage, site: &SiteConfig) {
    let messages = page.locale.messages();
    println!("{}", page.section);
    println!("{}", page.title);
    println!("{}", page.summary);
    println!("{}", site.lesson_url(page.locale, &page.slug));
    println!();
    println!("[{}]", page.progress_label());
    if let Some(previous) = &page.previous {
        println!("← {}: {} ({})", messages.previous, previous.title, previous.path);
    }
    if let Some(next) = &page.next {
        println!("→ {}: {} ({})", messages.next, next.title, next.path);
    }
    if let Some(code) = &page.starter_code {
        println!();
        println!("{}:", messages.playground);
        println!("{code}");
    }
}

fn print_summary(services: &AppServices, locale: Locale) {
    let summary = services.summary();
    println!(
        "{}: {}/{} ({}%)",
        locale.messages().progress,
        summary.completed,
        summary.total,
        summary.percent
    );
}

async fn open_services(backend: &Backend) -> Result<AppServices, Box<dyn std::error::Error>> {
    let services = match backend {
        Backend::Memory => AppServices::in_memory()?,
        Backend::Sqlite(db_url) => {
            // Keep file creation in the binary glue so core/services stay pure.
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url).await?
        }
    };
    Ok(services)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), None | Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let site_url = std::env::var("PLAYGROUND_SITE_URL").ok();
    let site = SiteConfig::from_configured(site_url.as_deref())?;
    let services = open_services(&parsed.backend).await?;
    let locale = parsed.locale;
    let progress = services.progress();

    match &parsed.command {
        Command::Lessons { search } => {
            print_sidebar(&services.sidebar(locale, search, None));
        }
        Command::Show { slug } => match services.lesson_page(slug, locale) {
            Some(page) => print_page(&page, &site),
            None => println!("{}: {slug}", locale.messages().not_found),
        },
        Command::Complete { slug } => {
            progress.mark_completed(slug.as_str());
            print_summary(&services, locale);
        }
        Command::Toggle { slug } => {
            progress.toggle_completed(slug.as_str());
            let state = if progress.is_completed(slug) {
                locale.messages().completed
            } else {
                locale.messages().mark_complete
            };
            println!("{slug}: {state}");
            print_summary(&services, locale);
        }
        Command::Reset => {
            progress.reset_progress();
            print_summary(&services, locale);
        }
        Command::Progress => print_summary(&services, locale),
        Command::Speak { slug } => {
            let labels = SpeechLabels::for_locale(locale);
            let voices = voices_from_env(std::env::var("PLAYGROUND_VOICES").ok().as_deref());
            let Some(page) = services.lesson_page(slug, locale) else {
                println!("{}: {slug}", locale.messages().not_found);
                return Ok(());
            };
            match Utterance::plan(&page.summary, &voices, locale) {
                Some(utterance) => {
                    let voice = utterance
                        .voice
                        .as_ref()
                        .map_or("(default)", |v| v.name.as_str());
                    println!("{}: {}", labels.toggle(false), utterance.text);
                    println!(
                        "lang={} voice={voice} rate={} pitch={}",
                        utterance.lang, utterance.rate, utterance.pitch
                    );
                }
                None => println!("{}", labels.unsupported),
            }
        }
    }

    services.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
