mod command;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use services::mentor::progress_context;
use services::{
    AppConfig, AppServices, Clock, Dossier, EssayCorrection, GenerationError, PracticeQuestion,
    TickClock,
};
use study_core::model::{TopicField, TopicId};
use study_core::timer::{IntervalCompleted, TimerMode, TimerPhase};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use crate::command::{Command, HELP};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    syllabus: Option<PathBuf>,
    help: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--syllabus" => {
                    parsed.syllabus = Some(PathBuf::from(require_value(args, "--syllabus")?));
                }
                "--help" | "-h" => parsed.help = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--syllabus <file.json>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://study.sqlite3");
    eprintln!("  --syllabus (built-in sample)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_SYLLABUS, STUDY_WORK_MINUTES, STUDY_BREAK_MINUTES,");
    eprintln!("  STUDY_TICK_POLICY, STUDY_AI_API_KEY, STUDY_AI_BASE_URL, STUDY_AI_MODEL, RUST_LOG");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim();
    let path = std::path::Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_dir(db_url: &str) -> Result<(), ArgsError> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        });
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && std::fs::create_dir_all(parent).is_err() {
            return Err(ArgsError::InvalidDbUrl {
                raw: db_url.to_string(),
            });
        }
    }
    Ok(())
}

//
// ─── CONSOLE LOOP ──────────────────────────────────────────────────────────────
//

/// Result of a mentor call, delivered back to the loop from its own task.
enum MentorReply {
    Explanation { subtopic: String, text: String },
    Question(Result<PracticeQuestion, GenerationError>),
    Essay(Result<EssayCorrection, GenerationError>),
    Schedule(String),
    Dossier(Dossier),
}

enum Flow {
    Continue,
    Quit,
}

struct Console {
    app: AppServices,
    ticks: TickClock,
    replies: mpsc::UnboundedSender<MentorReply>,
}

impl Console {
    fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Help => println!("{HELP}"),
            Command::Status => self.print_status(),
            Command::Stats => self.print_stats(),
            Command::Topics => self.print_topics(),
            Command::Missions => self.print_missions(),
            Command::Select(topic) => {
                if !self.app.syllabus.contains(&topic) {
                    println!("note: {topic} is not in the syllabus");
                }
                self.app.session.select_topic(topic);
                self.print_status();
            }
            Command::Start => match self.app.session.start() {
                Ok(()) => {
                    self.ticks.restart();
                    self.print_status();
                }
                Err(err) => println!("{err}"),
            },
            Command::Pause => {
                self.app.session.pause();
                self.print_status();
            }
            Command::Reset => {
                self.app.session.reset();
                self.print_status();
            }
            Command::Adjust { mode, delta } => {
                if self.app.session.adjust_config(mode, delta) {
                    let config = self.app.session.timer().config();
                    println!(
                        "work {} min, break {} min",
                        config.work_minutes(),
                        config.break_minutes()
                    );
                } else {
                    println!("pause the timer before changing interval lengths");
                }
            }
            Command::Commit => match self.app.session.commit(&mut self.app.store) {
                Some(update) => {
                    println!(
                        "logged on {}: {} min total, +{} XP",
                        update.topic_id,
                        update.progress.study_minutes(),
                        update.xp.awarded
                    );
                    if let Some(level_up) = update.xp.level_up {
                        println!("level up! {} -> {}", level_up.from, level_up.to);
                    }
                }
                None => println!("nothing to commit"),
            },
            Command::Dismiss => match self.app.session.dismiss() {
                Some(offer) => println!(
                    "dismissed {} min on {}",
                    offer.minutes_completed(),
                    offer.topic_id()
                ),
                None => println!("nothing to dismiss"),
            },
            Command::Theory { topic, done } => {
                self.set_field(&topic, TopicField::TheoryRead(done));
            }
            Command::Flashcards { topic, done } => {
                self.set_field(&topic, TopicField::FlashcardsDone(done));
            }
            Command::Questions { topic, count } => {
                self.set_field(&topic, TopicField::QuestionsAnswered(count));
            }
            Command::Accuracy { topic, percent } => {
                self.set_field(&topic, TopicField::AccuracyPercent(percent));
            }
            Command::Minutes { topic, minutes } => {
                match self.app.store.add_study_minutes(&topic, minutes) {
                    Some(update) => println!(
                        "{}: {} min total, +{} XP",
                        topic,
                        update.progress.study_minutes(),
                        update.xp.awarded
                    ),
                    None => println!("only positive minutes are logged"),
                }
            }
            Command::Explain(topic) => self.request_explanation(&topic),
            Command::Question(subject) => {
                let mentor = self.app.mentor.clone();
                self.spawn_reply(async move {
                    MentorReply::Question(mentor.generate_question(&subject).await)
                });
                println!("asking the mentor for a question...");
            }
            Command::Essay { topic, text } => {
                let mentor = self.app.mentor.clone();
                self.spawn_reply(async move {
                    MentorReply::Essay(mentor.score_essay(&topic, &text).await)
                });
                println!("essay sent for grading...");
            }
            Command::Schedule { days } => {
                let mentor = self.app.mentor.clone();
                let context = progress_context(&self.app.syllabus, self.app.store.progress());
                self.spawn_reply(async move {
                    MentorReply::Schedule(mentor.generate_study_schedule(days, &context).await)
                });
                println!("building a study plan...");
            }
            Command::News => {
                let mentor = self.app.mentor.clone();
                let today = self.app.dossier_date();
                self.spawn_reply(async move {
                    MentorReply::Dossier(mentor.weekly_dossier(&today).await)
                });
                println!("gathering this week's news...");
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn on_tick(&mut self) {
        if !self.app.session.timer().is_running() {
            self.ticks.restart();
            return;
        }
        let seconds = self.ticks.elapsed_secs();
        if let Some(completed) = self.app.session.on_elapsed(seconds) {
            self.announce(&completed);
        }
    }

    fn on_reply(&mut self, reply: MentorReply) {
        match reply {
            MentorReply::Explanation { subtopic, text } => println!("── {subtopic} ──\n{text}"),
            MentorReply::Question(Ok(question)) => println!(
                "── {} ({}) ──\n{}\n[{} lines]",
                question.topic, question.subject, question.command, question.lines
            ),
            MentorReply::Essay(Ok(correction)) => {
                let gain = self.app.store.record_essay_submission();
                println!("score {:.2} / 10", correction.score);
                println!("{}", correction.justification);
                print_list("errors", &correction.errors);
                print_list("omissions", &correction.omissions);
                print_list("highlights", &correction.highlights);
                print_list("improvement plan", &correction.improvement_plan);
                println!(
                    "board average {:.2}, approved average {:.2}",
                    correction.bank_grade, correction.approved_grade
                );
                println!("model answer:\n{}", correction.model_response);
                println!("+{} XP", gain.awarded);
            }
            MentorReply::Question(Err(err)) | MentorReply::Essay(Err(err)) => {
                println!("mentor unavailable: {err}");
            }
            MentorReply::Schedule(text) => println!("── plan ──\n{text}"),
            MentorReply::Dossier(dossier) => print_dossier(&dossier),
        }
    }

    fn set_field(&mut self, topic: &TopicId, field: TopicField) {
        let update = self.app.store.set_topic_field(topic, field);
        let progress = &update.progress;
        println!(
            "{}: theory {}, flashcards {}, {} questions, {:.0}% accuracy, {} min",
            topic,
            yes_no(progress.theory_read()),
            yes_no(progress.flashcards_done()),
            progress.questions_answered(),
            progress.accuracy_percent(),
            progress.study_minutes()
        );
        if update.xp.awarded > 0 {
            println!("+{} XP", update.xp.awarded);
        }
        if let Some(level_up) = update.xp.level_up {
            println!("level up! {} -> {}", level_up.from, level_up.to);
        }
    }

    fn request_explanation(&self, topic: &TopicId) {
        let Some(entry) = self.app.syllabus.get(topic) else {
            println!("unknown topic: {topic}");
            return;
        };
        let mentor = self.app.mentor.clone();
        let subject = entry.subject.clone();
        let subtopic = entry.subtopic.clone();
        self.spawn_reply(async move {
            let text = mentor.explain_topic(&subject, &subtopic).await;
            MentorReply::Explanation { subtopic, text }
        });
        println!("asking the mentor...");
    }

    /// Run a mentor call on its own task so the timer keeps ticking.
    fn spawn_reply<F>(&self, call: F)
    where
        F: Future<Output = MentorReply> + Send + 'static,
    {
        let replies = self.replies.clone();
        tokio::spawn(async move {
            // The loop may already be gone; the answer is simply dropped.
            let _ = replies.send(call.await);
        });
    }

    fn announce(&self, completed: &IntervalCompleted) {
        match (&completed.finished, &completed.pending) {
            (TimerMode::Work, Some(offer)) => println!(
                "work interval done: {} min on {}. `commit` or `dismiss`.",
                offer.minutes_completed(),
                offer.topic_id()
            ),
            (TimerMode::Work, None) => println!("work interval done."),
            (TimerMode::Break, _) => println!("break over. `start` when ready."),
        }
    }

    fn print_status(&self) {
        let timer = self.app.session.timer();
        let state = match timer.phase() {
            TimerPhase::WorkIdle => "work, ready (`start`)",
            TimerPhase::WorkRunning => "work, running",
            TimerPhase::WorkPaused => "work, paused (`resume`)",
            TimerPhase::BreakIdle => "break, ready (`start`)",
            TimerPhase::BreakRunning => "break, running",
            TimerPhase::BreakPaused => "break, paused (`resume`)",
        };
        let topic = timer
            .selected_topic()
            .map_or_else(|| "none".to_owned(), ToString::to_string);
        println!(
            "{} {} [{:>3.0}%] topic: {}",
            timer.format_remaining(),
            state,
            timer.progress_fraction() * 100.0,
            topic
        );
        if let Some(offer) = self.app.session.pending() {
            println!(
                "pending: {} min on {} (`commit` or `dismiss`)",
                offer.minutes_completed(),
                offer.topic_id()
            );
        }
    }

    fn print_stats(&self) {
        let progress = self.app.store.progress();
        let level = progress.level_state();
        let aggregate = self.app.store.aggregate();
        println!(
            "level {} ({} / {} XP, {:.0}% to next)",
            level.level(),
            level.xp(),
            level.threshold(),
            level.level_progress() * 100.0
        );
        println!("{:.1} h studied", aggregate.total_hours());
        println!(
            "{}% syllabus coverage ({} / {} topics)",
            aggregate.coverage_percent(),
            aggregate.theory_read_count,
            self.app.syllabus.len()
        );
        println!("{:.0}% mean accuracy", aggregate.mean_accuracy);
        println!("{} essays graded", progress.submissions_count());
    }

    fn print_topics(&self) {
        for topic in self.app.syllabus.topics() {
            let read = self
                .app
                .store
                .topic(&topic.id)
                .is_some_and(|p| p.theory_read());
            println!(
                "[{}] {:<12} {} / {} ({:?})",
                if read { 'x' } else { ' ' },
                topic.id.as_str(),
                topic.subject,
                topic.subtopic,
                topic.incidence
            );
        }
    }

    fn print_missions(&self) {
        let missions = self.app.missions_today();
        if missions.is_empty() {
            println!("no missions today. rest.");
        }
        for mission in missions {
            match mission.topic {
                Some(topic) => println!("{}: {} ({})", mission.subject, topic.subtopic, topic.id),
                None => println!("{}: all topics read", mission.subject),
            }
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{title}:");
    for item in items {
        println!("  - {item}");
    }
}

fn print_dossier(dossier: &Dossier) {
    println!("── weekly dossier ──");
    if !dossier.current.is_empty() {
        println!("{}", dossier.current);
    }
    if !dossier.previous.is_empty() {
        println!("last week: {}", dossier.previous);
    }
    for highlight in &dossier.highlights {
        match &highlight.url {
            Some(url) => println!("  - {} <{url}>", highlight.text),
            None => println!("  - {}", highlight.text),
        }
    }
    if !dossier.sources.is_empty() {
        println!("sources:");
        for source in &dossier.sources {
            println!("  {} <{}>", source.title, source.uri);
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(&mut std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.help {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::from_env()?;
    if let Some(db_url) = args.db_url {
        config.db_url = db_url;
    }
    if args.syllabus.is_some() {
        config.syllabus_path = args.syllabus;
    }
    config.db_url = normalize_sqlite_url(config.db_url);
    prepare_sqlite_dir(&config.db_url)?;

    let tick_policy = config.tick_policy;
    let ai_enabled = config.ai.enabled();
    let app = AppServices::new_sqlite(config, Clock::default()).await?;
    tracing::info!(%tick_policy, ai_enabled, "study console ready");

    let (replies, mut reply_rx) = mpsc::unbounded_channel();
    let mut console = Console {
        app,
        ticks: TickClock::new(tick_policy),
        replies,
    };

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("type `help` for commands");
    console.print_status();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        if let Flow::Quit = console.handle(command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
            _ = interval.tick() => console.on_tick(),
            Some(reply) = reply_rx.recv() => console.on_reply(reply),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Err(err) = console.app.store.flush().await {
        tracing::warn!(error = %err, "last progress snapshot was not saved");
        println!("warning: progress from this session may not have been saved ({err})");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_flags() {
        let args = parse(&["--db", "sqlite://x.db", "--syllabus", "edital.json"]).unwrap();
        assert_eq!(args.db_url.as_deref(), Some("sqlite://x.db"));
        assert_eq!(args.syllabus, Some(PathBuf::from("edital.json")));
        assert!(!args.help);
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["--db", " "]), Err(ArgsError::InvalidDbUrl { .. })));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/study.db".into()),
            "sqlite:///tmp/study.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/study.db".into()), "sqlite:///tmp/study.db");
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/study.db".into()),
            "sqlite:///tmp/study.db"
        );
    }
}
