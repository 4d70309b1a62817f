use std::fmt;

use study_core::model::TopicId;
use study_core::timer::TimerMode;

/// One line typed at the console prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Stats,
    Topics,
    Missions,
    Select(TopicId),
    Start,
    Pause,
    Reset,
    Adjust { mode: TimerMode, delta: i32 },
    Commit,
    Dismiss,
    Theory { topic: TopicId, done: bool },
    Flashcards { topic: TopicId, done: bool },
    Questions { topic: TopicId, count: i64 },
    Accuracy { topic: TopicId, percent: f64 },
    Minutes { topic: TopicId, minutes: i64 },
    Explain(TopicId),
    Question(String),
    Essay { topic: String, text: String },
    Schedule { days: u32 },
    News,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    Usage(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            CommandError::Usage(usage) => write!(f, "usage: {usage}"),
        }
    }
}

impl std::error::Error for CommandError {}

pub const HELP: &str = "\
commands:
  status | stats | topics | missions
  topic <id>                 select the topic for work intervals
  start | pause | reset      control the timer
  work <+n|-n>               change the work length (timer stopped)
  break <+n|-n>              change the break length (timer stopped)
  commit | dismiss           resolve a finished work interval
  theory <id> on|off         mark theory read
  flash <id> on|off          mark flashcards done
  questions <id> <n>         set questions answered
  accuracy <id> <percent>    set accuracy
  minutes <id> <n>           log study minutes by hand
  explain <id>               ask the mentor about a topic
  question <subject>         ask for a practice question
  essay <topic> | <text>     submit an essay for grading
  schedule <days>            ask for a study plan
  news                       weekly diplomatic news dossier
  quit";

impl Command {
    /// Parse a console line. Returns `Ok(None)` for a blank line.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for unknown commands or bad arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "help" | "?" => Command::Help,
            "status" | "s" => Command::Status,
            "stats" => Command::Stats,
            "topics" => Command::Topics,
            "missions" => Command::Missions,
            "topic" => Command::Select(topic_arg(rest, "topic <id>")?),
            "start" | "resume" => Command::Start,
            "pause" => Command::Pause,
            "reset" => Command::Reset,
            "work" => Command::Adjust {
                mode: TimerMode::Work,
                delta: number(rest, "work <+n|-n>")?,
            },
            "break" => Command::Adjust {
                mode: TimerMode::Break,
                delta: number(rest, "break <+n|-n>")?,
            },
            "commit" => Command::Commit,
            "dismiss" => Command::Dismiss,
            "theory" => {
                let (topic, done) = topic_and_flag(rest, "theory <id> on|off")?;
                Command::Theory { topic, done }
            }
            "flash" => {
                let (topic, done) = topic_and_flag(rest, "flash <id> on|off")?;
                Command::Flashcards { topic, done }
            }
            "questions" => {
                let (topic, value) = topic_and_value(rest, "questions <id> <n>")?;
                Command::Questions {
                    topic,
                    count: number(value, "questions <id> <n>")?,
                }
            }
            "accuracy" => {
                let (topic, value) = topic_and_value(rest, "accuracy <id> <percent>")?;
                Command::Accuracy {
                    topic,
                    percent: number(value.trim_end_matches('%'), "accuracy <id> <percent>")?,
                }
            }
            "minutes" => {
                let (topic, value) = topic_and_value(rest, "minutes <id> <n>")?;
                Command::Minutes {
                    topic,
                    minutes: number(value, "minutes <id> <n>")?,
                }
            }
            "explain" => Command::Explain(topic_arg(rest, "explain <id>")?),
            "question" if !rest.is_empty() => Command::Question(rest.to_owned()),
            "question" => return Err(CommandError::Usage("question <subject>")),
            "essay" => {
                let usage = "essay <topic> | <text>";
                let (topic, text) = rest.split_once('|').ok_or(CommandError::Usage(usage))?;
                let (topic, text) = (topic.trim(), text.trim());
                if topic.is_empty() || text.is_empty() {
                    return Err(CommandError::Usage(usage));
                }
                Command::Essay {
                    topic: topic.to_owned(),
                    text: text.to_owned(),
                }
            }
            "schedule" => Command::Schedule {
                days: number(rest, "schedule <days>")?,
            },
            "news" | "dossier" => Command::News,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(Some(command))
    }
}

fn topic_arg(raw: &str, usage: &'static str) -> Result<TopicId, CommandError> {
    raw.parse().map_err(|_| CommandError::Usage(usage))
}

fn topic_and_value<'a>(
    raw: &'a str,
    usage: &'static str,
) -> Result<(TopicId, &'a str), CommandError> {
    let (id, value) = raw
        .split_once(char::is_whitespace)
        .ok_or(CommandError::Usage(usage))?;
    Ok((topic_arg(id, usage)?, value.trim()))
}

fn topic_and_flag(raw: &str, usage: &'static str) -> Result<(TopicId, bool), CommandError> {
    let (topic, value) = topic_and_value(raw, usage)?;
    let done = match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => true,
        "off" | "no" | "false" | "0" => false,
        _ => return Err(CommandError::Usage(usage)),
    };
    Ok((topic, done))
}

fn number<T: std::str::FromStr>(raw: &str, usage: &'static str) -> Result<T, CommandError> {
    raw.trim()
        .trim_start_matches('+')
        .parse()
        .map_err(|_| CommandError::Usage(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn parses_timer_commands() {
        assert_eq!(parse("topic econ-1"), Command::Select(TopicId::new("econ-1")));
        assert_eq!(parse("START"), Command::Start);
        assert_eq!(
            parse("work +5"),
            Command::Adjust {
                mode: TimerMode::Work,
                delta: 5
            }
        );
        assert_eq!(
            parse("break -2"),
            Command::Adjust {
                mode: TimerMode::Break,
                delta: -2
            }
        );
    }

    #[test]
    fn parses_topic_fields() {
        assert_eq!(
            parse("theory econ-1 on"),
            Command::Theory {
                topic: TopicId::new("econ-1"),
                done: true
            }
        );
        assert_eq!(
            parse("accuracy geo-1 72.5%"),
            Command::Accuracy {
                topic: TopicId::new("geo-1"),
                percent: 72.5
            }
        );
        assert_eq!(
            parse("minutes geo-1 -5"),
            Command::Minutes {
                topic: TopicId::new("geo-1"),
                minutes: -5
            }
        );
    }

    #[test]
    fn parses_mentor_requests() {
        assert_eq!(
            parse("question Política Internacional"),
            Command::Question("Política Internacional".into())
        );
        assert_eq!(
            parse("essay Congresso de Viena | O congresso redesenhou..."),
            Command::Essay {
                topic: "Congresso de Viena".into(),
                text: "O congresso redesenhou...".into()
            }
        );
        assert_eq!(parse("schedule 90"), Command::Schedule { days: 90 });
        assert_eq!(parse("news"), Command::News);
        assert_eq!(parse("Dossier"), Command::News);
    }

    #[test]
    fn reports_usage_errors() {
        assert_eq!(Command::parse("topic"), Err(CommandError::Usage("topic <id>")));
        assert_eq!(
            Command::parse("theory econ-1 maybe"),
            Err(CommandError::Usage("theory <id> on|off"))
        );
        assert_eq!(
            Command::parse("essay no separator"),
            Err(CommandError::Usage("essay <topic> | <text>"))
        );
        assert_eq!(
            Command::parse("dance"),
            Err(CommandError::Unknown("dance".into()))
        );
    }
}
