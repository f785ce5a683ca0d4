//! Line-oriented console
//!
//! Each line is `<type> [message]` or one of the housekeeping commands.
//! Generated events are kept in a local history and acknowledged on output.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use apm_telemetry::{Dispatcher, EventKind, Severity, TelemetryEvent};
use chrono::{DateTime, Local, Utc};

pub const DEFAULT_MESSAGE: &str = "A manually generated error";

/// Event types offered by the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoEventType {
    Error,
    CustomEvent,
    CustomLog,
    CustomError,
    Crash,
}

impl DemoEventType {
    pub const ALL: [DemoEventType; 5] = [
        Self::Error,
        Self::CustomEvent,
        Self::CustomLog,
        Self::CustomError,
        Self::Crash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::CustomEvent => "custom-event",
            Self::CustomLog => "custom-log",
            Self::CustomError => "custom-error",
            Self::Crash => "crash",
        }
    }

    pub fn to_event(self, message: &str) -> TelemetryEvent {
        match self {
            Self::Error => TelemetryEvent::new(EventKind::Log, message).with_severity(Severity::Error),
            Self::CustomEvent => TelemetryEvent::new(EventKind::CustomEvent, message),
            Self::CustomLog => {
                TelemetryEvent::new(EventKind::Log, message).with_attribute("reason", "demo")
            }
            Self::CustomError => TelemetryEvent::new(EventKind::CustomError, message),
            Self::Crash => TelemetryEvent::new(EventKind::Crash, message),
        }
    }
}

impl fmt::Display for DemoEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemoEventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::UnknownCommand(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command `{0}`, type `help` for the list")]
    UnknownCommand(String),

    #[error("`auth` needs a user id")]
    MissingUserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate { kind: DemoEventType, message: String },
    Authenticate(String),
    History,
    Clear,
    Info,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "auth" if rest.is_empty() => return Err(ParseError::MissingUserId),
        "auth" => Command::Authenticate(rest.to_string()),
        "history" => Command::History,
        "clear" => Command::Clear,
        "info" => Command::Info,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            let kind: DemoEventType = other.parse()?;
            let message = if rest.is_empty() { DEFAULT_MESSAGE } else { rest };
            Command::Generate {
                kind,
                message: message.to_string(),
            }
        }
    };
    Ok(Some(command))
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub kind: DemoEventType,
    pub message: String,
    pub date: DateTime<Utc>,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} : {}",
            self.date.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S"),
            self.kind,
            self.message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a> {
    dispatcher: &'a Dispatcher,
    history: Vec<HistoryEntry>,
}

impl<'a> Console<'a> {
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "Type `help` for the list of commands.")?;

        for line in input.lines() {
            let line = line?;
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if self.execute(command, &mut out)? == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => writeln!(out, "{}", e)?,
            }
            out.flush()?;
        }
        Ok(())
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Flow> {
        match command {
            Command::Generate { kind, message } => {
                let event = kind.to_event(&message);
                let entry = HistoryEntry {
                    kind,
                    message,
                    date: event.timestamp,
                };
                writeln!(out, "{}", entry)?;
                out.flush()?;
                self.history.push(entry);
                self.dispatcher.dispatch(&event);
            }
            Command::Authenticate(user_id) => {
                self.dispatcher.record_authentication(&user_id);
                writeln!(out, "authenticated {}", user_id)?;
            }
            Command::History => {
                let history = self.history();
                if history.is_empty() {
                    writeln!(out, "No events yet")?;
                }
                for entry in history {
                    writeln!(out, "{}", entry)?;
                }
            }
            Command::Clear => {
                self.history.clear();
                writeln!(out, "History cleared")?;
            }
            Command::Info => self.write_info(out)?,
            Command::Help => write_help(out)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn write_info<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let config = self.dispatcher.configuration();
        let status = if config.telemetry().enabled() { "Active" } else { "Inactive" };
        writeln!(out, "Application : {}", config.app_name())?;
        writeln!(out, "Version : {}", config.app_version())?;
        writeln!(out, "Environment : {}", config.environment())?;
        writeln!(out, "Status : {}", status)
    }
}

fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    let types: Vec<&str> = DemoEventType::ALL.iter().map(|kind| kind.as_str()).collect();
    writeln!(out, "<type> [message]   generate an event, type is one of: {}", types.join(", "))?;
    writeln!(out, "auth <user-id>     record a user authentication")?;
    writeln!(out, "history | clear    show or clear generated events")?;
    writeln!(out, "info               show the APM configuration")?;
    writeln!(out, "quit               leave")
}

#[cfg(test)]
mod tests {
    use super::*;
    use apm_core::{Configuration, Environment, TelemetrySettings};
    use apm_telemetry::transport::InMemoryConnector;
    use apm_telemetry::TelemetryItem;
    use std::io::Cursor;
    use std::sync::Arc;

    fn active_dispatcher() -> (Dispatcher, Arc<InMemoryConnector>) {
        let config = Configuration::new(Environment::Local, "faro-demo", "0.1.0")
            .with_telemetry(TelemetrySettings::new(true, "http://collector"));
        let connector = Arc::new(InMemoryConnector::new());
        let dispatcher = Dispatcher::new(Arc::new(config), connector.clone());
        dispatcher.initialize();
        (dispatcher, connector)
    }

    #[test]
    fn test_parse_generate_commands() {
        assert_eq!(
            parse_command("custom-event hello world").unwrap(),
            Some(Command::Generate {
                kind: DemoEventType::CustomEvent,
                message: "hello world".to_string()
            })
        );
        assert_eq!(
            parse_command("  error ").unwrap(),
            Some(Command::Generate {
                kind: DemoEventType::Error,
                message: DEFAULT_MESSAGE.to_string()
            })
        );
    }

    #[test]
    fn test_parse_housekeeping_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("history").unwrap(), Some(Command::History));
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
        assert_eq!(
            parse_command("auth u-42").unwrap(),
            Some(Command::Authenticate("u-42".to_string()))
        );
        assert_eq!(parse_command("auth"), Err(ParseError::MissingUserId));
        assert_eq!(
            parse_command("explode now"),
            Err(ParseError::UnknownCommand("explode".to_string()))
        );
    }

    #[test]
    fn test_event_type_mapping() {
        let error = DemoEventType::Error.to_event("x");
        assert_eq!((error.kind, error.severity), (EventKind::Log, Severity::Error));

        let log = DemoEventType::CustomLog.to_event("x");
        assert_eq!(log.kind, EventKind::Log);
        assert!(log.attributes.unwrap().contains_key("reason"));

        assert_eq!(DemoEventType::Crash.to_event("x").kind, EventKind::Crash);
    }

    #[test]
    fn test_run_dispatches_and_keeps_history() {
        let (dispatcher, connector) = active_dispatcher();
        let mut console = Console::new(&dispatcher);
        let input = Cursor::new("custom-log saved\ncustom-error oops\nauth u-42\nbogus\nquit\nerror never\n");
        let mut output = Vec::new();

        console.run(input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("custom-log : saved"));
        assert!(text.contains("authenticated u-42"));
        assert!(text.contains("unknown command `bogus`"));
        assert_eq!(console.history().len(), 2);

        let kinds: Vec<&str> = connector.transport().items().iter().map(TelemetryItem::kind).collect();
        assert_eq!(kinds, vec!["log", "exception", "event"]);
    }

    #[test]
    fn test_clear_and_info() {
        let (dispatcher, _connector) = active_dispatcher();
        let mut console = Console::new(&dispatcher);
        let mut output = Vec::new();

        console
            .execute(
                Command::Generate {
                    kind: DemoEventType::CustomEvent,
                    message: "hello".to_string(),
                },
                &mut output,
            )
            .unwrap();
        assert_eq!(console.history().len(), 1);

        console.execute(Command::Clear, &mut output).unwrap();
        assert!(console.history().is_empty());

        console.execute(Command::Info, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Application : faro-demo"));
        assert!(text.contains("Status : Active"));
    }

    #[test]
    fn test_history_command_lists_entries() {
        let (dispatcher, _connector) = active_dispatcher();
        let mut console = Console::new(&dispatcher);
        let mut output = Vec::new();

        console.execute(Command::History, &mut output).unwrap();
        console
            .execute(
                Command::Generate {
                    kind: DemoEventType::CustomError,
                    message: "oops".to_string(),
                },
                &mut output,
            )
            .unwrap();
        let before = output.len();
        console.execute(Command::History, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("No events yet\n"));
        assert!(text[before..].contains("custom-error : oops"));
    }

    #[test]
    fn test_quit_stops_execution() {
        let (dispatcher, _connector) = active_dispatcher();
        let mut console = Console::new(&dispatcher);
        let flow = console.execute(Command::Quit, &mut io::sink()).unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
