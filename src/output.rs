use std::io::{self, Write};

use serde::Serialize;

use crate::session::{DatasetSession, SessionOrigin};

pub const BOLD: &str = "\x1b[1m";
pub const UNDERLINE: &str = "\x1b[4m";
pub const YELLOW: &str = "\x1b[33m";
pub const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct SummaryOutput;

impl SummaryOutput {
    pub fn render(session: &DatasetSession) -> String {
        let mut text = String::new();
        if session.origin() == SessionOrigin::Text {
            text.push_str(&format!(
                "{YELLOW}Warning: data loaded from csv has no capture time; \
                 the time below is the load time.{RESET}\n"
            ));
        }
        text.push_str(&format!("{BOLD}Data for COVID-19{RESET}\n"));
        text.push_str(&format!("Type: {}\n", session.kind().title()));
        text.push_str(&format!("Time (UTC): {}\n", session.captured_at_label()));
        text.push_str(&format!(
            "{BOLD}{UNDERLINE}TOTAL: {}{RESET}",
            session.total_cases()
        ));
        text
    }

    pub fn print(session: &DatasetSession) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(Self::render(session).as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_session(session: &DatasetSession) -> io::Result<()> {
        Self::print_json(&session.summary())
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub fn print_session(session: &DatasetSession, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Human => SummaryOutput::print(session),
        OutputMode::Json => JsonOutput::print_session(session),
    }
}
