use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::auth::TokenPair;
use crate::result_set::value_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Plain,
    Json,
}

#[derive(Debug, Serialize)]
struct TokenView<'a> {
    alias: &'a str,
    secret: &'a str,
    expires_at: Option<String>,
}

/// Writes command results to stdout, as lines or as pretty JSON.
pub struct Printer {
    mode: OutputMode,
}

impl Printer {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn print_list(&self, items: &[String]) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => Self::print_json(&items),
            OutputMode::Plain => Self::print_lines(items.iter().map(String::as_str)),
        }
    }

    pub fn print_text(&self, text: &str) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => Self::print_json(&text),
            OutputMode::Plain => Self::print_lines([text]),
        }
    }

    pub fn print_value(&self, value: &Value) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => Self::print_json(value),
            OutputMode::Plain => Self::print_lines([value_text(value).as_str()]),
        }
    }

    pub fn print_flag(&self, flag: bool) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => Self::print_json(&flag),
            OutputMode::Plain => Self::print_lines([if flag { "true" } else { "false" }]),
        }
    }

    pub fn print_token(&self, token: &TokenPair) -> io::Result<()> {
        let view = TokenView {
            alias: &token.alias,
            secret: &token.secret,
            expires_at: token.expires_at.map(|at| at.to_rfc3339()),
        };
        match self.mode {
            OutputMode::Json => Self::print_json(&view),
            OutputMode::Plain => {
                let mut lines = vec![
                    format!("alias: {}", view.alias),
                    format!("secret: {}", view.secret),
                ];
                if let Some(expires_at) = &view.expires_at {
                    lines.push(format!("expires: {expires_at}"));
                }
                Self::print_lines(lines.iter().map(String::as_str))
            }
        }
    }

    fn print_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for line in lines {
            stdout.write_all(line.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
        Ok(())
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
