//! Interactive questions for `cdn --interactive`

use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::cdn::setup::ManualNode;
use crate::errors::{EnvError, Result};

/// Line-oriented prompter over any reader/writer pair
pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask a question; an empty answer takes `default`
    pub fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        loop {
            match default {
                Some(d) => write!(self.output, "{} [{}]: ", question, d)?,
                None => write!(self.output, "{}: ", question)?,
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(EnvError::Config(format!(
                    "Input closed while asking: {}",
                    question
                )));
            }

            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
        }
    }

    /// Ask until the answer parses as `T`
    pub fn ask_parsed<T>(&mut self, question: &str, default: Option<&str>) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        loop {
            let answer = self.ask(question, default)?;
            match answer.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "  invalid value '{}': {}", answer, e)?,
            }
        }
    }

    /// Number of nodes for a group
    pub fn node_count(&mut self, group: &str, default: usize) -> Result<usize> {
        let default = default.to_string();
        self.ask_parsed(&format!("Number of {} nodes", group), Some(&default))
    }

    /// URL, port and type of one manually entered node
    pub fn manual_node(&mut self, group: &str, index: usize, default_url: &str) -> Result<ManualNode> {
        writeln!(self.output, "{} node #{}", group, index + 1)?;
        let url = self.ask("  url", Some(default_url))?;
        let port = self.ask_parsed::<u16>("  port", None)?;
        let node_type = self.ask_parsed::<u32>("  type", Some("1"))?;
        Ok(ManualNode { url, port, node_type })
    }
}
