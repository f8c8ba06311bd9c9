//! In-memory command runner (testing only)
//!
//! `ScriptedRunner` answers commands from canned responses keyed by argument
//! tokens and records every invocation for later assertions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CommandError;
use crate::runner::{check_output, CommandOutput, CommandRunner, CommandSpec};

#[derive(Debug)]
struct Rule {
    tokens: Vec<String>,
    responses: VecDeque<CommandOutput>,
}

impl Rule {
    /// Tokens must appear in the command line in this order, not necessarily
    /// adjacent.
    fn matches(&self, line: &[&str]) -> bool {
        let mut rest = line.iter();
        self.tokens
            .iter()
            .all(|token| rest.any(|part| *part == token.as_str()))
    }

    /// Queued responses are consumed in order; the last one repeats.
    fn next_response(&mut self) -> CommandOutput {
        if self.responses.len() > 1 {
            self.responses.pop_front().unwrap_or_default()
        } else {
            self.responses.front().cloned().unwrap_or_default()
        }
    }
}

/// Scripted [`CommandRunner`].
///
/// Commands with no matching rule succeed with empty output. When several
/// rules match, the one with the most tokens wins.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for commands containing `tokens`.
    pub fn on(&self, tokens: &[&str], output: CommandOutput) -> &Self {
        let mut rules = self.rules.lock().unwrap();
        match rules
            .iter_mut()
            .find(|r| r.tokens.iter().map(String::as_str).eq(tokens.iter().copied()))
        {
            Some(rule) => rule.responses.push_back(output),
            None => rules.push(Rule {
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
                responses: VecDeque::from([output]),
            }),
        }
        self
    }

    /// Queue a successful response with `stdout`.
    pub fn ok(&self, tokens: &[&str], stdout: &str) -> &Self {
        self.on(tokens, CommandOutput::ok(stdout))
    }

    /// Queue a failing response with `stderr`.
    pub fn fail(&self, tokens: &[&str], code: i32, stderr: &str) -> &Self {
        self.on(tokens, CommandOutput::failed(code, stderr))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }

    /// Whether any recorded command contains `tokens` in order.
    pub fn invoked(&self, tokens: &[&str]) -> bool {
        self.count(tokens) > 0
    }

    /// Number of recorded commands containing `tokens` in order.
    pub fn count(&self, tokens: &[&str]) -> usize {
        let probe = Rule {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            responses: VecDeque::new(),
        };
        self.calls()
            .iter()
            .filter(|spec| probe.matches(&line_of(spec)))
            .count()
    }
}

fn line_of(spec: &CommandSpec) -> Vec<&str> {
    std::iter::once(spec.program.as_str())
        .chain(spec.args.iter().map(String::as_str))
        .collect()
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(spec.clone());

        let line = line_of(spec);
        let output = {
            let mut rules = self.rules.lock().unwrap();
            rules
                .iter_mut()
                .filter(|rule| rule.matches(&line))
                .max_by_key(|rule| rule.tokens.len())
                .map(Rule::next_response)
                .unwrap_or_else(|| CommandOutput::ok(""))
        };
        check_output(spec, output)
    }
}
