//! Scripted command runner for integration tests.
//!
//! Replays canned stdout per step label and injects non-zero exits, so
//! the whole orchestration path can be driven without docker, pip, or an
//! installed application.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::command::{CommandOutput, CommandRunner, CommandSpec};

#[derive(Default)]
struct Inner {
    stdout_by_label: HashMap<String, VecDeque<String>>,
    fail_by_label: HashMap<String, i32>,
    calls: Vec<CommandSpec>,
}

/// Test double for [`CommandRunner`]. Single-threaded by design, like the
/// harness itself.
#[derive(Default)]
pub struct ScriptedRunner {
    inner: RefCell<Inner>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner::default()
    }

    /// Queue a stdout payload for the next invocation with this label.
    /// The last queued payload repeats once the queue drains.
    pub fn stdout_for(&self, label: &str, stdout: &str) {
        self.inner
            .borrow_mut()
            .stdout_by_label
            .entry(label.to_string())
            .or_default()
            .push_back(stdout.to_string());
    }

    /// Make every invocation with this label exit with the given code.
    pub fn fail_on(&self, label: &str, code: i32) {
        self.inner
            .borrow_mut()
            .fail_by_label
            .insert(label.to_string(), code);
    }

    /// Labels of every command executed so far, in order.
    pub fn labels(&self) -> Vec<String> {
        self.inner.borrow().calls.iter().map(|c| c.label.clone()).collect()
    }

    /// Full specs of every command executed so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.inner.borrow().calls.clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| c.label == label)
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(spec.clone());

        if let Some(code) = inner.fail_by_label.get(&spec.label).copied() {
            return Ok(CommandOutput {
                status: Some(code),
                stdout: String::new(),
                stderr: format!("scripted failure for `{}`", spec.label),
            });
        }

        let stdout = match inner.stdout_by_label.get_mut(&spec.label) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => String::new(),
        };
        Ok(CommandOutput {
            status: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}
