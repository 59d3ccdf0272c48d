//! Scripted process runner for invoker tests.

#![allow(dead_code)]

use async_trait::async_trait;
use qlrun_core::{ProcessOutput, ProcessRunner, ProcessSpec, Result};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// What the fake process does when run.
pub enum Reply {
    /// Exit with the given code and no output.
    Exit(i32),
    /// Exit 0 printing `stdout`.
    Stdout(String),
    /// Exit 0 after writing `content` to the path in the last argument.
    WriteLastArg(String),
}

/// Records every spec it is asked to run and answers from a script.
///
/// Once the script runs out, every process succeeds silently.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<ProcessSpec>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedRunner {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into_iter().collect()),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn single_call(&self) -> ProcessSpec {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one process, got {calls:?}");
        calls.into_iter().next().unwrap()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        let output = match reply {
            None => ProcessOutput {
                code: Some(0),
                stdout: String::new(),
            },
            Some(Reply::Exit(code)) => ProcessOutput {
                code: Some(code),
                stdout: String::new(),
            },
            Some(Reply::Stdout(stdout)) => ProcessOutput {
                code: Some(0),
                stdout,
            },
            Some(Reply::WriteLastArg(content)) => {
                let path = PathBuf::from(spec.args.last().unwrap());
                std::fs::write(path, content).unwrap();
                ProcessOutput {
                    code: Some(0),
                    stdout: String::new(),
                }
            }
        };
        Ok(output)
    }
}
