use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::CommandRunner;

/// One recorded call to [`MockRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

/// Test runner that answers every call with the same scripted outcome.
pub(crate) struct MockRunner {
    outcome: Result<Vec<u8>, String>,
    invocations: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn succeeding(stdout: &str) -> Self {
        Self {
            outcome: Ok(stdout.as_bytes().to_vec()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<Vec<u8>> {
        self.invocations.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: stdin.map(str::to_string),
        });
        self.outcome.clone().map_err(|msg| anyhow!(msg))
    }
}
