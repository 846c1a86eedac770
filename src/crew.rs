//! Sequential role-prompted LLM chain.
//!
//! A [`Crew`] runs its [`Task`]s in order. Each task's agent becomes the
//! system prompt; the task description, the previous task's answer and the
//! expected output become the user prompt. There are no tools, no delegation
//! and no memory beyond that one hand-off.
//!
//! A failed step ends the run: the next task has nothing to work from.

use crate::error::ContentGenError;
use crate::output::StepResult;
use crate::pipeline::llm::{run_step, ChatBackend, Prompt, RetryPolicy, SamplingOptions};
use crate::progress::ProgressCallback;
use tracing::info;

/// A persona for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}.\n{}\n\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }
}

/// One unit of work for an agent.
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    pub agent: Agent,
    /// Feed the previous task's answer into this one. Default: true.
    pub uses_context: bool,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: Agent,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            uses_context: true,
        }
    }

    pub fn without_context(mut self) -> Self {
        self.uses_context = false;
        self
    }

    /// Build the two-message prompt, given the previous step's output.
    pub fn prompt(&self, context: Option<&str>) -> Prompt {
        let mut user = self.description.clone();

        if self.uses_context {
            if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
                user.push_str("\n\nThis is the context you're working with:\n");
                user.push_str(ctx);
            }
        }

        user.push_str("\n\nThis is the expected criteria for your final answer: ");
        user.push_str(&self.expected_output);
        user.push_str(
            "\nYou MUST return the actual complete content as the final answer, not a summary.",
        );

        Prompt::new(self.agent.system_prompt(), user)
    }
}

/// The ordered list of tasks.
#[derive(Debug, Clone)]
pub struct Crew {
    tasks: Vec<Task>,
}

impl Crew {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task in order and return one [`StepResult`] per task.
    pub async fn kickoff(
        &self,
        backend: &dyn ChatBackend,
        options: &SamplingOptions,
        policy: &RetryPolicy,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<StepResult>, ContentGenError> {
        if self.tasks.is_empty() {
            return Err(ContentGenError::Internal("crew has no tasks".to_string()));
        }

        let total = self.tasks.len();
        let mut steps: Vec<StepResult> = Vec::with_capacity(total);

        for (i, task) in self.tasks.iter().enumerate() {
            let step = i + 1;
            let role = task.agent.role.as_str();
            let context = steps.last().map(|s| s.output.as_str());
            let prompt = task.prompt(context);

            info!("Step {}/{}: {}", step, total, role);
            if let Some(cb) = progress {
                cb.on_step_start(step, total, role);
            }

            match run_step(backend, role, &prompt, options, policy).await {
                Ok(result) => {
                    if let Some(cb) = progress {
                        cb.on_step_complete(step, total, role, result.output.len());
                    }
                    steps.push(result);
                }
                Err(e) => {
                    if let Some(cb) = progress {
                        cb.on_step_error(step, total, role, &e.to_string());
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::ChatReply;
    use crate::progress::ConversionProgressCallback;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Echoes the role it was asked to play; fails for one chosen role.
    struct RoleEcho {
        fail_role: Option<&'static str>,
        seen: Mutex<Vec<Prompt>>,
    }

    #[async_trait]
    impl ChatBackend for RoleEcho {
        async fn chat(&self, prompt: &Prompt, _o: &SamplingOptions) -> Result<ChatReply, String> {
            self.seen.lock().unwrap().push(prompt.clone());
            let role = prompt
                .system
                .strip_prefix("You are ")
                .and_then(|s| s.split('.').next())
                .unwrap_or("?")
                .to_string();
            if Some(role.as_str()) == self.fail_role {
                return Err("quota exceeded".into());
            }
            Ok(ChatReply {
                content: format!("output of {role}"),
                prompt_tokens: 1,
                completion_tokens: 1,
            })
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl ConversionProgressCallback for Events {
        fn on_step_start(&self, step: usize, total: usize, role: &str) {
            self.0.lock().unwrap().push(format!("start {step}/{total} {role}"));
        }
        fn on_step_error(&self, step: usize, _total: usize, role: &str, _e: &str) {
            self.0.lock().unwrap().push(format!("error {step} {role}"));
        }
    }

    fn crew() -> Crew {
        Crew::new(vec![
            Task::new("first", "a", Agent::new("Alpha", "g", "b")).without_context(),
            Task::new("second", "b", Agent::new("Beta", "g", "b")),
            Task::new("third", "c", Agent::new("Gamma", "g", "b")),
        ])
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            backoff_ms: 1,
            timeout_secs: 5,
        }
    }

    fn opts() -> SamplingOptions {
        SamplingOptions {
            temperature: 0.7,
            max_tokens: 64,
        }
    }

    #[test]
    fn prompt_layout() {
        let task = Task::new("Do the thing", "A thing", Agent::new("Tester", "Test", "Tests."));
        let p = task.prompt(Some("earlier answer"));
        assert!(p.system.starts_with("You are Tester.\nTests."));
        assert!(p.system.ends_with("Your personal goal is: Test"));
        let desc = p.user.find("Do the thing").unwrap();
        let ctx = p.user.find("earlier answer").unwrap();
        let exp = p.user.find("A thing").unwrap();
        assert!(desc < ctx && ctx < exp);
    }

    #[test]
    fn context_is_skipped_when_disabled() {
        let task = Task::new("d", "e", Agent::new("R", "g", "b")).without_context();
        assert!(!task.prompt(Some("secret")).user.contains("secret"));
    }

    #[tokio::test]
    async fn steps_chain_outputs() {
        let backend = RoleEcho {
            fail_role: None,
            seen: Mutex::new(vec![]),
        };
        let steps = crew().kickoff(&backend, &opts(), &policy(), None).await.unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].output, "output of Gamma");

        let seen = backend.seen.lock().unwrap();
        assert!(seen[1].user.contains("output of Alpha"));
        assert!(seen[2].user.contains("output of Beta"));
    }

    #[tokio::test]
    async fn failing_step_aborts_and_names_role() {
        let backend = RoleEcho {
            fail_role: Some("Beta"),
            seen: Mutex::new(vec![]),
        };
        let events = Arc::new(Events::default());
        let cb: ProgressCallback = events.clone();

        let err = crew()
            .kickoff(&backend, &opts(), &policy(), Some(&cb))
            .await
            .unwrap_err();

        match err {
            ContentGenError::LlmFailed { role, .. } => assert_eq!(role, "Beta"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(backend.seen.lock().unwrap().len(), 2, "Gamma must not run");
        assert_eq!(
            *events.0.lock().unwrap(),
            vec!["start 1/3 Alpha", "start 2/3 Beta", "error 2 Beta"]
        );
    }
}
