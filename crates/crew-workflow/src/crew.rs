//! Crew orchestration
//!
//! A [`Crew`] owns the agents and task graph for one request. It is
//! validated when built and consumed by [`Crew::kickoff`], which runs every
//! task exactly once in dependency order and returns the terminal task's
//! output.

use crate::plan::ExecutionPlan;
use crate::state::TaskState;
use crew_core::{Agent, CapabilityProvider, Error, Inputs, Result, Task, TaskOutput};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// How ready tasks are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// One task at a time, in plan order
    #[default]
    Sequential,

    /// Every task whose dependencies are complete runs at once
    Concurrent,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
            Process::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for Process {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Process::Sequential),
            "concurrent" => Ok(Process::Concurrent),
            other => Err(Error::Configuration(format!(
                "Unknown process '{other}', expected 'sequential' or 'concurrent'"
            ))),
        }
    }
}

/// Execution settings for a crew
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrewConfig {
    /// Scheduling mode
    pub process: Process,

    /// Overall time limit for kickoff
    pub deadline: Option<Duration>,
}

/// Result of a successful kickoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Text produced by the terminal task
    pub raw: String,

    /// Every task output in the order the tasks ran
    ///
    /// Sequential crews follow the plan order. Concurrent crews list each
    /// wave in turn, in declaration order within a wave.
    pub tasks_output: Vec<TaskOutput>,
}

/// Orchestrator for one execution of a task graph
pub struct Crew {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    plan: ExecutionPlan,
    provider: Arc<dyn CapabilityProvider>,
    config: CrewConfig,
}

impl Crew {
    /// Create a builder
    pub fn builder() -> CrewBuilder {
        CrewBuilder::new()
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    /// Task templates in declaration order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    /// Run the task graph once with `inputs` substituted into every task
    ///
    /// Aborts on the first failing task with [`Error::CrewExecution`]; tasks
    /// that have not started are cancelled. When a deadline is configured
    /// and elapses, the in-flight call is dropped and [`Error::Timeout`] is
    /// returned.
    #[instrument(skip_all, fields(tasks = self.tasks.len(), process = %self.config.process))]
    pub async fn kickoff(self, inputs: &Inputs) -> Result<CrewOutput> {
        let tasks = self
            .tasks
            .iter()
            .map(|task| task.interpolate(inputs))
            .collect::<Result<Vec<_>>>()?;

        let mut states = vec![TaskState::Pending; tasks.len()];
        let started = Instant::now();
        info!(provider = %self.provider.name(), "Crew kickoff started");

        let outcome = match self.config.deadline {
            Some(limit) => {
                let timed = tokio::time::timeout(limit, self.run(&tasks, &mut states)).await;
                if let Ok(outcome) = timed {
                    outcome
                } else {
                    let cancelled = cancel_unfinished(&tasks, &mut states);
                    warn!(limit = ?limit, cancelled = ?cancelled, "Crew execution timed out");
                    return Err(Error::Timeout { limit, cancelled });
                }
            }
            None => self.run(&tasks, &mut states).await,
        };

        if let Err(e) = outcome {
            cancel_unfinished(&tasks, &mut states);
            error!(failed_task = ?e.failed_task(), error = %e, "Crew execution failed");
            return Err(e);
        }

        let positions: Vec<usize> = match self.config.process {
            Process::Sequential => self.plan.order().to_vec(),
            Process::Concurrent => self.plan.waves().concat(),
        };
        let tasks_output = positions
            .into_iter()
            .filter_map(|position| tasks[position].output().cloned())
            .collect::<Vec<_>>();
        let raw = tasks[self.plan.terminal()]
            .output()
            .map(|output| output.raw.clone())
            .ok_or_else(|| {
                Error::Configuration("Terminal task finished without output".to_string())
            })?;

        info!(elapsed = ?started.elapsed(), "Crew kickoff completed");
        Ok(CrewOutput { raw, tasks_output })
    }

    async fn run(&self, tasks: &[Task], states: &mut [TaskState]) -> Result<()> {
        match self.config.process {
            Process::Sequential => {
                for &position in self.plan.order() {
                    transition(tasks, states, position, TaskState::Ready);
                    transition(tasks, states, position, TaskState::Running);
                    match self.execute(tasks, position).await {
                        Ok(()) => transition(tasks, states, position, TaskState::Completed),
                        Err(e) => {
                            transition(tasks, states, position, TaskState::Failed);
                            return Err(e);
                        }
                    }
                }
            }
            Process::Concurrent => {
                for wave in self.plan.waves() {
                    for &position in wave {
                        transition(tasks, states, position, TaskState::Ready);
                        transition(tasks, states, position, TaskState::Running);
                    }

                    let result =
                        try_join_all(wave.iter().map(|&position| self.execute(tasks, position)))
                            .await;

                    let failed = result.as_ref().err().and_then(Error::failed_task);
                    for &position in wave {
                        let next = if tasks[position].output().is_some() {
                            TaskState::Completed
                        } else if failed == Some(tasks[position].id()) {
                            TaskState::Failed
                        } else {
                            TaskState::Cancelled
                        };
                        transition(tasks, states, position, next);
                    }

                    result?;
                }
            }
        }
        Ok(())
    }

    /// Execute one task with its dependency outputs in declaration order
    async fn execute(&self, tasks: &[Task], position: usize) -> Result<()> {
        let task = &tasks[position];
        let agent = task
            .agent()
            .map(|agent| agent.role().to_string())
            .unwrap_or_default();

        let dependency_outputs = self
            .plan
            .dependencies_of(position)
            .iter()
            .map(|&dep| {
                tasks[dep].output().ok_or_else(|| {
                    Error::Configuration(format!(
                        "Dependency '{}' of task '{}' has no output",
                        tasks[dep].id(),
                        task.id()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.in_task(task.id(), &agent))?;

        let started = Instant::now();
        task.execute(self.provider.as_ref(), &dependency_outputs)
            .await
            .map_err(|e| e.in_task(task.id(), &agent))?;

        info!(task = %task.id(), agent = %agent, elapsed = ?started.elapsed(), "Task completed");
        Ok(())
    }
}

fn transition(tasks: &[Task], states: &mut [TaskState], position: usize, to: TaskState) {
    let from = states[position];
    if from.can_transition_to(to) {
        states[position] = to;
        debug!(task = %tasks[position].id(), from = %from, to = %to, "Task state changed");
    } else {
        warn!(
            task = %tasks[position].id(),
            from = %from,
            to = %to,
            "Ignoring invalid task state change"
        );
    }
}

/// Mark every task that has not finished as cancelled and return their ids
fn cancel_unfinished(tasks: &[Task], states: &mut [TaskState]) -> Vec<String> {
    let mut cancelled = Vec::new();
    for position in 0..tasks.len() {
        if tasks[position].output().is_some() {
            if states[position] == TaskState::Running {
                transition(tasks, states, position, TaskState::Completed);
            }
            continue;
        }
        if !states[position].is_terminal() {
            transition(tasks, states, position, TaskState::Cancelled);
        }
        if states[position] == TaskState::Cancelled {
            cancelled.push(tasks[position].id().to_string());
        }
    }
    cancelled
}

/// Builder for [`Crew`]
#[derive(Default)]
pub struct CrewBuilder {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    provider: Option<Arc<dyn CapabilityProvider>>,
    config: CrewConfig,
}

impl CrewBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent
    pub fn agent(mut self, agent: Arc<Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    /// Add a task; declaration order breaks ties between independent tasks
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Set the capability provider every task calls
    pub fn provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: CrewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.config.process = process;
        self
    }

    /// Bound the whole kickoff by `deadline`
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Validate the wiring and build the crew
    ///
    /// Checks agent bindings, tool permissions, task ids, dependency
    /// references, acyclicity and the single terminal task before anything
    /// runs.
    pub fn build(self) -> Result<Crew> {
        let provider = self
            .provider
            .ok_or_else(|| Error::Configuration("Capability provider not set".to_string()))?;

        for task in &self.tasks {
            let agent = task.validate()?;
            if !self.agents.iter().any(|member| member.role() == agent.role()) {
                return Err(Error::Configuration(format!(
                    "Task '{}' is assigned to agent '{}' which is not part of the crew",
                    task.id(),
                    agent.role()
                )));
            }
        }

        let plan = ExecutionPlan::build(&self.tasks)?;

        Ok(Crew {
            agents: self.agents,
            tasks: self.tasks,
            plan,
            provider,
            config: self.config,
        })
    }
}
