//! Execution planning for a task graph
//!
//! An [`ExecutionPlan`] is computed once when a crew is built. It validates
//! the wiring (unique ids, known dependencies, no cycles, one terminal task)
//! and fixes a topological order in which ties are broken by declaration
//! order, so the same task list always yields the same order.

use crew_core::{Error, Result, Task};
use std::collections::{BTreeSet, HashMap};

/// Validated, deterministic execution order for a list of tasks
///
/// Positions refer to indices into the task list the plan was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    order: Vec<usize>,
    waves: Vec<Vec<usize>>,
    dependencies: Vec<Vec<usize>>,
    terminal: usize,
}

impl ExecutionPlan {
    /// Validate `tasks` and compute the execution order
    pub fn build(tasks: &[Task]) -> Result<Self> {
        if tasks.is_empty() {
            return Err(Error::Configuration("Crew has no tasks".to_string()));
        }

        let mut index = HashMap::with_capacity(tasks.len());
        for (position, task) in tasks.iter().enumerate() {
            if index.insert(task.id(), position).is_some() {
                return Err(Error::Configuration(format!(
                    "Duplicate task id '{}'",
                    task.id()
                )));
            }
        }

        let mut dependencies = Vec::with_capacity(tasks.len());
        for task in tasks {
            let mut resolved = Vec::with_capacity(task.dependencies().len());
            for dependency in task.dependencies() {
                let Some(&position) = index.get(dependency.as_str()) else {
                    return Err(Error::UnknownDependency {
                        task: task.id().to_string(),
                        dependency: dependency.clone(),
                    });
                };
                resolved.push(position);
            }
            resolved.sort_unstable();
            resolved.dedup();
            dependencies.push(resolved);
        }

        let order = topological_order(&dependencies)
            .map_err(|cycle| Error::CyclicDependency {
                cycle: cycle.into_iter().map(|i| tasks[i].id().to_string()).collect(),
            })?;

        let terminals: Vec<usize> = (0..tasks.len())
            .filter(|&candidate| !dependencies.iter().any(|deps| deps.contains(&candidate)))
            .collect();
        let terminal = match terminals.as_slice() {
            [single] => *single,
            [] => {
                return Err(Error::Configuration(
                    "Crew has no terminal task".to_string(),
                ));
            }
            many => {
                let ids: Vec<&str> = many.iter().map(|&i| tasks[i].id()).collect();
                return Err(Error::Configuration(format!(
                    "Crew must have exactly one terminal task, found {}: {}",
                    ids.len(),
                    ids.join(", ")
                )));
            }
        };

        let waves = waves(&order, &dependencies);

        Ok(Self {
            order,
            waves,
            dependencies,
            terminal,
        })
    }

    /// Task positions in execution order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Groups of tasks whose dependencies all lie in earlier groups
    ///
    /// Within a group positions are in declaration order.
    pub fn waves(&self) -> &[Vec<usize>] {
        &self.waves
    }

    /// Positions of the dependencies of the task at `position`, in declaration order
    pub fn dependencies_of(&self, position: usize) -> &[usize] {
        &self.dependencies[position]
    }

    /// Position of the single task nothing depends on
    pub fn terminal(&self) -> usize {
        self.terminal
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Kahn's algorithm, always releasing the lowest ready position first
///
/// On failure returns one cycle as positions, first position repeated at the end.
fn topological_order(dependencies: &[Vec<usize>]) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let count = dependencies.len();
    let mut remaining: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut dependents = vec![Vec::new(); count];
    for (task, deps) in dependencies.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(task);
        }
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| remaining[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        Err(find_cycle(dependencies, &remaining))
    }
}

/// Walk unresolved dependency edges from the first blocked task until a repeat
///
/// Every blocked task has at least one blocked dependency, so the walk
/// always closes a loop.
fn find_cycle(dependencies: &[Vec<usize>], remaining: &[usize]) -> Vec<usize> {
    let blocked = |i: usize| remaining[i] > 0;
    let Some(start) = (0..dependencies.len()).find(|&i| blocked(i)) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = dependencies[current].iter().find(|&&d| blocked(d)) else {
            return path;
        };
        if let Some(seen) = path.iter().position(|&p| p == next) {
            let mut cycle = path.split_off(seen);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

/// Group `order` into levels: a task's level is one past its deepest dependency
fn waves(order: &[usize], dependencies: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut level = vec![0usize; dependencies.len()];
    for &task in order {
        level[task] = dependencies[task]
            .iter()
            .map(|&dep| level[dep] + 1)
            .max()
            .unwrap_or(0);
    }

    let depth = level.iter().copied().max().map_or(0, |max| max + 1);
    let mut waves = vec![Vec::new(); depth];
    for position in 0..dependencies.len() {
        waves[level[position]].push(position);
    }
    waves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::Agent;
    use std::sync::Arc;

    fn task(id: &str, deps: &[&str]) -> Task {
        let agent = Arc::new(Agent::builder("Analyst").goal("g").backstory("b").build());
        deps.iter()
            .fold(Task::builder(id).description(id).agent(agent), |b, d| b.depends_on(*d))
            .build()
    }

    #[test]
    fn test_independent_tasks_keep_declaration_order() {
        let tasks = vec![
            task("research", &[]),
            task("financial_analysis", &[]),
            task("advice", &["research", "financial_analysis"]),
        ];
        let plan = ExecutionPlan::build(&tasks).unwrap();

        assert_eq!(plan.order(), &[0, 1, 2]);
        assert_eq!(plan.terminal(), 2);
        assert_eq!(plan.waves(), &[vec![0, 1], vec![2]]);
        assert_eq!(plan.dependencies_of(2), &[0, 1]);
    }

    #[test]
    fn test_dependencies_reorder_declaration() {
        let tasks = vec![
            task("summary", &["b"]),
            task("b", &["a"]),
            task("a", &[]),
        ];
        let plan = ExecutionPlan::build(&tasks).unwrap();

        assert_eq!(plan.order(), &[2, 1, 0]);
        assert_eq!(plan.terminal(), 0);
        assert_eq!(plan.waves().len(), 3);
    }

    #[test]
    fn test_ties_break_by_declaration_position() {
        let tasks = vec![
            task("x", &[]),
            task("late", &["y"]),
            task("y", &[]),
            task("end", &["x", "late"]),
        ];
        let plan = ExecutionPlan::build(&tasks).unwrap();

        // x and y are ready first; late unlocks after y
        assert_eq!(plan.order(), &[0, 2, 1, 3]);
        assert_eq!(plan.waves(), &[vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn test_dependencies_follow_declaration_order() {
        let tasks = vec![
            task("a", &[]),
            task("b", &[]),
            task("c", &["b", "a", "b"]),
        ];
        let plan = ExecutionPlan::build(&tasks).unwrap();

        assert_eq!(plan.dependencies_of(2), &[0, 1]);
        assert_eq!(plan.order(), &[0, 1, 2]);
    }

    #[test]
    fn test_two_task_cycle() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let err = ExecutionPlan::build(&tasks).unwrap_err();

        match err {
            Error::CyclicDependency { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![task("root", &[]), task("loop", &["loop", "root"])];
        let err = ExecutionPlan::build(&tasks).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { cycle } if cycle == vec!["loop", "loop"]));
    }

    #[test]
    fn test_cycle_behind_valid_prefix() {
        let tasks = vec![
            task("start", &[]),
            task("p", &["start", "r"]),
            task("q", &["p"]),
            task("r", &["q"]),
        ];
        let err = ExecutionPlan::build(&tasks).unwrap_err();
        assert!(matches!(
            err,
            Error::CyclicDependency { cycle } if cycle == vec!["p", "r", "q", "p"]
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let tasks = vec![task("advice", &["research"])];
        let err = ExecutionPlan::build(&tasks).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownDependency { task, dependency }
                if task == "advice" && dependency == "research"
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let tasks = vec![task("a", &[]), task("a", &[])];
        assert!(matches!(
            ExecutionPlan::build(&tasks),
            Err(Error::Configuration(msg)) if msg.contains("Duplicate task id 'a'")
        ));
    }

    #[test]
    fn test_multiple_terminals_rejected() {
        let tasks = vec![task("a", &[]), task("b", &[])];
        assert!(matches!(
            ExecutionPlan::build(&tasks),
            Err(Error::Configuration(msg)) if msg.contains("exactly one terminal task")
        ));
    }

    #[test]
    fn test_empty_task_list_rejected() {
        assert!(matches!(ExecutionPlan::build(&[]), Err(Error::Configuration(_))));
    }
}
