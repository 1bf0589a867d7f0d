//! Built-in demonstration tasks.

use super::task::{Complexity, ProgrammingTask};
use crate::workflow::WorkflowMode;

/// A canned task together with the pipeline it is meant for.
#[derive(Debug, Clone)]
pub struct DemoTask {
    pub title: &'static str,
    pub mode: WorkflowMode,
    pub task: ProgrammingTask,
}

/// All demos, in menu order (1-based in the CLI).
pub fn demo_tasks() -> Vec<DemoTask> {
    vec![
        DemoTask {
            title: "Basic workflow - todo list manager",
            mode: WorkflowMode::Basic,
            task: ProgrammingTask::new(
                "Create a simple todo list manager",
                [
                    "Add, remove and mark tasks as done",
                    "Tasks can carry a priority",
                    "Search tasks by keyword",
                    "Persist data to disk",
                    "Provide a simple command-line interface",
                ],
            ),
        },
        DemoTask {
            title: "Advanced workflow - blog API",
            mode: WorkflowMode::Advanced,
            task: ProgrammingTask::new(
                "Develop a simple blog API",
                [
                    "User registration and login",
                    "CRUD operations for posts",
                    "Comment system",
                    "Post categories and tags",
                    "RESTful API design",
                ],
            )
            .with_complexity(Complexity::Medium)
            .with_security_requirements([
                "Store user passwords securely",
                "Enforce API access control",
                "Prevent XSS and SQL injection",
            ])
            .with_performance_requirements([
                "Serve 100+ concurrent users",
                "API response time under 500ms",
                "Optimized database queries",
            ]),
        },
    ]
}

/// Look up a demo by its 1-based menu number.
pub fn demo_task(choice: usize) -> Option<DemoTask> {
    choice
        .checked_sub(1)
        .and_then(|index| demo_tasks().into_iter().nth(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demos_are_valid() {
        for demo in demo_tasks() {
            assert!(demo.task.validate().is_ok(), "{} is invalid", demo.title);
        }
    }

    #[test]
    fn test_demo_lookup() {
        assert_eq!(demo_task(1).unwrap().mode, WorkflowMode::Basic);
        assert_eq!(demo_task(2).unwrap().mode, WorkflowMode::Advanced);
        assert!(demo_task(0).is_none());
        assert!(demo_task(3).is_none());
    }
}
