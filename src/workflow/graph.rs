//! Graph pipeline: agents as nodes of a directed acyclic graph.
//!
//! # Execution
//! Nodes with no predecessors run first. A node becomes ready once every
//! predecessor has spoken. All ready nodes form a wave; a wave runs
//! concurrently and its replies are appended in node declaration order.
//! The run ends when no node is ready or the termination condition fires.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::future::join_all;

use super::outcome::{RunRecorder, WorkflowOutcome};
use super::termination::{StopReason, TerminationCondition};
use super::{prepare_task, Pipeline, WorkflowError, WorkflowMode};
use crate::agents::{AgentContext, AgentError, AgentRef, AgentTurn};
use crate::task::{ProgrammingTask, TaskId};

/// Errors raised while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Graph has no nodes")]
    Empty,

    #[error("Node {0} was added twice")]
    DuplicateNode(String),

    #[error("Edge {from} -> {to} references unknown node {missing}")]
    UnknownNode {
        from: String,
        to: String,
        missing: String,
    },

    #[error("Graph has no entry node (every node has a predecessor)")]
    NoEntryNode,

    #[error("Graph contains a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Incrementally declares nodes and edges.
#[derive(Default)]
pub struct DiGraphBuilder {
    nodes: Vec<AgentRef>,
    edges: Vec<(String, String)>,
}

impl DiGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; its name is the agent's speaker name.
    pub fn add_node(mut self, agent: AgentRef) -> Self {
        self.nodes.push(agent);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Validate the declared topology.
    ///
    /// # Errors
    /// Empty graphs, duplicate node names, edges to undeclared nodes, graphs
    /// without an entry node, and cycles.
    pub fn build(self) -> Result<DiGraph, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if index.insert(node.name().to_string(), i).is_some() {
                return Err(GraphError::DuplicateNode(node.name().to_string()));
            }
        }

        let n = self.nodes.len();
        let mut predecessors = vec![Vec::new(); n];
        let mut successors = vec![Vec::new(); n];
        for (from, to) in &self.edges {
            let lookup = |name: &String| {
                index.get(name).copied().ok_or_else(|| GraphError::UnknownNode {
                    from: from.clone(),
                    to: to.clone(),
                    missing: name.clone(),
                })
            };
            let (f, t) = (lookup(from)?, lookup(to)?);
            if !successors[f].contains(&t) {
                successors[f].push(t);
                predecessors[t].push(f);
            }
        }

        if predecessors.iter().all(|p| !p.is_empty()) {
            return Err(GraphError::NoEntryNode);
        }

        // Kahn's algorithm; whatever is never freed sits on a cycle.
        let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(i) = queue.pop_front() {
            visited += 1;
            for &s in &successors[i] {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    queue.push_back(s);
                }
            }
        }
        if visited < n {
            let stuck = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.nodes[i].name().to_string())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(DiGraph {
            nodes: self.nodes,
            predecessors,
            successors,
        })
    }
}

/// A validated, acyclic agent graph.
pub struct DiGraph {
    nodes: Vec<AgentRef>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
}

impl DiGraph {
    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn entry_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .zip(&self.predecessors)
            .filter(|(_, p)| p.is_empty())
            .map(|(a, _)| a.name())
            .collect()
    }

    pub fn successors_of(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|i| self.successors[i].iter().map(|&s| self.nodes[s].name()).collect())
            .unwrap_or_default()
    }

    pub fn predecessors_of(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|i| self.predecessors[i].iter().map(|&p| self.nodes[p].name()).collect())
            .unwrap_or_default()
    }

    /// Nodes whose predecessors have all spoken and that have not spoken yet.
    fn ready(&self, done: &[bool]) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| !done[i] && self.predecessors[i].iter().all(|&p| done[p]))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|a| a.name() == name)
    }
}

/// Executes a [`DiGraph`] wave by wave.
pub struct GraphFlow {
    graph: DiGraph,
    termination: TerminationCondition,
    parallel: bool,
}

impl GraphFlow {
    pub fn new(graph: DiGraph, termination: TerminationCondition) -> Self {
        Self {
            graph,
            termination,
            parallel: true,
        }
    }

    /// Run ready nodes one at a time instead of concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the graph on an already rendered task message.
    pub async fn run_message(
        &self,
        task_id: TaskId,
        task_message: String,
        ctx: &AgentContext,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let mut recorder = RunRecorder::start(
            task_id,
            WorkflowMode::Advanced,
            task_message,
            self.graph.node_names(),
            ctx,
        );

        if let Some(reason) = self.termination.check(recorder.transcript()) {
            return Ok(recorder.finish(reason));
        }

        let mut done = vec![false; self.graph.nodes.len()];
        let mut wave_number = 0;
        loop {
            let ready = self.graph.ready(&done);
            if ready.is_empty() {
                return Ok(recorder.finish(StopReason::GraphExhausted));
            }
            if ctx.is_cancelled() {
                return Ok(recorder.finish(StopReason::Cancelled));
            }

            wave_number += 1;
            tracing::info!(
                "Wave {}: {}",
                wave_number,
                ready
                    .iter()
                    .map(|&i| self.graph.nodes[i].name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            if self.parallel && ready.len() > 1 {
                let snapshot = recorder.transcript().clone();
                let replies = join_all(
                    ready
                        .iter()
                        .map(|&i| self.graph.nodes[i].respond(&snapshot, ctx)),
                )
                .await;

                for (&i, reply) in ready.iter().zip(replies) {
                    done[i] = true;
                    if let Some(reason) = self.append(&mut recorder, i, reply)? {
                        return Ok(recorder.finish(reason));
                    }
                }
            } else {
                for i in ready {
                    if ctx.is_cancelled() {
                        return Ok(recorder.finish(StopReason::Cancelled));
                    }
                    let reply = self.graph.nodes[i].respond(recorder.transcript(), ctx).await;
                    done[i] = true;
                    if let Some(reason) = self.append(&mut recorder, i, reply)? {
                        return Ok(recorder.finish(reason));
                    }
                }
            }
        }
    }

    /// Record one node's reply; `Some` means the run must stop.
    fn append(
        &self,
        recorder: &mut RunRecorder<'_>,
        node: usize,
        reply: Result<AgentTurn, AgentError>,
    ) -> Result<Option<StopReason>, WorkflowError> {
        let agent = &self.graph.nodes[node];
        match reply {
            Ok(turn) => Ok(recorder.record(agent.name(), turn, &self.termination)),
            Err(AgentError::Cancelled(_)) => Ok(Some(StopReason::Cancelled)),
            Err(e) => {
                tracing::error!("{} failed: {}", agent.name(), e);
                Err(WorkflowError::Agent(e))
            }
        }
    }
}

#[async_trait]
impl Pipeline for GraphFlow {
    fn mode(&self) -> WorkflowMode {
        WorkflowMode::Advanced
    }

    fn participants(&self) -> Vec<String> {
        self.graph.node_names()
    }

    async fn run(
        &self,
        task: &ProgrammingTask,
        ctx: &AgentContext,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let message = prepare_task(task, WorkflowMode::Advanced)?;
        self.run_message(TaskId::new(), message, ctx).await
    }
}
