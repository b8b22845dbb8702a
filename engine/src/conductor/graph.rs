//! Orchestrator
//!
//! A fresh fan-out/fan-in graph per run:
//!
//! ```text
//! start → plan → week1 … weekN → collect → end
//! ```
//!
//! Nodes run stage by stage in topological order. Week nodes of one stage
//! run concurrently (bounded by `max_parallel_weeks`) and each writes back
//! only its own allocation, keyed by week number.

use super::aggregator::ResultAggregator;
use super::executor::WeeklyQuestionGenerator;
use super::normalizer::{normalize_input, NormalizeOptions};
use super::planner::BudgetAllocator;
use super::types::{PlanningState, QuestionCounts, WeekAllocation};
use crate::config::PipelineConfig;
use crate::llm::router::LLMRouter;
use futures::stream::{self, StreamExt};
use sdk::errors::EngineError;
use sdk::types::ExamPaper;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphNode {
    Start,
    Plan,
    Week(u32),
    Collect,
    End,
}

impl GraphNode {
    pub fn week_number(&self) -> Option<u32> {
        match self {
            GraphNode::Week(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Start => write!(f, "start"),
            GraphNode::Plan => write!(f, "plan"),
            GraphNode::Week(n) => write!(f, "week{}", n),
            GraphNode::Collect => write!(f, "collect"),
            GraphNode::End => write!(f, "end"),
        }
    }
}

/// The run's node graph, parameterized by week count.
#[derive(Debug, Clone)]
pub struct ExamGraph {
    total_weeks: u32,
    edges: Vec<(GraphNode, GraphNode)>,
}

impl ExamGraph {
    pub fn build(total_weeks: u32) -> Result<Self, EngineError> {
        if total_weeks < 1 {
            return Err(EngineError::InvalidRequest(format!(
                "totalWeeks must be at least 1, got {}",
                total_weeks
            )));
        }

        let mut edges = vec![(GraphNode::Start, GraphNode::Plan)];
        edges.extend((1..=total_weeks).map(|w| (GraphNode::Plan, GraphNode::Week(w))));
        edges.extend((1..=total_weeks).map(|w| (GraphNode::Week(w), GraphNode::Collect)));
        edges.push((GraphNode::Collect, GraphNode::End));

        Ok(Self { total_weeks, edges })
    }

    pub fn total_weeks(&self) -> u32 {
        self.total_weeks
    }

    pub fn edges(&self) -> &[(GraphNode, GraphNode)] {
        &self.edges
    }

    pub fn nodes(&self) -> Vec<GraphNode> {
        let mut nodes: Vec<GraphNode> = self
            .edges
            .iter()
            .flat_map(|(from, to)| [*from, *to])
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    /// Nodes grouped into stages; every node's predecessors sit in earlier
    /// stages, so a stage may start once the previous one has fully finished.
    pub fn stages(&self) -> Vec<Vec<GraphNode>> {
        let mut in_degree: HashMap<GraphNode, usize> =
            self.nodes().into_iter().map(|n| (n, 0)).collect();
        for (_, to) in &self.edges {
            *in_degree.entry(*to).or_default() += 1;
        }

        let mut stages = Vec::new();
        let mut ready: Vec<GraphNode> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();

        while !ready.is_empty() {
            ready.sort();
            let mut next = Vec::new();
            for node in &ready {
                for (_, to) in self.edges.iter().filter(|(from, _)| from == node) {
                    if let Some(d) = in_degree.get_mut(to) {
                        *d -= 1;
                        if *d == 0 {
                            next.push(*to);
                        }
                    }
                }
            }
            stages.push(std::mem::take(&mut ready));
            ready = next;
        }

        stages
    }
}

/// A write to the shared run state.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    /// Plan node output: the full set of allocations.
    Planned(Vec<WeekAllocation>),
    /// One week node's output; replaces the allocation with the same week number.
    WeekCompleted(WeekAllocation),
    /// Collect node output.
    Collected(ExamPaper),
}

/// Shared state of one run. Week allocations are keyed by week number.
#[derive(Debug, Default)]
pub struct RunState {
    allocations: BTreeMap<u32, WeekAllocation>,
    paper: Option<ExamPaper>,
}

impl RunState {
    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Planned(allocations) => {
                self.allocations = allocations
                    .into_iter()
                    .map(|a| (a.week_number, a))
                    .collect();
            }
            StateUpdate::WeekCompleted(allocation) => {
                if !self.allocations.contains_key(&allocation.week_number) {
                    warn!(
                        "week{} completed without a planned allocation",
                        allocation.week_number
                    );
                }
                self.allocations.insert(allocation.week_number, allocation);
            }
            StateUpdate::Collected(paper) => self.paper = Some(paper),
        }
    }

    pub fn allocation(&self, week_number: u32) -> Option<&WeekAllocation> {
        self.allocations.get(&week_number)
    }

    /// All allocations, ascending by week number.
    pub fn allocations_in_order(&self) -> Vec<WeekAllocation> {
        self.allocations.values().cloned().collect()
    }

    pub fn paper(&self) -> Option<&ExamPaper> {
        self.paper.as_ref()
    }

    pub fn into_paper(self) -> Option<ExamPaper> {
        self.paper
    }
}

/// One paper request.
///
/// Totals left as `None` come from the raw input's top-level fields, then
/// from configuration.
#[derive(Debug, Clone, Default)]
pub struct PaperRequest {
    pub total_weeks: u32,
    pub total_multiple_choice: Option<u32>,
    pub total_short_answer: Option<u32>,
    pub title: Option<String>,
}

impl PaperRequest {
    pub fn new(total_weeks: u32, total_multiple_choice: u32, total_short_answer: u32) -> Self {
        Self {
            total_weeks,
            total_multiple_choice: Some(total_multiple_choice),
            total_short_answer: Some(total_short_answer),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Runs the whole pipeline against one router.
pub struct ExamPipeline {
    allocator: BudgetAllocator,
    generator: WeeklyQuestionGenerator,
    aggregator: ResultAggregator,
    config: PipelineConfig,
}

impl ExamPipeline {
    pub fn new(router: Arc<LLMRouter>, config: PipelineConfig) -> Self {
        Self {
            allocator: BudgetAllocator::new(Arc::clone(&router)),
            generator: WeeklyQuestionGenerator::new(
                router,
                config.max_agent_iterations,
                config.content_preview_chars,
            ),
            aggregator: ResultAggregator::new(config.resource_search_url.clone()),
            config,
        }
    }

    fn normalize(&self, raw: &Value, request: &PaperRequest) -> PlanningState {
        normalize_input(
            raw,
            &NormalizeOptions {
                total_weeks: Some(request.total_weeks),
                total_multiple_choice: request.total_multiple_choice,
                total_short_answer: request.total_short_answer,
                defaults: QuestionCounts::new(self.config.multiple_choice, self.config.short_answer),
            },
        )
    }

    /// Normalize and allocate only; no questions are generated.
    pub async fn plan_only(
        &self,
        raw: &Value,
        request: &PaperRequest,
    ) -> Result<(PlanningState, Vec<WeekAllocation>), EngineError> {
        ExamGraph::build(request.total_weeks)?;
        let planning = self.normalize(raw, request);
        let allocations = self.allocator.allocate(&planning).await;
        Ok((planning, allocations))
    }

    /// Produce a complete paper.
    ///
    /// The only error is a request with fewer than one week, rejected before
    /// any LLM call. Every other failure degrades inside the run.
    pub async fn generate_exam_paper(
        &self,
        raw: &Value,
        request: PaperRequest,
    ) -> Result<ExamPaper, EngineError> {
        let start = Instant::now();
        let graph = ExamGraph::build(request.total_weeks)?;
        let planning = self.normalize(raw, &request);
        let title = request
            .title
            .clone()
            .unwrap_or_else(|| self.config.paper_title.clone());

        info!(
            "Generating '{}': {} weeks, {} multiple choice, {} short answer",
            title,
            planning.total_weeks,
            planning.target_counts.multiple_choice,
            planning.target_counts.short_answer
        );

        let mut state = RunState::default();

        for stage in graph.stages() {
            debug!(
                "Running stage [{}]",
                stage.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
            );
            let weeks: Vec<u32> = stage.iter().filter_map(GraphNode::week_number).collect();
            if !weeks.is_empty() {
                self.run_weeks(&mut state, &weeks, &planning).await;
                continue;
            }

            for node in stage {
                match node {
                    GraphNode::Plan => {
                        let allocations = self.allocator.allocate(&planning).await;
                        state.apply(StateUpdate::Planned(allocations));
                    }
                    GraphNode::Collect => {
                        let paper = self
                            .aggregator
                            .aggregate(state.allocations_in_order(), &title);
                        state.apply(StateUpdate::Collected(paper));
                    }
                    GraphNode::Start | GraphNode::End | GraphNode::Week(_) => {}
                }
            }
        }

        let paper = state.into_paper().ok_or_else(|| {
            EngineError::InvalidRequest("pipeline finished without a paper".to_string())
        })?;

        info!(
            "Paper {} ready: {} questions in {:.1}s",
            paper.id,
            paper.questions.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(paper)
    }

    async fn run_weeks(&self, state: &mut RunState, weeks: &[u32], planning: &PlanningState) {
        let pending: Vec<WeekAllocation> = weeks
            .iter()
            .filter_map(|w| state.allocation(*w).cloned())
            .collect();

        let generator = &self.generator;
        let updates: Vec<StateUpdate> = stream::iter(pending)
            .map(|allocation| {
                let span = info_span!("week", week = allocation.week_number);
                async move {
                    StateUpdate::WeekCompleted(generator.generate(allocation, planning).await)
                }
                .instrument(span)
            })
            .buffer_unordered(self.config.max_parallel_weeks.max(1))
            .collect()
            .await;

        for update in updates {
            state.apply(update);
        }
    }
}
