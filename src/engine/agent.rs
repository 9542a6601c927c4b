//! `agent`: a bounded think/act loop over the completion and tool services
//!
//! Each iteration asks the model for either a final answer or a tool call.
//! Tool results and unavailable-tool warnings are appended to the running
//! prompt. After [`MAX_ITERATIONS`] model calls without a final answer the
//! agent gives up with a sentinel output instead of failing the run.

use super::envelope::{Field, OutputEnvelope, display_value};
use super::error::ExecutionError;
use super::executor::{CardExecutor, ExecutionContext};
use super::tool_call::extract_tool_call;
use crate::config::DEFAULT_MODEL;
use crate::graph::Card;
use crate::template::{Binding, bind, resolve};
use async_trait::async_trait;
use serde::Serialize;

/// Upper bound on model calls per agent card
pub const MAX_ITERATIONS: usize = 5;

/// The agent ignores the card's model and always uses this one
pub const AGENT_MODEL: &str = DEFAULT_MODEL;

pub const EXHAUSTED_MESSAGE: &str = "Agent达到最大迭代次数，未能给出最终答案。";

const SETUP_BINDINGS: [Binding; 3] = [
    bind("input", Field::Value),
    bind("rag_content", Field::Content),
    bind("input", Field::Text),
];

/// Agent loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Thinking,
    ToolCalling,
    /// Model gave a final answer
    Done,
    /// Iteration cap reached
    Exhausted,
}

/// Outcome of one agent loop
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub output: OutputEnvelope,
    pub state: AgentState,
    /// Model calls made
    pub iterations: usize,
    /// Output assigned by each tool or unavailable-tool step
    pub steps: Vec<OutputEnvelope>,
}

/// Split the `tools` property on commas, dropping blanks
pub fn parse_tools(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drive the loop for one agent card
pub async fn run_agent(
    card: &Card,
    previous: Option<&OutputEnvelope>,
    ctx: &ExecutionContext,
) -> Result<AgentRun, ExecutionError> {
    let template = card.properties.text("initial_prompt").unwrap_or_default();
    let mut prompt = resolve(&template, previous, &SETUP_BINDINGS);
    let tools = parse_tools(&card.properties.text("tools").unwrap_or_default());

    let tool_clause = if tools.is_empty() {
        ctx.prompts.no_tools_clause()?
    } else {
        ctx.prompts.tools_clause(&tools)?
    };
    let answer_clause = ctx.prompts.answer_clause()?;

    let mut state = AgentState::Thinking;
    let mut steps = Vec::new();
    let mut last_response = String::new();

    for iteration in 0..MAX_ITERATIONS {
        let request = format!("{}{}{}", prompt, tool_clause, answer_clause);
        tracing::debug!(card_id = %card.id, iteration, ?state, "Agent thinking");

        let response = ctx.completion.complete(&request, AGENT_MODEL).await?.text;
        last_response.clone_from(&response);

        let Some(call) = extract_tool_call(&response) else {
            return Ok(AgentRun {
                output: OutputEnvelope::from_text(response),
                state: AgentState::Done,
                iterations: iteration + 1,
                steps,
            });
        };

        if tools.iter().any(|t| *t == call.name) {
            state = AgentState::ToolCalling;
            tracing::info!(card_id = %card.id, tool = %call.name, iteration, ?state, "Agent calling tool");

            let result = ctx
                .tools
                .execute(&call.name, &call.args)
                .await?
                .result;
            let result_text = display_value(&result);

            prompt.push_str(&ctx.prompts.tool_result_clause(&call.name, &result_text)?);
            steps.push(
                OutputEnvelope::from_text(format!("Agent执行了工具{}", call.name))
                    .with_tool_result(result),
            );
        } else {
            tracing::warn!(card_id = %card.id, tool = %call.name, iteration, "Agent asked for unavailable tool");

            prompt.push_str(&ctx.prompts.unavailable_tool_clause(&call.name)?);
            steps.push(OutputEnvelope::from_text(format!(
                "Agent试图调用不可用工具: {}",
                call.name
            )));
        }
        state = AgentState::Thinking;
    }

    tracing::warn!(card_id = %card.id, iterations = MAX_ITERATIONS, "Agent exhausted iterations");
    Ok(AgentRun {
        output: OutputEnvelope {
            text: Some(EXHAUSTED_MESSAGE.to_string()),
            final_incomplete_response: Some(last_response),
            ..Default::default()
        },
        state: AgentState::Exhausted,
        iterations: MAX_ITERATIONS,
        steps,
    })
}

pub struct AgentExecutor;

#[async_trait]
impl CardExecutor for AgentExecutor {
    async fn execute(
        &self,
        card: &Card,
        previous: Option<&OutputEnvelope>,
        ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        let run = run_agent(card, previous, ctx).await?;
        tracing::debug!(
            card_id = %card.id,
            state = ?run.state,
            iterations = run.iterations,
            tool_steps = run.steps.len(),
            "Agent finished"
        );
        Ok(run.output)
    }
}
