//! Executors for the simple card types

use super::envelope::{Field, OutputEnvelope};
use super::error::ExecutionError;
use super::executor::{CardExecutor, ExecutionContext};
use super::tool_call::extract_tool_call;
use crate::graph::Card;
use crate::template::{Binding, apply_binding, bind, resolve, strip_unresolved};
use async_trait::async_trait;

/// Value of a start card with an empty `output`
pub const START_FALLBACK: &str = "workflow_started_data";

/// Query used when the resolved rag query is blank
pub const RAG_FALLBACK_QUERY: &str = "请提供相关信息";

pub const DEFAULT_TOP_K: usize = 5;

const RAG_BINDINGS: [Binding; 2] = [bind("input", Field::Value), bind("input", Field::Text)];

/// `start`: emits its `output` property
pub struct StartExecutor;

#[async_trait]
impl CardExecutor for StartExecutor {
    async fn execute(
        &self,
        card: &Card,
        _previous: Option<&OutputEnvelope>,
        _ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        let output = card
            .properties
            .text("output")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| START_FALLBACK.to_string());
        Ok(OutputEnvelope::from_value(output))
    }
}

/// `text_input`: emits its `value` property verbatim
pub struct TextInputExecutor;

#[async_trait]
impl CardExecutor for TextInputExecutor {
    async fn execute(
        &self,
        card: &Card,
        _previous: Option<&OutputEnvelope>,
        _ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        let value = card.properties.text("value").unwrap_or_default();
        Ok(OutputEnvelope::from_value(value))
    }
}

/// `rag_content`: retrieves chunks for the resolved query
pub struct RagContentExecutor;

#[async_trait]
impl CardExecutor for RagContentExecutor {
    async fn execute(
        &self,
        card: &Card,
        previous: Option<&OutputEnvelope>,
        ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        let template = card.properties.text("query").unwrap_or_default();
        let mut query = resolve(&template, previous, &RAG_BINDINGS);
        if query.trim().is_empty() {
            tracing::warn!(card_id = %card.id, "Blank retrieval query, using fallback");
            query = RAG_FALLBACK_QUERY.to_string();
        }

        let top_k = card
            .properties
            .integer("top_k")
            .filter(|k| *k >= 1)
            .map(|k| k as usize)
            .unwrap_or(DEFAULT_TOP_K);

        tracing::debug!(card_id = %card.id, %query, top_k, "Retrieving content");
        let chunks = ctx.retrieval.retrieve(&query, top_k).await?;

        let content = chunks
            .iter()
            .take(top_k)
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(OutputEnvelope::from_content(content))
    }
}

/// Resolve an `llm_call` prompt against the previous output
///
/// `text` only fills `{{input}}` when neither the `value` nor the `content`
/// binding substituted anything.
pub fn resolve_llm_prompt(template: &str, previous: Option<&OutputEnvelope>) -> String {
    let mut prompt = template.to_string();
    let consumed_input = apply_binding(&mut prompt, previous, bind("input", Field::Value));
    let consumed_rag = apply_binding(&mut prompt, previous, bind("rag_content", Field::Content));
    apply_binding(&mut prompt, previous, bind("tool_result", Field::ToolResult));
    if !consumed_input && !consumed_rag {
        apply_binding(&mut prompt, previous, bind("input", Field::Text));
    }
    strip_unresolved(&prompt)
}

/// `llm_call`: one completion, plus any tool-call directive in the answer
pub struct LlmCallExecutor;

#[async_trait]
impl CardExecutor for LlmCallExecutor {
    async fn execute(
        &self,
        card: &Card,
        previous: Option<&OutputEnvelope>,
        ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        let template = card.properties.text("prompt").unwrap_or_default();
        let prompt = resolve_llm_prompt(&template, previous);

        let model = card
            .properties
            .text("model")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| ctx.default_model.clone());

        tracing::debug!(card_id = %card.id, %model, "Calling model");
        let completion = ctx.completion.complete(&prompt, &model).await?;
        let tool_call = extract_tool_call(&completion.text);

        Ok(OutputEnvelope::from_text(completion.text).with_tool_call(tool_call))
    }
}

/// `end`: wraps the previous output as the run's final result
pub struct EndExecutor;

#[async_trait]
impl CardExecutor for EndExecutor {
    async fn execute(
        &self,
        _card: &Card,
        previous: Option<&OutputEnvelope>,
        _ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        Ok(OutputEnvelope::wrap_final(
            previous.cloned().unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Mocks, ScriptedCompletion, StaticRetrieval};
    use crate::graph::CardType;
    use crate::services::{CompletionError, RetrievalError};
    use serde_json::json;

    #[tokio::test]
    async fn test_start_output() {
        let mocks = Mocks::default();
        let ctx = mocks.context();

        let card = Card::new("s", CardType::Start).with_property("output", "go");
        let out = StartExecutor.execute(&card, None, &ctx).await.unwrap();
        assert_eq!(out, OutputEnvelope::from_value("go"));

        let card = Card::new("s", CardType::Start).with_property("output", "");
        let out = StartExecutor.execute(&card, None, &ctx).await.unwrap();
        assert_eq!(out.value.as_deref(), Some(START_FALLBACK));
    }

    #[tokio::test]
    async fn test_start_ignores_previous() {
        let mocks = Mocks::default();
        let card = Card::new("s", CardType::Start);
        let prev = OutputEnvelope::from_value("ignored");
        let out = StartExecutor
            .execute(&card, Some(&prev), &mocks.context())
            .await
            .unwrap();
        assert_eq!(out.value.as_deref(), Some("workflow_start"));
    }

    #[tokio::test]
    async fn test_text_input_verbatim() {
        let mocks = Mocks::default();
        let card = Card::new("t", CardType::TextInput).with_property("value", "  {{input}} hi ");
        let prev = OutputEnvelope::from_value("x");
        let out = TextInputExecutor
            .execute(&card, Some(&prev), &mocks.context())
            .await
            .unwrap();
        assert_eq!(out.value.as_deref(), Some("  {{input}} hi "));
    }

    #[tokio::test]
    async fn test_rag_blank_query_fallback() {
        let mocks = Mocks::new(ScriptedCompletion::always("ok"), StaticRetrieval::new(&["a"]));
        let card = Card::new("r", CardType::RagContent).with_property("query", "{{input}}");

        RagContentExecutor
            .execute(&card, Some(&OutputEnvelope::default()), &mocks.context())
            .await
            .unwrap();
        RagContentExecutor
            .execute(&card, None, &mocks.context())
            .await
            .unwrap();

        let queries = mocks.retrieval.queries();
        assert_eq!(queries[0], (RAG_FALLBACK_QUERY.to_string(), 5));
        assert_eq!(queries[1].0, RAG_FALLBACK_QUERY);
    }

    #[tokio::test]
    async fn test_rag_query_binding_and_join() {
        let mocks = Mocks::new(
            ScriptedCompletion::always("ok"),
            StaticRetrieval::new(&["first", "second", "third"]),
        );
        let card = Card::new("r", CardType::RagContent)
            .with_property("query", "关于 {{input}}")
            .with_property("top_k", 2);

        let prev = OutputEnvelope {
            value: Some("价格".into()),
            text: Some("介绍".into()),
            ..Default::default()
        };
        let out = RagContentExecutor
            .execute(&card, Some(&prev), &mocks.context())
            .await
            .unwrap();

        assert_eq!(mocks.retrieval.queries()[0], ("关于 价格".to_string(), 2));
        assert_eq!(out, OutputEnvelope::from_content("first\n\nsecond"));
    }

    #[tokio::test]
    async fn test_rag_invalid_top_k_defaults() {
        let mocks = Mocks::default();
        let card = Card::new("r", CardType::RagContent).with_property("top_k", 0);
        RagContentExecutor
            .execute(&card, None, &mocks.context())
            .await
            .unwrap();

        let card = Card::new("r", CardType::RagContent).with_property("top_k", "3");
        RagContentExecutor
            .execute(&card, None, &mocks.context())
            .await
            .unwrap();

        let queries = mocks.retrieval.queries();
        assert_eq!(queries[0], ("产品介绍".to_string(), DEFAULT_TOP_K));
        assert_eq!(queries[1].1, 3);
    }

    #[tokio::test]
    async fn test_rag_uninitialized_is_error() {
        let mocks = Mocks::default();
        let ctx = ExecutionContext {
            retrieval: std::sync::Arc::new(crate::services::UnconfiguredRetrieval),
            ..mocks.context()
        };
        let card = Card::new("r", CardType::RagContent);
        let err = RagContentExecutor.execute(&card, None, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Retrieval(RetrievalError::Uninitialized)
        ));
    }

    #[test]
    fn test_llm_prompt_specific_fields_win_over_text() {
        let prev = OutputEnvelope {
            content: Some("DOCS".into()),
            text: Some("TEXT".into()),
            ..Default::default()
        };
        // rag_content was consumed, so text must not fill {{input}}
        assert_eq!(
            resolve_llm_prompt("{{rag_content}}|{{input}}", Some(&prev)),
            "DOCS|"
        );
        // nothing specific consumed, text fills {{input}}
        assert_eq!(resolve_llm_prompt("Q: {{input}}", Some(&prev)), "Q: TEXT");
    }

    #[test]
    fn test_llm_prompt_value_and_tool_result() {
        let prev = OutputEnvelope {
            value: Some("V".into()),
            text: Some("T".into()),
            tool_result: Some(json!(42)),
            ..Default::default()
        };
        assert_eq!(
            resolve_llm_prompt("{{input}} {{tool_result}} {{other}}", Some(&prev)),
            "V 42 "
        );
        assert_eq!(resolve_llm_prompt("{{input}}", None), "");
    }

    #[tokio::test]
    async fn test_llm_call_with_tool_directive() {
        let mocks = Mocks::new(
            ScriptedCompletion::new(&[r#"先搜索。调用工具 web_search({'query': 'rust'})"#]),
            StaticRetrieval::default(),
        );
        let card = Card::new("l", CardType::LlmCall)
            .with_property("prompt", "问题：{{input}}")
            .with_property("model", "Qwen/Qwen3-8B");
        let prev = OutputEnvelope::from_value("什么是 Rust");

        let out = LlmCallExecutor
            .execute(&card, Some(&prev), &mocks.context())
            .await
            .unwrap();

        let call = out.tool_call.unwrap();
        assert_eq!(call.name, "web_search");
        assert_eq!(call.args, json!({"query": "rust"}));
        assert_eq!(
            mocks.completion.requests(),
            vec![("问题：什么是 Rust".to_string(), "Qwen/Qwen3-8B".to_string())]
        );
    }

    #[tokio::test]
    async fn test_llm_call_malformed_directive_is_plain_answer() {
        let mocks = Mocks::new(
            ScriptedCompletion::new(&["调用工具 web_search({oops)"]),
            StaticRetrieval::default(),
        );
        let card = Card::new("l", CardType::LlmCall).with_property("model", " ");

        let out = LlmCallExecutor
            .execute(&card, None, &mocks.context())
            .await
            .unwrap();
        assert!(out.tool_call.is_none());
        assert_eq!(out.text.as_deref(), Some("调用工具 web_search({oops)"));
        assert_eq!(mocks.completion.requests()[0].1, crate::config::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_llm_call_failure_propagates() {
        let mocks = Mocks::new(
            ScriptedCompletion::failing(CompletionError::network("reset")),
            StaticRetrieval::default(),
        );
        let card = Card::new("l", CardType::LlmCall);
        let err = LlmCallExecutor
            .execute(&card, None, &mocks.context())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Completion(_)));
    }

    #[tokio::test]
    async fn test_end_wraps_previous() {
        let mocks = Mocks::default();
        let card = Card::new("e", CardType::End);
        let prev = OutputEnvelope::from_value("hi");
        let out = EndExecutor
            .execute(&card, Some(&prev), &mocks.context())
            .await
            .unwrap();
        assert_eq!(out.final_result.as_deref(), Some(&prev));
    }
}
