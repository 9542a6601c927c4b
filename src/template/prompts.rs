//! Agent prompt clauses rendered with minijinja
//!
//! Each clause is appended to the running agent prompt. The built-in texts
//! can be replaced from the `[agent]` config section.

use super::errors::TemplateError;
use crate::config::AgentPromptConfig;
use minijinja::{Environment, UndefinedBehavior, context};

const TOOLS_CLAUSE: &str = "tools_clause";
const NO_TOOLS_CLAUSE: &str = "no_tools_clause";
const ANSWER_CLAUSE: &str = "answer_clause";
const TOOL_RESULT_CLAUSE: &str = "tool_result_clause";
const UNAVAILABLE_TOOL_CLAUSE: &str = "unavailable_tool_clause";

const DEFAULT_TOOLS: &str = "\n\n你可用的工具：{{ tools | join(', ') }}\n\n如果你需要调用工具，请使用格式：调用工具 tool_name({\"param1\": \"value1\", \"param2\": \"value2\"})。";
const DEFAULT_NO_TOOLS: &str = "\n\n你没有任何可用的工具。";
const DEFAULT_ANSWER: &str = "\n\n否则直接给出答案。";
const DEFAULT_TOOL_RESULT: &str =
    "\n\n工具 {{ tool }} 的结果：{{ result }}\n\n根据这个结果，你的下一步是什么？";
const DEFAULT_UNAVAILABLE_TOOL: &str = "\n\n警告：工具 {{ tool }} 不可用。请重新思考。";

/// Variables a clause may reference
const KNOWN_VARS: &[&str] = &["tools", "tool", "result"];

/// Renders the clauses of the agent loop prompt
#[derive(Debug, Clone)]
pub struct AgentPrompts {
    env: Environment<'static>,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self::from_config(&AgentPromptConfig::default()).expect("built-in agent clauses are valid")
    }
}

impl AgentPrompts {
    /// Build the clause set, applying any configured overrides
    pub fn from_config(config: &AgentPromptConfig) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let clauses = [
            (TOOLS_CLAUSE, &config.tools_clause, DEFAULT_TOOLS),
            (NO_TOOLS_CLAUSE, &config.no_tools_clause, DEFAULT_NO_TOOLS),
            (ANSWER_CLAUSE, &config.answer_clause, DEFAULT_ANSWER),
            (TOOL_RESULT_CLAUSE, &config.tool_result_clause, DEFAULT_TOOL_RESULT),
            (
                UNAVAILABLE_TOOL_CLAUSE,
                &config.unavailable_tool_clause,
                DEFAULT_UNAVAILABLE_TOOL,
            ),
        ];

        for (name, custom, default) in clauses {
            let source = custom.clone().unwrap_or_else(|| default.to_string());
            env.add_template_owned(name, source)
                .map_err(|e| TemplateError::syntax(name, e.to_string(), e.line().unwrap_or(0)))?;
        }

        Ok(Self { env })
    }

    /// Lists the available tools and the invocation syntax
    pub fn tools_clause(&self, tools: &[String]) -> Result<String, TemplateError> {
        self.render(TOOLS_CLAUSE, context! { tools => tools })
    }

    pub fn no_tools_clause(&self) -> Result<String, TemplateError> {
        self.render(NO_TOOLS_CLAUSE, context! {})
    }

    pub fn answer_clause(&self) -> Result<String, TemplateError> {
        self.render(ANSWER_CLAUSE, context! {})
    }

    /// Feeds a tool result back into the prompt
    pub fn tool_result_clause(&self, tool: &str, result: &str) -> Result<String, TemplateError> {
        self.render(TOOL_RESULT_CLAUSE, context! { tool => tool, result => result })
    }

    pub fn unavailable_tool_clause(&self, tool: &str) -> Result<String, TemplateError> {
        self.render(UNAVAILABLE_TOOL_CLAUSE, context! { tool => tool })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, TemplateError> {
        let template = self.env.get_template(name)?;
        template.render(ctx).map_err(|e| convert_error(name, e))
    }
}

fn convert_error(template: &str, err: minijinja::Error) -> TemplateError {
    if err.kind() == minijinja::ErrorKind::UndefinedError {
        let name = extract_var_from_error(&err.to_string());
        return TemplateError::undefined_variable(template, name, KNOWN_VARS);
    }
    TemplateError::Internal(err)
}

/// Pull the offending name out of a minijinja message
fn extract_var_from_error(msg: &str) -> String {
    if let Some(start) = msg.find('`') {
        if let Some(end) = msg[start + 1..].find('`') {
            return msg[start + 1..start + 1 + end].to_string();
        }
    }
    "unknown".to_string()
}
