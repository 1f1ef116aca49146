//! Deterministic mock provider.
//!
//! Returns canned responses keyed off prompt substrings. Used by tests
//! and as the terminal fallback whenever a real provider is unreachable
//! or its credentials are missing, which is what lets the facade promise
//! it never raises.

use crate::error::Result;
use crate::providers::{GenerateRequest, TextProvider};
use async_trait::async_trait;

/// Mock LLM with canned, prompt-keyed responses.
#[derive(Debug, Clone, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Produce the canned response for `prompt`.
    pub fn respond(prompt: &str) -> String {
        let lower = prompt.to_lowercase();

        if lower.contains("create a plan") || lower.contains("plan for") {
            return "\
Based on your request, here's a suggested workflow plan:

1. Initialize the workflow
2. Fetch required data
3. Process the data
4. Validate results
5. Generate output
6. Send notifications

This plan can be executed as a sequential workflow with appropriate tools and agents."
                .to_string();
        }

        if lower.contains("json") && lower.contains("schema") {
            return r#"{
  "dag_id": "generated_plan_001",
  "name": "Sample Workflow Plan",
  "description": "Auto-generated workflow plan",
  "nodes": [
    {
      "node_id": "step_1",
      "node_type": "agent",
      "agent_id": "echo_agent",
      "config": {"input": {}},
      "dependencies": []
    }
  ],
  "start_nodes": ["step_1"]
}"#
            .to_string();
        }

        if lower.contains("tools available") {
            return "Available tools include: echo, filesystem, and other registered tools."
                .to_string();
        }

        if lower.contains("agents available") {
            return "Available agents include: echo_agent and other configured agents."
                .to_string();
        }

        let preview: String = prompt.chars().take(100).collect();
        format!(
            "I understand you're asking about: {}... I can help you create workflow plans, \
             execute tasks, and coordinate agents. What would you like to do?",
            preview
        )
    }
}

#[async_trait]
impl TextProvider for MockProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        Ok(Self::respond(&request.prompt))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
