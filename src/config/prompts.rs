//! Prompt templates for QuizRag.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub mcq: McqPrompts,
    pub feedback: FeedbackPrompts,
}

/// Prompts for question generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McqPrompts {
    pub system: String,
    pub user: String,
}

impl Default for McqPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert exam tutor. Generate one multiple-choice question built around a short, specific scenario.
Use the provided context to make the question accurate and relevant.

Return ONLY a JSON object with exactly this shape:
{
  "question": "Scenario followed by the question?",
  "choices": ["A. ...", "B. ...", "C. ...", "D. ..."],
  "correct": 2,
  "explanations": {"0": "Why A is right or wrong", "1": "...", "2": "...", "3": "..."},
  "links": {"0": ["https://..."], "1": ["https://..."], "2": ["https://..."], "3": ["https://..."]}
}

Rules:
- Exactly four choices, labeled "A. ", "B. ", "C. ", "D. " in that order
- Each choice must be a distinct answer, and exactly one must be correct
- "correct" is the 0-based index of the right choice (0=A, 1=B, 2=C, 3=D)
- "explanations" and "links" are keyed by the same 0-based index as strings
- Give detailed reasoning for why each choice is correct or incorrect
- Links should point to relevant learning resources
- Do NOT use generic placeholders such as "Option A" or "Explanation for option X"
- Make every part specific to the topic, never generic"#
                .to_string(),

            user: r#"Topic: {{topic}}

Context:
{{context}}

Generate one multiple-choice question about {{topic}} as described. The wrong answers should be plausible and close to the correct one."#
                .to_string(),
        }
    }
}

/// Prompts for answer feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPrompts {
    pub system: String,
    pub user: String,
}

impl Default for FeedbackPrompts {
    fn default() -> Self {
        Self {
            system: "You are an expert exam tutor. Evaluate the learner's answer and give concise, \
                     encouraging feedback that explains the reasoning and suggests what to review next."
                .to_string(),
            user: r#"Topic: {{topic}}
Learner selected: {{selected}}
Correct answer: {{correct}}
Explanation for the selected answer: {{explanation}}

Provide feedback and suggest next steps."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, letting files in `custom_dir` replace the built-in ones.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let mcq_path = custom_path.join("mcq.toml");
            if mcq_path.exists() {
                let content = std::fs::read_to_string(&mcq_path)?;
                prompts.mcq = toml::from_str(&content)?;
            }

            let feedback_path = custom_path.join("feedback.toml");
            if feedback_path.exists() {
                let content = std::fs::read_to_string(&feedback_path)?;
                prompts.feedback = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.mcq.system.contains("\"correct\""));
        assert!(prompts.mcq.system.contains("Option A"));
        assert!(prompts.mcq.user.contains("{{context}}"));
        assert!(!prompts.feedback.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let mut vars = HashMap::new();
        vars.insert("topic", "Lymphatic system".to_string());
        vars.insert("context", "none".to_string());

        let result = Prompts::render("Topic: {{topic}} / {{context}} / {{missing}}", &vars);
        assert_eq!(result, "Topic: Lymphatic system / none / {{missing}}");
    }

    #[test]
    fn test_custom_dir_overrides_feedback_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("feedback.toml"),
            "system = \"Be brief.\"\nuser = \"{{topic}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.feedback.system, "Be brief.");
        assert_eq!(prompts.mcq.system, McqPrompts::default().system);
    }
}
