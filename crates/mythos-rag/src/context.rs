//! Context assembly and prompt rendering

use serde::{Deserialize, Serialize};

use mythos_core::Fragment;

pub const DEFAULT_PERSONA: &str = "You are an expert historian and mythologist specializing in Ancient Greek history and mythology.";
pub const DEFAULT_INSTRUCTIONS: &str =
    "Use ONLY the context below to answer accurately and with clear reasoning.";

/// Join fragment texts in order, one per line, with no truncation or dedup
pub fn assemble(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The prompt sent to the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub persona: String,
    pub instructions: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Render the full prompt; an empty context still yields a complete prompt
    pub fn render(&self, context: &str, query: &str) -> String {
        format!(
            "{}\n\n{}\n\nContext:\n{}\n\nQuestion:\n{}\n\nAnswer:\n",
            self.persona, self.instructions, context, query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_assemble_joins_with_newline() {
        let fragments = vec![Fragment::new(2, "Hoplites"), Fragment::new(0, "phalanx")];
        assert_eq!(assemble(&fragments), "Hoplites\nphalanx");
    }

    #[test]
    fn test_assemble_keeps_duplicates() {
        let fragments = vec![Fragment::new(0, "Ares"), Fragment::new(1, "Ares")];
        assert_eq!(assemble(&fragments), "Ares\nAres");
    }

    #[test]
    fn test_assemble_empty() {
        assert_eq!(assemble(&[]), "");
    }

    #[test]
    fn test_render_prompt() {
        let template = PromptTemplate::default();
        let prompt = template.render("Solon was an archon.", "Who was Solon?");

        assert_snapshot!(prompt.trim_end(), @r###"
        You are an expert historian and mythologist specializing in Ancient Greek history and mythology.

        Use ONLY the context below to answer accurately and with clear reasoning.

        Context:
        Solon was an archon.

        Question:
        Who was Solon?

        Answer:
        "###);
    }

    #[test]
    fn test_render_with_empty_context() {
        let template = PromptTemplate::default().with_persona("You are a librarian.");
        let prompt = template.render("", "Anything?");
        assert!(prompt.starts_with("You are a librarian."));
        assert!(prompt.contains("Context:\n\n\nQuestion:\nAnything?"));
        assert!(prompt.ends_with("Answer:\n"));
    }
}
