//! Prompt templates for classification and synthesis.

pub const CLASSIFICATION_PROMPT: &str = "\
Given the user's question, classify it as either 'weather' or 'rag'.
- If the question is about weather, temperature, climate, or a specific city's forecast, respond with 'weather'.
- If the question is about Avdeep or Avdeep's resume, like his experience, skill set, job role, etc., respond with 'rag'.

Do not respond with any other words, just 'weather' or 'rag'.

User question: {question}
Classification:";

pub const SYNTHESIS_PROMPT: &str = "\
You are a helpful assistant. Based on the following context, answer the user's question concisely.
If the context is an error message, inform the user about the error.

Context:
{context}

Question:
{question}

Answer:";

/// Substitute `{name}` placeholders in one pass. Placeholders inside the
/// substituted values are left untouched; unknown placeholders stay literal.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn classification_prompt(question: &str) -> String {
    render(CLASSIFICATION_PROMPT, &[("question", question)])
}

pub fn synthesis_prompt(context: &str, question: &str) -> String {
    render(SYNTHESIS_PROMPT, &[("context", context), ("question", question)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_prompt_embeds_question() {
        let prompt = classification_prompt("Delhi");
        assert!(prompt.contains("User question: Delhi\nClassification:"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn synthesis_prompt_embeds_context_and_question() {
        let prompt = synthesis_prompt("P1\n\n---\n\nP2", "experience?");
        assert!(prompt.contains("Context:\nP1\n\n---\n\nP2\n\nQuestion:\nexperience?\n\nAnswer:"));
    }

    #[test]
    fn placeholders_in_values_are_not_expanded() {
        let prompt = synthesis_prompt("literal {question}", "q");
        assert!(prompt.contains("Context:\nliteral {question}\n"));
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        assert_eq!(render("a {b} {c", &[("x", "y")]), "a {b} {c");
        assert_eq!(render("{x}{x}", &[("x", "y")]), "yy");
    }
}
