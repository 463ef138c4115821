//! Prompt templates for the two model calls

pub const PROBLEM_PLACEHOLDER: &str = "{problem}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

pub const GENERATION_TEMPLATE: &str = r#"You are a CLIPS expert system programmer.
Generate ONLY valid CLIPS code (no explanations, no markdown, no comments outside CLIPS syntax).

User problem:
{problem}

Generate a complete CLIPS program with:
1. Templates (deftemplate) for data structures
2. Facts (deffacts) with initial data
3. Rules (defrule) for inference
4. Output using (printout t "message" crlf)

Return ONLY the CLIPS code, nothing else."#;

pub const INTERPRETATION_TEMPLATE: &str = r#"You are an expert system analyst.
A user described this problem:
{problem}

The generated CLIPS code executed with this output:
{output}

Explain the results to the user in a clear, friendly way.
Keep it concise (2-3 sentences)."#;

/// Fill the generation template
pub fn render_generation(template: &str, problem: &str) -> String {
    template.replace(PROBLEM_PLACEHOLDER, problem)
}

/// Fill the interpretation template
///
/// Substituted values are never re-expanded, so engine output that happens
/// to contain `{problem}` stays literal.
pub fn render_interpretation(template: &str, problem: &str, output: &str) -> String {
    template
        .split(OUTPUT_PLACEHOLDER)
        .map(|piece| piece.replace(PROBLEM_PLACEHOLDER, problem))
        .collect::<Vec<_>>()
        .join(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt_embeds_problem() {
        let prompt = render_generation(GENERATION_TEMPLATE, "Is 20 an adult age?");
        assert!(prompt.contains("User problem:\nIs 20 an adult age?\n"));
        assert!(!prompt.contains(PROBLEM_PLACEHOLDER));
    }

    #[test]
    fn test_interpretation_prompt_embeds_both() {
        let prompt = render_interpretation(INTERPRETATION_TEMPLATE, "adult?", "Rules fired: 1");
        assert!(prompt.contains("adult?"));
        assert!(prompt.contains("Rules fired: 1"));
        assert!(!prompt.contains(OUTPUT_PLACEHOLDER));
    }

    #[test]
    fn test_substituted_text_is_not_reexpanded() {
        let prompt = render_interpretation("{problem}|{output}", "a {output}", "b {problem}");
        assert_eq!(prompt, "a {output}|b {problem}");
    }
}
