//! Prompt templates for explanation requests.

use studymate_core::Style;

const TUTOR_PROMPT: &str = "You are an expert tutor that explains concepts clearly and precisely.
When explaining mathematical concepts:
1. Write in a continuous paragraph format
2. For mathematical formulas, enclose them in ```latex ... ``` tags
3. Use separate blocks or bullet points
4. Keep explanations flowing naturally with formulas in LaTeX
5. Use proper LaTeX syntax for formulas
When explaining other concepts:
1. Use clear and detailed explanations with headings and points
2. Avoid jargon and complex terms
3. Provide examples and analogies to illustrate points
4. Use simple language and focus on intuitive understanding
5. Keep explanations flowing naturally with examples integrated into the text";

/// System prompt for `style`: the tutor template plus a style suffix.
pub fn system_prompt(style: Style) -> String {
    let suffix = match style {
        Style::Technical => "Use technical language and provide detailed mathematical explanations.",
        Style::Simple => "Use simple language and focus on intuitive understanding.",
    };
    format!("{TUTOR_PROMPT}\n{suffix}")
}

pub fn user_prompt(subject: &str) -> String {
    format!("Explain this concept: {subject}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_suffix_is_last_line() {
        let technical = system_prompt(Style::Technical);
        assert!(technical.ends_with("detailed mathematical explanations."));
        assert!(technical.contains("```latex ... ```"));
        assert!(system_prompt(Style::Simple).ends_with("intuitive understanding."));
    }

    #[test]
    fn user_prompt_wraps_subject() {
        assert_eq!(user_prompt("entropy"), "Explain this concept: entropy");
    }
}
