//! Template error types with suggestions for misspelled variables

use thiserror::Error;

/// Errors rendering a prompt clause
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Referenced variable doesn't exist
    #[error("undefined variable '{name}' in '{template}'{}", .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default())]
    UndefinedVariable {
        template: String,
        name: String,
        suggestion: Option<String>,
    },

    /// Template syntax error
    #[error("syntax error in '{template}' at line {line}: {message}")]
    SyntaxError {
        template: String,
        message: String,
        line: usize,
    },

    /// Wrapped minijinja error
    #[error("template error: {0}")]
    Internal(#[from] minijinja::Error),
}

impl TemplateError {
    /// Create an undefined variable error with optional suggestion
    pub fn undefined_variable(
        template: impl Into<String>,
        name: impl Into<String>,
        known_vars: &[&str],
    ) -> Self {
        let name = name.into();
        let suggestion = suggest_correction(&name, known_vars);
        Self::UndefinedVariable {
            template: template.into(),
            name,
            suggestion,
        }
    }

    /// Create a syntax error
    pub fn syntax(template: impl Into<String>, message: impl Into<String>, line: usize) -> Self {
        Self::SyntaxError {
            template: template.into(),
            message: message.into(),
            line,
        }
    }
}

/// Suggest a correction for a typo using Levenshtein distance
pub fn suggest_correction(typo: &str, candidates: &[&str]) -> Option<String> {
    let max_distance = (typo.len() / 2).max(2);

    candidates
        .iter()
        .map(|candidate| (levenshtein_distance(typo, candidate), *candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }

    previous[b.len()]
}
