//! Prompt Rendering
//!
//! Turns stored skill definitions into the markdown block an agent prompt
//! embeds, presenting each skill as a slash command. Pure functions, no I/O;
//! rendering can never influence execution or approval.

use super::types::{display_value, SkillBody, SkillDefinition, UsageExample};
use serde_json::Value;

/// Render one skill as a prompt section.
pub fn render(skill: &SkillDefinition) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("### /{}", skill.name));

    if !skill.description.is_empty() {
        lines.push(format!(
            "**Description**: {}",
            first_paragraph(&skill.description)
        ));
    }

    if !skill.parameters.is_empty() {
        lines.push("\n**Parameters**:".to_string());
        lines.push("| Parameter | Type | Required | Default | Description |".to_string());
        lines.push("|-----------|------|----------|---------|-------------|".to_string());
        for parameter in &skill.parameters {
            let required = if parameter.required { "Yes" } else { "No" };
            let default = match &parameter.default {
                None => "-".to_string(),
                Some(Value::String(s)) if s.is_empty() => "\"\"".to_string(),
                Some(value) => display_value(value),
            };
            let description = parameter
                .description
                .as_deref()
                .unwrap_or("")
                .replace('\n', " ");
            lines.push(format!(
                "| {} | {} | {} | {} | {} |",
                parameter.name, parameter.kind, required, default, description
            ));
            if let Some(choices) = &parameter.choices {
                if !choices.is_empty() {
                    let values = choices
                        .iter()
                        .map(display_value)
                        .collect::<Vec<_>>()
                        .join(", ");
                    lines.push(format!(
                        "\n  **Valid values for `{}`**: {}",
                        parameter.name, values
                    ));
                }
            }
        }
    }

    if let SkillBody::Script(script) = &skill.body {
        let operations = summarize_script(script);
        if !operations.is_empty() {
            lines.push(format!("\n**Operations**: {}", operations));
        }
    }

    if !skill.examples.is_empty() {
        lines.push("\n**Examples**:".to_string());
        for example in skill.examples.iter().take(3) {
            match example {
                UsageExample::Line(text) => lines.push(format!("- `{}`", text)),
                UsageExample::Hint {
                    command: Some(command),
                    ..
                } => lines.push(format!("- `{}`", command)),
                UsageExample::Hint {
                    command: None,
                    description: Some(description),
                } => lines.push(format!("- {}", description)),
                UsageExample::Hint {
                    command: None,
                    description: None,
                } => {}
            }
        }
    }

    lines.join("\n")
}

/// Render the full skill block for an agent prompt.
///
/// An empty slice renders to an empty string, never a lonely heading.
pub fn render_all(skills: &[SkillDefinition]) -> String {
    if skills.is_empty() {
        return String::new();
    }

    let mut sections: Vec<String> = vec![
        "## Available Skills".to_string(),
        String::new(),
        "The following skills are available. Use them as slash commands.".to_string(),
        String::new(),
    ];
    for skill in skills {
        sections.push(render(skill));
        sections.push(String::new());
    }
    sections.join("\n")
}

/// First paragraph of a description, flattened to one line.
fn first_paragraph(description: &str) -> String {
    description
        .trim()
        .split("\n\n")
        .next()
        .unwrap_or("")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Best-effort summary of what a script appears to do.
///
/// Extracted scripts are shell with embedded interpreter snippets more often
/// than not, so the scan covers both. Purely informational; an empty result
/// suppresses the Operations line.
fn summarize_script(script: &str) -> String {
    let lower = script.to_lowercase();
    let mut operations: Vec<&str> = Vec::new();

    if lower.contains("sqlite3") {
        if lower.contains("insert") {
            operations.push("SQLite INSERT");
        } else if lower.contains("update") {
            operations.push("SQLite UPDATE");
        } else if lower.contains("select") {
            operations.push("SQLite SELECT");
        } else {
            operations.push("SQLite operations");
        }
    }
    if lower.contains("json.dump") || (lower.contains("open(") && lower.contains("'w'")) {
        operations.push("File write");
    }
    if lower.contains("json.load") || (lower.contains("open(") && lower.contains("'r'")) {
        operations.push("File read");
    }
    if lower.contains("subprocess") || lower.contains("os.system") {
        operations.push("Shell execution");
    }
    if lower.contains("http") || lower.contains("requests.") {
        operations.push("HTTP request");
    }
    if lower.contains("git ") {
        operations.push("Git operations");
    }

    operations.join(", ")
}
