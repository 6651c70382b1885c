//! Template renderer - personalizes follow-up and bulk content
//!
//! Supported variables: `{{recipient_name}}`, `{{original_subject}}`,
//! `{{original_message}}`, plus arbitrary row variables when the
//! message originated from an imported data set. Unresolved
//! placeholders are stripped from the output.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Variables available to one render
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub recipient_name: String,
    pub original_subject: String,
    pub original_message: String,
    pub row_vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Context for a bulk send driven by an imported row
    pub fn from_row(recipient: &str, row: &HashMap<String, String>) -> Self {
        let recipient_name = row
            .get("name")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| recipient_name_from(recipient));

        Self {
            recipient_name,
            row_vars: row.clone(),
            ..Default::default()
        }
    }
}

/// Convert a stored JSON row object into string variables
pub fn row_vars_from(value: Option<&Value>) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    if let Some(Value::Object(map)) = value {
        for (key, value) in map {
            let value_str = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => value.to_string(),
            };
            vars.insert(key.clone(), value_str);
        }
    }
    vars
}

/// Derive a display name from a recipient field: the display part of
/// `Name <addr>`, otherwise the local part of the address
pub fn recipient_name_from(to: &str) -> String {
    let first = to.split(',').next().unwrap_or("").trim();

    if let Some(idx) = first.find('<') {
        let name = first[..idx].trim().trim_matches('"').trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let addr = first.trim_matches(|c| c == '<' || c == '>');
    addr.split('@').next().unwrap_or("").to_string()
}

/// Template renderer
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Create a new template renderer
    pub fn new() -> Self {
        Self
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, ctx: &TemplateContext) -> String {
        let mut result = template.to_string();

        result = result.replace("{{recipient_name}}", &ctx.recipient_name);
        result = result.replace("{{original_subject}}", &ctx.original_subject);
        result = result.replace("{{original_message}}", &ctx.original_message);

        for (key, value) in &ctx.row_vars {
            let placeholder = format!("{{{{{}}}}}", key);
            result = result.replace(&placeholder, value);
        }

        self.remove_unused_placeholders(&result)
    }

    /// Remove unused placeholder variables
    fn remove_unused_placeholders(&self, content: &str) -> String {
        let re = Regex::new(r"\{\{[^}]+\}\}").unwrap();
        re.replace_all(content, "").to_string()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> TemplateContext {
        TemplateContext {
            recipient_name: "Ada".to_string(),
            original_subject: "Project kickoff".to_string(),
            original_message: "Here is the plan.".to_string(),
            row_vars: HashMap::from([
                ("company".to_string(), "Acme Corp".to_string()),
                ("plan".to_string(), "premium".to_string()),
            ]),
        }
    }

    #[test]
    fn test_render_followup_variables() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render(
            "Hi {{recipient_name}}, following up on \"{{original_subject}}\"",
            &ctx(),
        );
        assert_eq!(result, "Hi Ada, following up on \"Project kickoff\"");
    }

    #[test]
    fn test_render_row_variables() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("Welcome {{recipient_name}} from {{company}}!", &ctx());
        assert_eq!(result, "Welcome Ada from Acme Corp!");
    }

    #[test]
    fn test_render_strips_unused_placeholders() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("Hello {{recipient_name}}, {{unknown_var}} bye", &ctx());
        assert_eq!(result, "Hello Ada,  bye");
    }

    #[test]
    fn test_recipient_name_variants() {
        assert_eq!(recipient_name_from("Ada Lovelace <ada@x.com>"), "Ada Lovelace");
        assert_eq!(recipient_name_from("\"Lovelace, Ada\" <ada@x.com>"), "Lovelace, Ada");
        assert_eq!(recipient_name_from("ada@x.com"), "ada");
        assert_eq!(recipient_name_from("ada@x.com, ben@y.com"), "ada");
    }

    #[test]
    fn test_row_vars_from_json() {
        let value = serde_json::json!({ "name": "Ada", "seats": 4, "active": true });
        let vars = row_vars_from(Some(&value));
        assert_eq!(vars.get("name").unwrap(), "Ada");
        assert_eq!(vars.get("seats").unwrap(), "4");
        assert_eq!(vars.get("active").unwrap(), "true");
        assert!(row_vars_from(None).is_empty());
    }

    #[test]
    fn test_from_row_prefers_name_column() {
        let row = HashMap::from([
            ("email".to_string(), "ada@x.com".to_string()),
            ("name".to_string(), "Ada".to_string()),
        ]);
        assert_eq!(TemplateContext::from_row("ada@x.com", &row).recipient_name, "Ada");

        let row = HashMap::from([("email".to_string(), "ben@y.com".to_string())]);
        assert_eq!(TemplateContext::from_row("ben@y.com", &row).recipient_name, "ben");
    }
}
