use chrono::{DateTime, Utc};
use diesel::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::models::NotificationType;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(\s*([^()]+?)\s*\)\)").expect("placeholder pattern is valid"));

/// One version of a service template.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Template {
    pub id: Uuid,
    pub version: i32,
    pub service_id: Uuid,
    pub name: String,
    pub template_type: NotificationType,
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Template output ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: Option<String>,
    pub body: String,
    pub html_body: Option<String>,
}

impl Template {
    /// Replaces `((name))` placeholders; unknown names are left as written.
    pub fn render(&self, personalisation: &HashMap<String, String>) -> RenderedTemplate {
        let body = substitute(&self.content, personalisation);
        let subject = self
            .subject
            .as_deref()
            .map(|s| substitute(s, personalisation));
        let html_body = match self.template_type {
            NotificationType::Email => Some(to_html(&body)),
            NotificationType::Sms => None,
        };
        RenderedTemplate {
            subject,
            body,
            html_body,
        }
    }
}

fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn to_html(body: &str) -> String {
    let paragraphs: Vec<String> = body
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p.trim()).replace('\n', "<br>")))
        .collect();
    paragraphs.join("\n")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
