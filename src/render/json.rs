//! JSON renderer: structured output for tooling integration.
//!
//! Serializes the topic model directly, plus the derived usage and alias
//! lines the Rd renderer would emit.

use crate::model::Topic;
use crate::render::{rd, usage_lines, Renderer};
use serde::Serialize;

pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonTopic<'a> {
    #[serde(flatten)]
    topic: &'a Topic,
    rendered_usage: Vec<String>,
    rendered_aliases: Vec<String>,
}

impl Renderer for JsonRenderer {
    fn render(&self, topic: &Topic) -> String {
        let view = JsonTopic {
            topic,
            rendered_usage: usage_lines(topic),
            rendered_aliases: rd::aliases(topic),
        };
        // Every field is a string, bool or list; serialization cannot fail.
        let mut out = serde_json::to_string_pretty(&view).unwrap_or_default();
        out.push('\n');
        out
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}
