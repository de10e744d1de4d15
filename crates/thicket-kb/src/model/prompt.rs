//! Prompt templates for generated attributes

use std::fmt;

use crate::data::{CoreError, Result};
use crate::entity::Entity;

/// Prompt text with `{attribute}` placeholders filled from the entity being
/// generated for. `{{` and `}}` produce literal braces.
#[derive(Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Attribute names referenced by the template, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments()
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Fill every placeholder from `entity`.
    pub fn render(&self, entity: &Entity) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = entity.get(name)?.ok_or_else(|| {
                        CoreError::Generation(format!(
                            "prompt placeholder '{}' of {} {} has no value",
                            name,
                            entity.model().table_name(),
                            entity.id()
                        ))
                    })?;
                    out.push_str(&value.document_text().unwrap_or_default());
                }
            }
        }
        Ok(out)
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        let text = self.template.as_str();
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;
        let bytes = text.as_bytes();

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    segments.push(Segment::Literal(&text[literal_start..=i]));
                    i += 2;
                    literal_start = i;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    segments.push(Segment::Literal(&text[literal_start..=i]));
                    i += 2;
                    literal_start = i;
                }
                b'{' => match text[i + 1..].find('}') {
                    Some(offset) => {
                        let name = &text[i + 1..i + 1 + offset];
                        if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                            segments.push(Segment::Literal(&text[literal_start..i]));
                            segments.push(Segment::Placeholder(name));
                            i += offset + 2;
                            literal_start = i;
                        } else {
                            i += 1;
                        }
                    }
                    None => i += 1,
                },
                _ => i += 1,
            }
        }
        segments.push(Segment::Literal(&text[literal_start..]));
        segments.retain(|segment| !matches!(segment, Segment::Literal("")));
        segments
    }
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PromptTemplate").field(&self.template).finish()
    }
}

impl From<&str> for PromptTemplate {
    fn from(s: &str) -> Self {
        PromptTemplate::new(s)
    }
}
