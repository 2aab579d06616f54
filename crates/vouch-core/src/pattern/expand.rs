//! Match results and expansion templates

use super::Spans;
use crate::errors::{Result, TrustError};
use crate::name::{Component, Name};
use std::fmt;

/// Capture groups of one successful match
///
/// Produced per call by [`NameRegex::captures`](super::NameRegex::captures);
/// nothing is retained on the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexMatch {
    name: Name,
    spans: Spans,
}

impl RegexMatch {
    pub(crate) fn new(name: Name, spans: Spans) -> Self {
        Self { name, spans }
    }

    /// Components captured by group `index` (0 is the whole match).
    /// `None` if the group does not exist or did not participate.
    pub fn group(&self, index: usize) -> Option<Name> {
        let (start, end) = (*self.spans.get(index)?)?;
        Some(self.name.sub_name(start, end - start))
    }

    /// Number of capture groups, excluding group 0
    pub fn group_count(&self) -> usize {
        self.spans.len().saturating_sub(1)
    }

    /// Build a derived name from `template`
    pub fn expand(&self, template: &ExpandTemplate) -> Result<Name> {
        let mut components = Vec::new();
        for token in &template.tokens {
            match token {
                Token::Backref(index) => {
                    if *index > self.group_count() {
                        return Err(TrustError::invalid_pattern(format!(
                            "back-reference \\{index} exceeds {} groups",
                            self.group_count()
                        )));
                    }
                    if let Some(group) = self.group(*index) {
                        components.extend(group.iter().cloned());
                    }
                }
                Token::Literal(component) => components.push(component.clone()),
            }
        }
        Ok(Name::from_components(components))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Backref(usize),
    Literal(Component),
}

/// Expansion template such as `\1\2` or `<a><b>\1`
#[derive(Clone, PartialEq, Eq)]
pub struct ExpandTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl ExpandTemplate {
    /// Parse a template made of `\N` back-references and `<component>` literals
    pub fn parse(template: &str) -> Result<Self> {
        let bytes = template.as_bytes();
        let mut tokens = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' => {
                    let digits = bytes[pos + 1..]
                        .iter()
                        .take_while(|b| b.is_ascii_digit())
                        .count();
                    if digits == 0 {
                        return Err(TrustError::invalid_pattern(format!(
                            "dangling `\\` in expansion `{template}`"
                        )));
                    }
                    let index = template[pos + 1..pos + 1 + digits]
                        .parse::<usize>()
                        .map_err(|e| TrustError::invalid_pattern(e.to_string()))?;
                    tokens.push(Token::Backref(index));
                    pos += 1 + digits;
                }
                b'<' => {
                    let end = template[pos..].find('>').ok_or_else(|| {
                        TrustError::invalid_pattern(format!("unterminated `<` in `{template}`"))
                    })? + pos;
                    let component = Component::from_uri(&template[pos + 1..end])?;
                    tokens.push(Token::Literal(component));
                    pos = end + 1;
                }
                c if c.is_ascii_whitespace() => pos += 1,
                c => {
                    return Err(TrustError::invalid_pattern(format!(
                        "unexpected `{}` in expansion `{template}`",
                        c as char
                    )))
                }
            }
        }
        Ok(Self {
            source: template.to_string(),
            tokens,
        })
    }

    /// Source text of the template
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for ExpandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExpandTemplate({})", self.source)
    }
}
