use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStyle {
    Bold,
    Italic,
    Monospace,
    Strikethrough,
    Link,
}

impl SpanStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Monospace => "monospace",
            Self::Strikethrough => "strikethrough",
            Self::Link => "link",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bold" => Some(Self::Bold),
            "italic" => Some(Self::Italic),
            "monospace" => Some(Self::Monospace),
            "strikethrough" => Some(Self::Strikethrough),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// Style annotation over `start..end`, in characters of the note body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub style: SpanStyle,
}

impl Span {
    pub fn new(start: usize, end: usize, style: SpanStyle) -> Self {
        Self { start, end, style }
    }
}
