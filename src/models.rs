use serde::{Deserialize, Serialize};

/// Messages the content side sends to the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "EXPLAIN_TEXT")]
    ExplainText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    /// Anything else on the channel. The background ignores it.
    #[serde(other)]
    Unknown,
}

/// Body of `POST /explain`. `context` goes out as `null` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainRequest {
    pub text: String,
    pub context: Option<String>,
}

/// Reply from the background, and the success body of the explain service.
///
/// `explanation` is optional because a well-formed body may still lack it;
/// the content side decides what to show in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainResponse {
    #[serde(default)]
    pub explanation: Option<String>,
}

impl ExplainResponse {
    pub fn new(explanation: impl Into<String>) -> Self {
        Self {
            explanation: Some(explanation.into()),
        }
    }

    /// The explanation, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.explanation.as_deref().filter(|s| !s.is_empty())
    }
}

/// Axis-aligned rectangle. Anchors are viewport-relative, tooltip bounds
/// are page-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Current scroll offset of the page, the `scrollX`/`scrollY` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scroll {
    pub x: i32,
    pub y: i32,
}
