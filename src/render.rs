use std::collections::HashMap;
use std::sync::Arc;

use crate::comments::CommentRecord;
use crate::error::Result;

/// Produces the markup stored on Insert entries. The change log treats the
/// output as opaque text; only the client interprets it.
pub trait CommentRenderer: Send + Sync {
    fn render(&self, comment: &CommentRecord) -> Result<String>;
}

/// Default renderer: one list item per comment, carrying the ids the client
/// script needs for placement and nesting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListItemRenderer;

impl CommentRenderer for ListItemRenderer {
    fn render(&self, comment: &CommentRecord) -> Result<String> {
        Ok(format!(
            "<li id=\"comment-{}\" class=\"comment\" data-parent=\"{}\"><cite>{}</cite><p>{}</p></li>",
            comment.id,
            comment.parent_id,
            escape_html(&comment.author),
            escape_html(&comment.body),
        ))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Theme name to renderer lookup with an explicit default. Hosts whose
/// themes need bespoke comment markup register here; anything unrecognized
/// renders with the default.
pub struct RendererTable {
    by_theme: HashMap<String, Arc<dyn CommentRenderer>>,
    default: Arc<dyn CommentRenderer>,
}

impl RendererTable {
    pub fn new(default: Arc<dyn CommentRenderer>) -> Self {
        Self {
            by_theme: HashMap::new(),
            default,
        }
    }

    pub fn register(&mut self, theme: &str, renderer: Arc<dyn CommentRenderer>) {
        self.by_theme.insert(theme.to_string(), renderer);
    }

    pub fn lookup(&self, theme: &str) -> Arc<dyn CommentRenderer> {
        self.by_theme
            .get(theme)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::new(Arc::new(ListItemRenderer))
    }
}
