//! Question and review-page templating.
//!
//! Task templates are HTML files rendered with a single parameter,
//! `input`: the JSON-serialized batch of work items shown to a worker.
//! The rendered HTML is wrapped in the marketplace's `HTMLQuestion` XML
//! envelope before launch. Review pages reuse the same template set under
//! the `review/` prefix.
//!
//! # Example
//!
//! ```ignore
//! use crowdforge::template::TaskTemplates;
//!
//! let templates = TaskTemplates::from_dir("templates")?;
//! let html = templates.render_question("tasks/write_caption.html", &items)?;
//! let question = crowdforge::template::html_question(&html, 9000);
//! ```

use std::path::Path;

use serde_json::Value;
use tera::{Context, Tera};

use crate::error::TemplateError;

/// XML namespace of the marketplace's HTML question schema.
const HTML_QUESTION_XMLNS: &str =
    "http://crowd-marketplace.com/schemas/2011-11-11/HTMLQuestion.xsd";

/// Wrap rendered task HTML in the marketplace's `HTMLQuestion` envelope.
pub fn html_question(html: &str, frame_height: u32) -> String {
    format!(
        "<HTMLQuestion xmlns=\"{HTML_QUESTION_XMLNS}\">\
         <HTMLContent><![CDATA[{html}]]></HTMLContent>\
         <FrameHeight>{frame_height}</FrameHeight>\
         </HTMLQuestion>"
    )
}

/// A directory of task and review templates.
pub struct TaskTemplates {
    tera: Tera,
}

impl TaskTemplates {
    /// Load every `.html` template under `dir`, recursively.
    ///
    /// Template names are paths relative to `dir`, e.g.
    /// `tasks/write_caption.html` or `review/home.html`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let glob = format!("{}/**/*.html", dir.display());
        let tera = Tera::new(&glob)
            .map_err(|_| TemplateError::DirectoryLoadFailed(dir.display().to_string()))?;
        Ok(Self { tera })
    }

    /// Names of all loaded templates.
    pub fn names(&self) -> Vec<&str> {
        self.tera.get_template_names().collect()
    }

    /// Render a task template with the given work items as its `input`.
    ///
    /// `input` is passed to the template as a JSON string, matching what
    /// the in-page JavaScript expects to `JSON.parse`.
    pub fn render_question(&self, name: &str, items: &Value) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert("input", &serde_json::to_string(items)?);
        Ok(self.tera.render(name, &context)?)
    }

    /// Render a task template with an empty input, for local preview.
    pub fn render_preview(&self, name: &str) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert("input", "");
        Ok(self.tera.render(name, &context)?)
    }

    /// Render an arbitrary template with a prebuilt context (review pages).
    pub fn render_with_context(
        &self,
        name: &str,
        context: &Context,
    ) -> Result<String, TemplateError> {
        Ok(self.tera.render(name, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_html_question_envelope() {
        let question = html_question("<p>hello</p>", 9000);
        assert!(question.starts_with("<HTMLQuestion xmlns=\""));
        assert!(question.contains("<HTMLContent><![CDATA[<p>hello</p>]]></HTMLContent>"));
        assert!(question.contains("<FrameHeight>9000</FrameHeight>"));
        assert!(question.ends_with("</HTMLQuestion>"));
    }

    #[test]
    fn test_render_question_serializes_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tasks = dir.path().join("tasks");
        fs::create_dir_all(&tasks).expect("mkdir");
        fs::write(
            tasks.join("echo.html"),
            "<script>var input = JSON.parse('{{ input | safe }}' || '[]');</script>",
        )
        .expect("write template");

        let templates = TaskTemplates::from_dir(dir.path()).expect("load templates");
        let items = serde_json::json!([{"url": "http://example.com/1.jpg"}]);
        let html = templates
            .render_question("tasks/echo.html", &items)
            .expect("render");
        assert!(html.contains("http://example.com/1.jpg"));
    }

    #[test]
    fn test_render_preview_uses_empty_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("plain.html"), "input=[{{ input }}]").expect("write");

        let templates = TaskTemplates::from_dir(dir.path()).expect("load templates");
        let html = templates.render_preview("plain.html").expect("render");
        assert_eq!(html, "input=[]");
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let templates = TaskTemplates::from_dir(dir.path()).expect("load templates");
        let result = templates.render_preview("nope.html");
        assert!(matches!(result, Err(TemplateError::Tera(_))));
    }
}
