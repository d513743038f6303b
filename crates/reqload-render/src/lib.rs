//! Rendering for reqload summaries.
//!
//! Two outputs are produced from one [`SummaryData`](reqload_types::SummaryData):
//! a self-contained HTML report and the console text summary.

mod format;
mod html;
mod text;

pub use format::{format_duration_ms, format_metric_number, format_number, format_pct, metric_cells};
pub use html::render_html;
pub use text::{TextSummaryOptions, text_summary};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid report template: {0}")]
    Template(Box<handlebars::TemplateError>),

    #[error("render report: {0}")]
    Render(Box<handlebars::RenderError>),
}
