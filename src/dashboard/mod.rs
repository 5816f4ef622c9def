// =============================================================================
// Dashboard: render pipeline and its presentation pieces
// =============================================================================

pub mod chart;
pub mod metric;
pub mod page;
pub mod render;

pub use render::{render_dashboard, RenderOutcome};
