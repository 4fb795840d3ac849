//! View-side data: derived values and the state the screen renders.
//!
//! ## Submodules
//!
//! - [`model`]: values produced by the pipelines ([`RateSample`], [`Annotation`])
//! - [`chart`]: the rate series and marker set ([`RateChart`])
//! - [`dashboard`]: chart plus ticker text, the sink the UI queue applies to
//! - [`duration`]: parsing and formatting of duration strings (e.g., "5s", "200ms")
//!
//! ## Data Flow
//!
//! ```text
//! UiUpdate (from the pipelines)
//!        │
//!        ▼
//! UiUpdate::apply(&mut Dashboard)
//!        │
//!        ├──▶ RateChart::append_value / add_annotation + redraw
//!        │
//!        └──▶ Dashboard::set_text (ticker)
//! ```

pub mod chart;
pub mod dashboard;
pub mod duration;
pub mod model;

pub use chart::RateChart;
pub use dashboard::Dashboard;
pub use model::{Annotation, AnnotationStyle, RateSample, Rgba};
