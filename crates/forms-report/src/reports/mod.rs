//! Admin reporting over submitted compliance forms: filtering, gender
//! aggregation, previews and CSV exports.

pub mod error;
pub mod export;
pub mod forms;
pub mod registry;
pub mod router;

pub use error::{ReportError, ValidationError};
pub use registry::{ColumnDef, ReportDefinition, ReportRegistry, ReportType};
pub use router::{forms_router, ALLOWED_COLUMNS_HEADER};
