pub mod access;
pub mod conflict;
pub mod pagination;
pub mod report;
pub mod scheduling;
pub mod spreadsheet;

pub use access::{Caller, Permission, Role};
pub use conflict::{ConflictError, ConflictValidator};
pub use report::{ReportBundle, ReportRange};
pub use scheduling::SchedulingService;
