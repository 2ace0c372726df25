pub mod api;
pub mod error;
pub mod form;
pub mod page;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{ClientOptions, GenerateApi, GenerateBackend};
pub use error::{ApiError, ApiResult};
pub use form::{QrForm, ResponseOrdering, SubmitOutcome, Submission};
pub use page::{FormElements, SubmitEvent};
pub use types::*;
