pub mod auth;
pub mod client;
pub mod deadline;
pub mod error;
pub mod extract;
mod retry;
pub mod session;

pub use client::{
    validate_landed_path, ClientSettings, FetchedPage, PaymentSubmission, ShippingSubmission,
    StorefrontClient,
};
pub use deadline::Deadline;
pub use error::{ExtractError, StorefrontError};
pub use extract::Page;
