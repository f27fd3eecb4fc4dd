//! Checkout orchestration for the Bisleri storefront.
//!
//! Drives one water-jar order over the scraped storefront client: cart and
//! city reconciliation, address completion, the wallet total/balance guard
//! and a consent-gated re-login when the session is lost mid-order.

pub mod address;
pub mod cart;
pub mod city;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod reauth;
pub mod snapshot;

pub use error::CheckoutError;
pub use orchestrator::{CheckoutTimings, Orchestrator, OrderOutcome, OrderRequest};
pub use reauth::{ask_consent, Consent, CredentialRefresher, OtpRefresher, RefreshedSession};
pub use snapshot::{DebugSnapshots, SnapshotKind};
