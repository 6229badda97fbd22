pub mod verifier;

pub use verifier::{merge_evidence, VerificationReport};
