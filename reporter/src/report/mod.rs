//! Turning the AI's free-form reply into a validated [`Report`](crate::types::Report).

pub mod extract;
pub mod normalize;

pub use extract::extract_json;
pub use normalize::normalize;
