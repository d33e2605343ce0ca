/// Shared building blocks for the Relay proxy: error taxonomy, wire models,
/// the render/archive correlation table and archive bundle extraction.
pub mod correlation;
pub mod errors;
pub mod extract;
pub mod models;
