//! Domain layer for Sealed Guardian
//!
//! CDD Principle: Domain Model - Pure business logic for inheritance-scope enforcement
//! - Contains the marker identity, classification outcomes and rule descriptors
//! - Independent of infrastructure concerns like parsing, file systems, or terminals
//! - Expresses the ubiquitous language of closed, open and violating classes

pub mod classification;
pub mod marker;
pub mod violations;

// Re-export main domain types for convenience
pub use classification::*;
pub use marker::*;
pub use violations::*;
