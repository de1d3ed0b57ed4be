//! Collaborator sets for concrete services.

pub mod search;
