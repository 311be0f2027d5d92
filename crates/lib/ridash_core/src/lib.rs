//! # ridash_core
//!
//! Core domain logic for Ridash: credential checks, token issuance and
//! rotation, the OAuth linking handshake, document permission resolution,
//! and the client for the remote document manager.

pub mod auth;
pub mod docmanager;
pub mod docs;
pub mod id;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
