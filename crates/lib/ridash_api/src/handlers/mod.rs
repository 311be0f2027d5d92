//! Request handlers.

pub mod auth;
pub mod documents;
pub mod folders;
pub mod oauth;
pub mod shares;
pub mod socket;
pub mod teams;
