//! Authentication building blocks.
//!
//! Identity lives with the external provider; this module only validates
//! the HS256 tokens it issues and exposes the claims to handlers.

pub mod jwt;
