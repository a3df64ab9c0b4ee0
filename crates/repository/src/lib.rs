//! # Repository
//!
//! `ResourceFetcher` implementations.
//!
//! - [`HttpRepositoryClient`] talks to a live repository over HTTP
//!   (JSON-LD descriptions, `fcr:fixity` reports)
//! - [`MockRepository`] serves canned descriptions for tests and dry runs

mod client;
mod jsonld;
mod mock;

pub use client::HttpRepositoryClient;
pub use mock::MockRepository;
