//! API request and response data models.
//!
//! These structures define the public API contract, kept distinct from the
//! directory's [`User`](crate::directory::User) record so the wire shape and
//! the storage shape can evolve independently. All models are annotated with
//! `utoipa` for the generated API docs.

pub mod auth;
