//! # IO Module
//!
//! The interface layer between HTTP clients and the domain services. It owns
//! request parsing, bearer-token authentication, role checks, the mapping of
//! domain models to the `shared` DTOs, and the translation of domain errors
//! into HTTP status codes with a uniform JSON error body.

pub mod rest;
