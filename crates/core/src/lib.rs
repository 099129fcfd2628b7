//! Tienda Core - Shared types library.
//!
//! This crate provides the types every Tienda component agrees on:
//! - `access` - Session store, access policy and authentication flow
//! - `cli` - Command-line front end driving the access library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no timers.
//! The access policy lives next to the session store in `tienda-access`, but
//! every value it reasons about is defined here.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, email, roles, identity snapshots, destinations and stores

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
