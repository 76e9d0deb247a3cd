//! Rabit Core - Domain types and table view-state.
//!
//! This crate provides the types shared by every Rabit component:
//! - `server` - JSON API over brands, products and orders
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure state machines -
//! no I/O, no database access, no HTTP clients. Everything here can be
//! exercised in plain unit tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, statuses and field-error maps
//! - [`models`] - Users, brands, products, orders and their write payloads
//! - [`view`] - Facet filtering and the buffered-edit table controller

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;
pub mod view;

pub use types::*;
