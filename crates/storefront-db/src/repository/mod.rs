//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                          │
//! │       │  db.catalog().list_active(Some("sci-fi"), 50)                  │
//! │       ▼                                                                 │
//! │  CatalogRepository ── SQL ──► SQLite                                   │
//! │                                                                         │
//! │  Pool-bound methods take `&self`. The few steps that must run inside   │
//! │  the checkout transaction are associated functions taking              │
//! │  `&mut SqliteConnection` instead.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Items, soft delete, stock
//! - [`cart::CartRepository`] - Per-user cart lines
//! - [`order::OrderRepository`] - Orders with line snapshots
//! - [`user::UserRepository`] - Accounts

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;
