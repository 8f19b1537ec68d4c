//! Postgres persistence for keeper registries, upkeep registrations and job errors.
//!
//! All tables live in the `keeper` schema. Queries are plain functions over a [`sqlx::PgPool`]
//! so that the owning store decides how connections are pooled.

pub mod keeper;
pub mod migrations;
