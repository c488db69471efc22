//! API handlers

pub mod health;
