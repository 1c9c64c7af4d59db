//! Wire models for the local device agent API

pub mod models;
