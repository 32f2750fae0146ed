// src/handlers/mod.rs
pub mod oauth;
pub mod status;
pub mod video;
