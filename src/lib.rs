// src/lib.rs

//! Rotations review backend library

pub mod api;
pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod services;
pub mod sitemap;
pub mod storage;
pub mod utils;
