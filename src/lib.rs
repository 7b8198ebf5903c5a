// src/lib.rs

//! Diachron: monthly literature snapshots from dated dumps

pub mod error;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod utils;
