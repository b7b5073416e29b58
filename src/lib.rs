// src/lib.rs

//! snapwatch: snapshot diff and notify engine with a keyword filter DSL.

pub mod collector;
pub mod diff;
pub mod error;
pub mod keyword;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod services;
pub mod storage;
pub mod utils;
