//! Storage module for Trellis
//!
//! - `json`: JSON - 설정 및 플러그인 전용 설정 저장/로드

mod json;

pub use json::JsonStore;
