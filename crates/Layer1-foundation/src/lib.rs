//! # trellis-foundation
//!
//! Foundation layer for Trellis:
//! - Error: 중앙 에러 타입 (로드/라이프사이클/디스패치 분류 포함)
//! - Config: 런타임 설정 (RuntimeConfig, DispatchConfig)
//! - Storage: JsonStore (설정 및 플러그인 전용 설정 저장)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  trellis-cli (운영자 인터페이스)                          │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  trellis-core (플러그인 런타임)                           │
//! │   ├── Lifecycle Controller                              │
//! │   ├── Capability Registry                               │
//! │   └── Event Dispatcher                                  │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  trellis-foundation (Error / Config / Storage)          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{DispatchConfig, MergePolicy, RuntimeConfig, RUNTIME_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
