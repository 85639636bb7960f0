//! Config - 런타임 설정 관리
//!
//! - `runtime.rs` - RuntimeConfig 통합 설정 (디스커버리, 데이터 디렉토리, 디스패치)

mod runtime;

pub use runtime::{DispatchConfig, MergePolicy, RuntimeConfig, RUNTIME_CONFIG_FILE};
