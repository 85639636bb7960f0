//! Lifecycle - 플러그인 상태 기계
//!
//! ```text
//! UNLOADED -> LOADED          (on_load)
//! LOADED -> ACTIVE            (on_activate)
//! ACTIVE -> DEACTIVATED       (on_deactivate)
//! DEACTIVATED -> ACTIVE       (on_activate, 재활성화)
//! DEACTIVATED -> UNINSTALLED  (on_uninstall)
//! ```

use serde::{Deserialize, Serialize};

/// 플러그인 라이프사이클 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
    Unloaded,
    Loaded,
    Active,
    Deactivated,
    Uninstalled,
}

/// 상태 전이 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Load,
    Activate,
    Deactivate,
    Uninstall,
}

impl Transition {
    /// 성공 시 도달하는 상태
    pub fn target(self) -> PluginState {
        match self {
            Self::Load => PluginState::Loaded,
            Self::Activate => PluginState::Active,
            Self::Deactivate => PluginState::Deactivated,
            Self::Uninstall => PluginState::Uninstalled,
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Activate => write!(f, "activate"),
            Self::Deactivate => write!(f, "deactivate"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

impl PluginState {
    /// 콜백을 호출해야 하는 전이인지
    pub fn allows(self, transition: Transition) -> bool {
        matches!(
            (self, transition),
            (Self::Unloaded, Transition::Load)
                | (Self::Loaded, Transition::Activate)
                | (Self::Deactivated, Transition::Activate)
                | (Self::Active, Transition::Deactivate)
                | (Self::Deactivated, Transition::Uninstall)
        )
    }

    /// 이미 목표 상태라서 no-op인 전이인지
    pub fn is_noop(self, transition: Transition) -> bool {
        matches!(
            (self, transition),
            (Self::Active, Transition::Activate) | (Self::Deactivated, Transition::Deactivate)
        )
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loaded => write!(f, "loaded"),
            Self::Active => write!(f, "active"),
            Self::Deactivated => write!(f, "deactivated"),
            Self::Uninstalled => write!(f, "uninstalled"),
        }
    }
}
