//! Built-in Plugins
//!
//! 런타임과 함께 배포되는 기본 플러그인들

mod audit;
mod navigation;

pub use audit::{AuditPlugin, AUDIT_PLUGIN_ID};
pub use navigation::{NavigationPlugin, NAV_PLUGIN_ID};

use super::descriptor::PluginVersion;
use super::package::{EntryPointTable, PluginPackage};
use super::traits::Plugin;
use std::sync::Arc;

/// 내장 플러그인 버전
pub(crate) const BUILTIN_VERSION: PluginVersion = PluginVersion::new(0, 1, 0);

/// 내장 플러그인 엔트리 포인트
pub fn entry_points() -> EntryPointTable {
    EntryPointTable::new()
        .with(AUDIT_PLUGIN_ID, || Arc::new(AuditPlugin) as Arc<dyn Plugin>)
        .with(NAV_PLUGIN_ID, || Arc::new(NavigationPlugin) as Arc<dyn Plugin>)
}

/// 내장 플러그인 패키지 (디스크 위치 없음)
pub fn packages() -> Vec<PluginPackage> {
    vec![
        PluginPackage::new(AuditPlugin::descriptor()),
        PluginPackage::new(NavigationPlugin::descriptor()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_package_has_an_entry_point() {
        let table = entry_points();
        for package in packages() {
            package.descriptor().validate().unwrap();
            assert!(table.contains(&package.descriptor().entry_point));
        }
        assert_eq!(table.names(), vec![AUDIT_PLUGIN_ID, NAV_PLUGIN_ID]);
    }
}
