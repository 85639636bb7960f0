//! Execution Domain - 플러그인 하나의 격리된 네임스페이스
//!
//! 패키지의 엔트리 포인트를 해석하고 인스턴스화한 뒤, 플러그인 전용
//! 서비스 컨테이너와 컨텍스트를 붙인다. 다른 플러그인의 도메인에는
//! Capability Registry를 통해서만 닿을 수 있다.

use super::context::PluginContext;
use super::package::{EntryPointTable, PluginPackage};
use super::services::ServiceContainer;
use super::traits::Plugin;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use trellis_foundation::{Error, Result};

/// 로드된 실행 도메인
pub struct ExecutionDomain {
    plugin: Arc<dyn Plugin>,
    context: Arc<PluginContext>,
    assets_dir: Option<PathBuf>,
    /// 로드 성공 후 만들 전용 디렉토리 (data, config)
    private_dirs: [PathBuf; 2],
}

impl ExecutionDomain {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn context(&self) -> &Arc<PluginContext> {
        &self.context
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }

    /// 전용 데이터/설정 디렉토리 생성 (멱등)
    ///
    /// `on_load`가 성공한 뒤에만 호출된다.
    pub fn allocate(&self) -> Result<()> {
        for dir in &self.private_dirs {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::load(
                    self.plugin.id(),
                    format!("cannot create {}: {}", dir.display(), e),
                )
            })?;
        }
        Ok(())
    }
}

/// 실행 도메인 로더
pub struct DomainLoader {
    entry_points: EntryPointTable,
    data_root: PathBuf,
    platform: Arc<ServiceContainer>,
}

impl DomainLoader {
    pub fn new(
        entry_points: EntryPointTable,
        data_root: impl Into<PathBuf>,
        platform: Arc<ServiceContainer>,
    ) -> Self {
        Self {
            entry_points,
            data_root: data_root.into(),
            platform,
        }
    }

    pub fn entry_points(&self) -> &EntryPointTable {
        &self.entry_points
    }

    /// 패키지를 새 도메인에 로드
    ///
    /// 디스크에는 아무 것도 만들지 않는다. 디렉토리는 [`ExecutionDomain::allocate`]가 만든다.
    pub fn load(&self, package: &PluginPackage) -> Result<ExecutionDomain> {
        let descriptor = package.descriptor();
        descriptor
            .validate()
            .map_err(|e| Error::load(&descriptor.id, e.to_string()))?;

        let factory = self.entry_points.resolve(&descriptor.entry_point).ok_or_else(|| {
            Error::load(
                &descriptor.id,
                format!("entry point '{}' not found", descriptor.entry_point),
            )
        })?;

        let plugin = factory();
        if plugin.id() != descriptor.id {
            return Err(Error::load(
                &descriptor.id,
                format!(
                    "entry point '{}' implements plugin '{}'",
                    descriptor.entry_point,
                    plugin.id()
                ),
            ));
        }
        if plugin.version() != descriptor.version {
            warn!(
                "Plugin {} reports version {} but descriptor declares {}",
                descriptor.id,
                plugin.version(),
                descriptor.version
            );
        }

        let base = self.data_root.join(&descriptor.id);
        let data_dir = base.join("data");
        let config_dir = base.join("config");

        let context = Arc::new(PluginContext::new(
            &descriptor.id,
            data_dir.clone(),
            config_dir.clone(),
            Arc::clone(&self.platform),
            Arc::new(ServiceContainer::new()),
        ));

        debug!(
            "Loaded execution domain for {} from entry point {}",
            descriptor.id, descriptor.entry_point
        );

        Ok(ExecutionDomain {
            plugin,
            context,
            assets_dir: package.assets_dir().map(Path::to_path_buf),
            private_dirs: [data_dir, config_dir],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::descriptor::{PluginDescriptor, PluginVersion};
    use async_trait::async_trait;

    struct Gallery;

    #[async_trait]
    impl Plugin for Gallery {
        fn id(&self) -> &str {
            "acme.gallery"
        }
        fn version(&self) -> PluginVersion {
            PluginVersion::new(1, 0, 0)
        }
        fn name(&self) -> &str {
            "Gallery"
        }
        async fn on_activate(&self, _ctx: &PluginContext) -> Result<()> {
            Ok(())
        }
    }

    fn loader(root: &Path) -> DomainLoader {
        let entry_points =
            EntryPointTable::new().with("acme.gallery", || Arc::new(Gallery) as Arc<dyn Plugin>);
        DomainLoader::new(entry_points, root, Arc::new(ServiceContainer::new()))
    }

    #[test]
    fn test_load_allocates_private_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let package = PluginPackage::new(PluginDescriptor::new("acme.gallery", "Gallery"));

        let domain = loader(dir.path()).load(&package).unwrap();
        assert_eq!(domain.plugin().id(), "acme.gallery");
        assert!(!dir.path().join("acme.gallery").exists());

        domain.allocate().unwrap();
        assert!(dir.path().join("acme.gallery/data").is_dir());
        assert!(dir.path().join("acme.gallery/config").is_dir());
        assert_eq!(
            domain.context().data_dir(),
            dir.path().join("acme.gallery/data")
        );
    }

    #[test]
    fn test_missing_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let package = PluginPackage::new(
            PluginDescriptor::new("acme.gallery", "Gallery").with_entry_point("acme.gallery.v9"),
        );

        let err = loader(dir.path()).load(&package).err().unwrap();
        assert!(matches!(err, Error::Load { .. }));
        assert!(err.to_string().contains("acme.gallery.v9"));
    }

    #[test]
    fn test_id_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let package = PluginPackage::new(
            PluginDescriptor::new("acme.other", "Other").with_entry_point("acme.gallery"),
        );

        let err = loader(dir.path()).load(&package).err().unwrap();
        assert!(matches!(err, Error::Load { ref plugin, .. } if plugin == "acme.other"));
        assert!(!dir.path().join("acme.other").exists());
    }
}
