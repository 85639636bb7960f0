//! Plugin traits - 핵심 플러그인 인터페이스

use super::context::PluginContext;
use super::descriptor::PluginVersion;
use async_trait::async_trait;
use trellis_foundation::Result;

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// 모든 Trellis 플러그인 엔트리 포인트는 이 트레이트를 구현해야 합니다.
/// 각 라이프사이클 콜백은 현재 `PluginContext`를 인자로 받으며,
/// 에러를 반환하면 해당 상태 전이는 중단됩니다.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 플러그인 ID (디스크립터 ID와 일치해야 함)
    fn id(&self) -> &str;

    /// 플러그인 버전
    fn version(&self) -> PluginVersion;

    /// 표시 이름
    fn name(&self) -> &str;

    /// 설명
    fn description(&self) -> &str {
        ""
    }

    /// 로드 시 호출 (UNLOADED -> LOADED)
    async fn on_load(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 활성화 시 호출 (LOADED/DEACTIVATED -> ACTIVE)
    ///
    /// 컴포넌트, 라우트, 이벤트 핸들러는 여기서 등록합니다.
    async fn on_activate(&self, ctx: &PluginContext) -> Result<()>;

    /// 비활성화 시 호출 (ACTIVE -> DEACTIVATED)
    ///
    /// 실패하더라도 등록된 기능은 컨트롤러가 제거합니다.
    async fn on_deactivate(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 제거 시 호출 (DEACTIVATED -> UNINSTALLED)
    ///
    /// 정리용 콜백일 뿐, 플러그인 데이터는 삭제되지 않습니다.
    async fn on_uninstall(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }
}
