//! Plugin Descriptor - 패키지의 정적 식별 정보

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_foundation::{Error, Result};

/// 플러그인 버전
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PluginVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// 버전 문자열 파싱 (예: "1.2.3")
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        Some(Self {
            major: parts[0].parse().ok()?,
            minor: parts[1].parse().ok()?,
            patch: parts[2].parse().ok()?,
        })
    }

    /// 호환성 검사
    pub fn is_compatible_with(&self, other: &PluginVersion) -> bool {
        // 같은 메이저 버전이면 호환
        self.major == other.major
    }
}

impl std::fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for PluginVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl TryFrom<String> for PluginVersion {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid version '{}'", value))
    }
}

impl From<PluginVersion> for String {
    fn from(version: PluginVersion) -> Self {
        version.to_string()
    }
}

/// 플러그인 의존성
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDependency {
    /// 의존하는 플러그인 ID
    pub id: String,

    /// 최소 필요 버전
    #[serde(default = "min_version")]
    pub min_version: PluginVersion,

    /// 선택적 의존성 여부
    #[serde(default)]
    pub optional: bool,
}

impl PluginDependency {
    pub fn new(id: impl Into<String>, min_version: PluginVersion) -> Self {
        Self {
            id: id.into(),
            min_version,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// 주어진 버전이 이 의존성을 만족하는지
    pub fn is_satisfied_by(&self, version: &PluginVersion) -> bool {
        version.is_compatible_with(&self.min_version) && *version >= self.min_version
    }
}

fn min_version() -> PluginVersion {
    PluginVersion::new(0, 0, 0)
}

/// 플러그인 디스크립터 - 패키지의 불변 메타데이터
///
/// 디스커버리 시점에 생성되며 이후 변경되지 않는다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// 고유 플러그인 ID (예: "trellis.nav")
    pub id: String,

    /// 표시 이름
    pub name: String,

    /// 버전
    #[serde(default)]
    pub version: PluginVersion,

    /// 설명
    #[serde(default)]
    pub description: String,

    /// 작성자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// 엔트리 포인트 이름 (EntryPointTable 키)
    pub entry_point: String,

    /// 선언된 기능 목록
    #[serde(default)]
    pub provides: PluginProvides,

    /// 의존성 목록
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<PluginDependency>,

    /// 추가 메타데이터
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl PluginDescriptor {
    /// 새 디스크립터 생성 (엔트리 포인트는 ID와 동일)
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            entry_point: id.clone(),
            id,
            name: name.into(),
            version: PluginVersion::default(),
            description: String::new(),
            author: None,
            provides: PluginProvides::default(),
            dependencies: vec![],
            metadata: HashMap::new(),
        }
    }

    /// 빌더 패턴: 버전 설정
    pub fn with_version(mut self, version: PluginVersion) -> Self {
        self.version = version;
        self
    }

    /// 빌더 패턴: 설명 설정
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// 빌더 패턴: 작성자 설정
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// 빌더 패턴: 엔트리 포인트 설정
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// 빌더 패턴: 의존성 추가
    pub fn with_dependency(mut self, dep: PluginDependency) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// 빌더 패턴: 제공 기능 설정
    pub fn with_provides(mut self, provides: PluginProvides) -> Self {
        self.provides = provides;
        self
    }

    /// 빌더 패턴: 메타데이터 추가
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 디스크립터 유효성 검사
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidInput("plugin id is empty".to_string()));
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(Error::InvalidInput(format!(
                "plugin id '{}' contains invalid characters",
                self.id
            )));
        }
        if self.entry_point.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "plugin {} declares no entry point",
                self.id
            )));
        }
        Ok(())
    }
}

/// 플러그인이 선언한 기능 목록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginProvides {
    /// UI 컴포넌트 ID들
    #[serde(default)]
    pub components: Vec<String>,

    /// 컨트롤러 라우트 prefix들
    #[serde(default)]
    pub routes: Vec<String>,

    /// 처리하는 이벤트 타입들
    #[serde(default)]
    pub events: Vec<String>,
}

impl PluginProvides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn with_route(mut self, prefix: impl Into<String>) -> Self {
        self.routes.push(prefix.into());
        self
    }

    pub fn with_event(mut self, event_type: impl Into<String>) -> Self {
        self.events.push(event_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = PluginVersion::parse("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert!(PluginVersion::parse("1.2").is_none());
        assert!(PluginVersion::parse("a.b.c").is_none());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = PluginVersion::new(1, 0, 0);
        let v2 = PluginVersion::new(1, 2, 0);
        let v3 = PluginVersion::new(2, 0, 0);

        assert!(v1.is_compatible_with(&v2));
        assert!(!v1.is_compatible_with(&v3));
    }

    #[test]
    fn test_dependency_satisfaction() {
        let dep = PluginDependency::new("trellis.forms", PluginVersion::new(1, 2, 0));
        assert!(dep.is_satisfied_by(&PluginVersion::new(1, 3, 0)));
        assert!(!dep.is_satisfied_by(&PluginVersion::new(1, 1, 9)));
        assert!(!dep.is_satisfied_by(&PluginVersion::new(2, 0, 0)));
    }

    #[test]
    fn test_descriptor_from_json() {
        let json = r#"{
            "id": "acme.gallery",
            "name": "Gallery",
            "version": "2.1.0",
            "entryPoint": "acme.gallery.v2",
            "provides": { "components": ["Carousel"], "routes": ["/gallery"] },
            "dependencies": [{ "id": "trellis.nav", "optional": true }]
        }"#;

        let descriptor: PluginDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.version, PluginVersion::new(2, 1, 0));
        assert_eq!(descriptor.entry_point, "acme.gallery.v2");
        assert_eq!(descriptor.provides.components, vec!["Carousel"]);
        assert!(descriptor.dependencies[0].optional);
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_descriptor_validation() {
        let bad_id = PluginDescriptor::new("acme gallery", "Gallery");
        assert!(bad_id.validate().is_err());

        let no_entry = PluginDescriptor::new("acme.gallery", "Gallery").with_entry_point("  ");
        assert!(no_entry.validate().is_err());
    }
}
