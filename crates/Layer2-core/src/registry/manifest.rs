//! Component Manifest - UI 컴포넌트 기능 명세

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 편집 가능한 prop 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropDefinition {
    pub name: String,

    /// 값 타입 (string, number, boolean, color, select, ...)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default)]
    pub required: bool,

    /// select 타입 선택지
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
}

impl PropDefinition {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            label: None,
            default_value: None,
            required: false,
            options: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// select 타입의 선택지
    pub fn with_options(mut self, options: Vec<Value>) -> Self {
        self.options = options;
        self
    }
}

/// 크기 제약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(default = "default_true")]
    pub resizable: bool,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            resizable: true,
        }
    }
}

/// UI 컴포넌트 매니페스트
///
/// (pluginId, componentId) 쌍으로 주소가 정해진다. componentId는
/// 플러그인 내부에서만 유일하면 된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentManifest {
    /// 컴포넌트 ID (플러그인 내 유일)
    pub id: String,

    /// 표시 이름
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// 빌더 팔레트 카테고리
    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub default_props: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<PropDefinition>,

    #[serde(default)]
    pub default_styles: Map<String, Value>,

    /// 편집 가능한 스타일 속성 이름
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,

    #[serde(default)]
    pub size: SizeConstraints,

    #[serde(default)]
    pub allow_children: bool,

    /// 렌더러 식별자 (프론트엔드 번들 내 모듈 이름)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
}

impl ComponentManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: default_category(),
            icon: None,
            version: None,
            tags: Vec::new(),
            default_props: Map::new(),
            props: Vec::new(),
            default_styles: Map::new(),
            styles: Vec::new(),
            size: SizeConstraints::default(),
            allow_children: false,
            renderer: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_prop(mut self, prop: PropDefinition) -> Self {
        if let Some(value) = &prop.default_value {
            self.default_props.insert(prop.name.clone(), value.clone());
        }
        self.props.push(prop);
        self
    }

    pub fn with_default_style(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !self.styles.contains(&key) {
            self.styles.push(key.clone());
        }
        self.default_styles.insert(key, value);
        self
    }

    pub fn with_size(mut self, size: SizeConstraints) -> Self {
        self.size = size;
        self
    }

    pub fn allow_children(mut self) -> Self {
        self.allow_children = true;
        self
    }

    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = Some(renderer.into());
        self
    }

    /// 검색어 매칭 (이름, ID, 설명, 태그; 대소문자 무시)
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.id.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

fn default_category() -> String {
    "general".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_defaults() {
        let manifest = ComponentManifest::new("Button", "Button")
            .with_category("basic")
            .with_prop(PropDefinition::new("label", "string").with_default(json!("Click me")))
            .with_default_style("color", json!("#fff"));

        assert_eq!(manifest.default_props.get("label"), Some(&json!("Click me")));
        assert_eq!(manifest.styles, vec!["color"]);
        assert!(manifest.size.resizable);
    }

    #[test]
    fn test_deserialize_minimal() {
        let manifest: ComponentManifest =
            serde_json::from_str(r#"{ "id": "Hero", "name": "Hero Banner" }"#).unwrap();
        assert_eq!(manifest.category, "general");
        assert!(!manifest.allow_children);
        assert!(manifest.size.resizable);
    }

    #[test]
    fn test_matches_query() {
        let manifest = ComponentManifest::new("Link", "Text Link")
            .with_description("Navigates to another page")
            .with_tag("navigation");

        assert!(manifest.matches_query("link"));
        assert!(manifest.matches_query("NAVIG"));
        assert!(manifest.matches_query(""));
        assert!(!manifest.matches_query("carousel"));
    }
}
