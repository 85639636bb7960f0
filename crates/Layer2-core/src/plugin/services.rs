//! Service Container - 타입 키 기반 서비스 저장소
//!
//! 플랫폼 공유 컨테이너 하나와 플러그인별 전용 컨테이너가 존재한다.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// 타입 키 서비스 컨테이너
#[derive(Default)]
pub struct ServiceContainer {
    services: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 서비스 등록 (같은 타입이 있으면 교체하고 이전 값 반환)
    pub fn insert<T: Any + Send + Sync>(&self, service: Arc<T>) -> Option<Arc<T>> {
        self.services
            .write()
            .insert(TypeId::of::<T>(), service)
            .and_then(|prev| prev.downcast::<T>().ok())
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let service = self.services.read().get(&TypeId::of::<T>()).cloned()?;
        service.downcast::<T>().ok()
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.services.read().contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services
            .write()
            .remove(&TypeId::of::<T>())
            .and_then(|prev| prev.downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer {
        from: String,
    }

    #[test]
    fn test_insert_and_get() {
        let container = ServiceContainer::new();
        assert!(container.get::<Mailer>().is_none());

        container.insert(Arc::new(Mailer {
            from: "noreply@example.com".into(),
        }));

        let mailer = container.get::<Mailer>().unwrap();
        assert_eq!(mailer.from, "noreply@example.com");
        assert!(container.contains::<Mailer>());
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_replace_and_remove() {
        let container = ServiceContainer::new();
        container.insert(Arc::new(1u32));
        let prev = container.insert(Arc::new(2u32));
        assert_eq!(prev.as_deref(), Some(&1));

        assert_eq!(container.remove::<u32>().as_deref(), Some(&2));
        assert!(container.is_empty());
    }
}
