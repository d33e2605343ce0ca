/// Render-to-archive correlation table.
///
/// Tracks which archive recording was started alongside an experience
/// composer render, so that stopping the render can stop its recording too.
/// Entries live only for the lifetime of the process.
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Thread-safe renderId -> archiveId map, owned by the service state.
#[derive(Clone, Default)]
pub struct RenderArchiveMap {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl RenderArchiveMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the archive associated with a render.
    pub async fn associate(&self, render_id: &str, archive_id: &str) {
        debug!("Associating render {} with archive {}", render_id, archive_id);
        self.inner
            .lock()
            .await
            .insert(render_id.to_string(), archive_id.to_string());
    }

    pub async fn lookup(&self, render_id: &str) -> Option<String> {
        self.inner.lock().await.get(render_id).cloned()
    }

    /// Drop the entry for a render. Removing an absent key is a no-op.
    pub async fn remove(&self, render_id: &str) -> Option<String> {
        let removed = self.inner.lock().await.remove(render_id);
        if removed.is_some() {
            debug!("Removed correlation for render {}", render_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_associate_lookup_remove() {
        let map = RenderArchiveMap::new();
        map.associate("r1", "a1").await;
        assert_eq!(map.lookup("r1").await.as_deref(), Some("a1"));

        map.remove("r1").await;
        assert_eq!(map.lookup("r1").await, None);
    }

    #[tokio::test]
    async fn test_associate_overwrites() {
        let map = RenderArchiveMap::new();
        map.associate("r1", "a1").await;
        map.associate("r1", "a2").await;
        assert_eq!(map.lookup("r1").await.as_deref(), Some("a2"));
        assert_eq!(map.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let map = RenderArchiveMap::new();
        assert_eq!(map.remove("missing").await, None);
        assert!(map.is_empty().await);
    }

    #[tokio::test]
    async fn test_instances_are_independent() {
        let a = RenderArchiveMap::new();
        let b = RenderArchiveMap::new();
        a.associate("r1", "a1").await;
        assert_eq!(b.lookup("r1").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_mutation_keeps_unrelated_keys() {
        let map = RenderArchiveMap::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let map = map.clone();
            handles.push(tokio::spawn(async move {
                let render = format!("r{}", i);
                map.associate(&render, &format!("a{}", i)).await;
                if i % 2 == 0 {
                    map.remove(&render).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(map.len().await, 16);
        for i in (1..32).step_by(2) {
            assert_eq!(map.lookup(&format!("r{}", i)).await, Some(format!("a{}", i)));
        }
    }
}
