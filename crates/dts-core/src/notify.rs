use std::path::Path;

use async_trait::async_trait;

/// Implemented by the CKG Index so write-capable engines can notify it after
/// a successful write without depending on the CKG crate directly.
#[async_trait]
pub trait FileChangeNotifier: Send + Sync {
    async fn on_file_changed(&self, path: &Path);
}

/// A notifier that does nothing; used where no CKG handle is attached to a
/// session, or in engine unit tests that don't exercise indexing.
pub struct NullNotifier;

#[async_trait]
impl FileChangeNotifier for NullNotifier {
    async fn on_file_changed(&self, _path: &Path) {}
}
