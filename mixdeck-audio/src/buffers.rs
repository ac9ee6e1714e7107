use std::collections::HashMap;
use std::sync::Arc;

use mixdeck_types::{AudioBuffer, TrackId};

use crate::engine::{AudioBackend, BackendResult, BufferId, NodeAllocator};

/// Track buffers uploaded to the backend, keyed by track. A track's buffer is
/// uploaded once and reused by every playback session until the track loads
/// different audio or is removed.
#[derive(Default)]
pub struct BufferCache {
    loaded: HashMap<TrackId, (Arc<AudioBuffer>, BufferId)>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend buffer for a track, uploading it if needed.
    pub fn ensure(
        &mut self,
        backend: &dyn AudioBackend,
        alloc: &mut NodeAllocator,
        track_id: TrackId,
        buffer: &Arc<AudioBuffer>,
    ) -> BackendResult<BufferId> {
        if let Some((cached, bufnum)) = self.loaded.get(&track_id) {
            if Arc::ptr_eq(cached, buffer) {
                return Ok(*bufnum);
            }
        }
        self.free(backend, track_id);

        let bufnum = alloc.buffer();
        backend.load_buffer(bufnum, buffer)?;
        self.loaded.insert(track_id, (Arc::clone(buffer), bufnum));
        Ok(bufnum)
    }

    /// Free a track's buffer, if loaded.
    pub fn free(&mut self, backend: &dyn AudioBackend, track_id: TrackId) {
        if let Some((_, bufnum)) = self.loaded.remove(&track_id) {
            let _ = backend.free_buffer(bufnum);
        }
    }

    pub fn free_all(&mut self, backend: &dyn AudioBackend) {
        for (_, (_, bufnum)) in self.loaded.drain() {
            let _ = backend.free_buffer(bufnum);
        }
    }

    pub fn is_loaded(&self, track_id: TrackId) -> bool {
        self.loaded.contains_key(&track_id)
    }
}
