use std::ops::Range;

use crate::queue::{RenderQueue, RenderStats, TextureHandle};

/// A run of consecutive sprites sharing one texture: one draw call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteBatch {
    pub texture: TextureHandle,
    pub range: Range<usize>,
}

/// Orders a frame's sprites by texture and splits them into draw calls.
///
/// Batch storage is reused from frame to frame.
#[derive(Debug, Default)]
pub struct Batcher {
    batches: Vec<SpriteBatch>,
}

impl Batcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort (optionally) and batch `queue`, returning the frame's stats.
    ///
    /// The sort is stable and keyed only by `sort_key(texture)`; without
    /// sorting, runs are taken in submission order.
    pub fn prepare(
        &mut self,
        queue: &mut RenderQueue,
        sort_key: impl Fn(TextureHandle) -> usize,
        sort: bool,
    ) -> RenderStats {
        let _span = tracing::info_span!("batch_prepare", sprites = queue.sprites.len()).entered();

        if sort {
            queue.sprites.sort_by_key(|s| sort_key(s.texture));
        }

        self.batches.clear();
        let sprites = &queue.sprites;
        let mut start = 0;
        for i in 1..=sprites.len() {
            if i == sprites.len() || sprites[i].texture != sprites[start].texture {
                self.batches.push(SpriteBatch {
                    texture: sprites[start].texture,
                    range: start..i,
                });
                start = i;
            }
        }

        let stats = RenderStats {
            sprite_count: sprites.len() as u32,
            draw_call_count: self.batches.len() as u32,
        };
        tracing::trace!(
            sprites = stats.sprite_count,
            draw_calls = stats.draw_call_count,
            "batches prepared"
        );
        stats
    }

    /// Batches from the last `prepare`, in draw order.
    pub fn batches(&self) -> &[SpriteBatch] {
        &self.batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::SpriteDrawRequest;
    use glam::Vec2;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn queue_of(textures: &[u32]) -> RenderQueue {
        let mut queue = RenderQueue::new();
        for (i, &t) in textures.iter().enumerate() {
            queue.push(SpriteDrawRequest {
                texture: TextureHandle(t),
                uv_min: Vec2::ZERO,
                uv_max: Vec2::ONE,
                position: Vec2::new(i as f32, 0.0),
                rotation: 0.0,
            });
        }
        queue
    }

    fn key(t: TextureHandle) -> usize {
        t.0 as usize
    }

    #[test]
    fn empty_queue_has_no_draw_calls() {
        let mut batcher = Batcher::new();
        let stats = batcher.prepare(&mut RenderQueue::new(), key, true);
        assert_eq!(stats, RenderStats::default());
        assert!(batcher.batches().is_empty());
    }

    #[test]
    fn single_texture_is_one_draw_call() {
        let mut batcher = Batcher::new();
        let stats = batcher.prepare(&mut queue_of(&[4; 100]), key, true);
        assert_eq!(stats.sprite_count, 100);
        assert_eq!(stats.draw_call_count, 1);
        assert_eq!(batcher.batches()[0].range, 0..100);
    }

    #[test]
    fn sorting_merges_interleaved_textures() {
        let mut batcher = Batcher::new();
        let mut queue = queue_of(&[1, 2, 1, 2, 1, 3]);
        let stats = batcher.prepare(&mut queue, key, true);
        assert_eq!(stats.draw_call_count, 3);
        let textures: Vec<u32> = batcher.batches().iter().map(|b| b.texture.0).collect();
        assert_eq!(textures, vec![1, 2, 3]);
    }

    #[test]
    fn unsorted_submission_counts_runs_in_order() {
        let mut batcher = Batcher::new();
        let mut queue = queue_of(&[1, 2, 1, 2, 1, 3]);
        let stats = batcher.prepare(&mut queue, key, false);
        assert_eq!(stats.draw_call_count, 6);
        assert_eq!(queue.sprites[1].texture, TextureHandle(2));
    }

    #[test]
    fn sort_is_stable_within_a_texture() {
        let mut batcher = Batcher::new();
        let mut queue = queue_of(&[2, 1, 2, 1, 2]);
        batcher.prepare(&mut queue, key, true);
        let xs: Vec<f32> = queue.sprites.iter().map(|s| s.position.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn sort_key_decides_batch_order() {
        let mut batcher = Batcher::new();
        let mut queue = queue_of(&[1, 2, 3]);
        batcher.prepare(&mut queue, |t| 10 - t.0 as usize, true);
        let textures: Vec<u32> = batcher.batches().iter().map(|b| b.texture.0).collect();
        assert_eq!(textures, vec![3, 2, 1]);
    }

    proptest! {
        #[test]
        fn prop_draw_calls_bounded_by_sprites_and_textures(textures in prop::collection::vec(0u32..8, 0..200)) {
            let distinct = textures.iter().collect::<BTreeSet<_>>().len() as u32;
            let mut batcher = Batcher::new();
            let stats = batcher.prepare(&mut queue_of(&textures), key, true);
            prop_assert_eq!(stats.sprite_count, textures.len() as u32);
            prop_assert!(stats.draw_call_count <= stats.sprite_count);
            prop_assert!(stats.draw_call_count >= distinct);
            // Sorted by texture, every distinct texture is exactly one run.
            prop_assert_eq!(stats.draw_call_count, distinct);
        }
    }
}
