//! Fragment reassembly for HDLC segments and APDU datablocks
//!
//! A [`Reassembler`] keeps one partially accumulated message per
//! [`StreamKey`], i.e. per conversation and per [`StreamKind`]. HDLC
//! segments and datablocks of the same conversation therefore never share
//! a buffer.
//!
//! # Ordering
//!
//! Fragments are appended in the order they are offered. The caller must
//! present the frames of one conversation in arrival order: this is a
//! sequencing assembler, not a reorder buffer.
//!
//! # Memory
//!
//! Each stream is capped at [`ReassemblyConfig::max_message_size`]. Streams
//! that stop receiving fragments stay in the table until they are completed,
//! discarded, or evicted with [`Reassembler::evict_idle`].
//!
//! # Concurrency
//!
//! The table is split into independently locked shards selected by the
//! conversation id, so decoding different conversations from several
//! threads does not serialize on one lock.

use crate::error::{DlmsError, DlmsResult};
use crate::tree::Field;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Monotonically increasing capture position supplied by the caller
pub type FrameNumber = u64;

/// Opaque conversation identifier (e.g. derived from a transport 5-tuple)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub u64);

impl From<u64> for ConversationId {
    fn from(id: u64) -> Self {
        ConversationId(id)
    }
}

/// Logical stream a fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamKind {
    /// HDLC information fields chained by the segmentation bit
    HdlcSegment,
    /// Get/Set/Action datablocks chained by block number
    Datablock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub conversation: ConversationId,
    pub kind: StreamKind,
}

impl StreamKey {
    pub fn new(conversation: ConversationId, kind: StreamKind) -> Self {
        Self { conversation, kind }
    }

    pub fn hdlc(conversation: ConversationId) -> Self {
        Self::new(conversation, StreamKind::HdlcSegment)
    }

    pub fn datablock(conversation: ConversationId) -> Self {
        Self::new(conversation, StreamKind::Datablock)
    }
}

/// Limits applied by a [`Reassembler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReassemblyConfig {
    /// Upper bound of one reassembled message in bytes
    pub max_message_size: usize,
    /// A stream whose last fragment is older than this many frames is evicted
    pub max_idle_frames: u64,
    /// Number of independently locked table partitions
    pub shards: usize,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
            max_idle_frames: 1000,
            shards: 16,
        }
    }
}

/// A completed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    pub data: Bytes,
    /// Frames that contributed a fragment, in order
    pub frames: Vec<FrameNumber>,
}

impl Reassembled {
    pub fn fragment_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame that delivered the final fragment
    pub fn reassembled_in(&self) -> Option<FrameNumber> {
        self.frames.last().copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bookkeeping node listing the contributing frames
    ///
    /// `span` is where the final fragment sits in the current buffer.
    pub fn to_field(&self, span: std::ops::Range<usize>) -> Field {
        let frames = self
            .frames
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut node = Field::new("Reassembled", span.clone()).with_text(format!(
            "{} fragment(s), {} bytes",
            self.fragment_count(),
            self.len()
        ));
        node.push(Field::new("Fragment Count", span.clone()).with_value(self.fragment_count() as u64));
        node.push(Field::new("Reassembled Length", span.clone()).with_value(self.len() as u64));
        node.push(Field::new("Fragments", span.clone()).with_text(frames));
        if let Some(frame) = self.reassembled_in() {
            node.push(Field::new("Reassembled In", span).with_value(frame));
        }
        node
    }
}

/// Outcome of [`Reassembler::add_fragment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentStatus {
    /// More fragments are expected
    Pending {
        /// 1-based position of this fragment in its stream
        fragment_index: usize,
        /// Bytes accumulated so far
        accumulated: usize,
    },
    Complete(Reassembled),
}

#[derive(Debug, Default)]
struct PartialMessage {
    data: BytesMut,
    frames: Vec<FrameNumber>,
    last_frame: FrameNumber,
}

type Shard = HashMap<StreamKey, PartialMessage>;

/// Sharded table of in-progress reassemblies
#[derive(Debug)]
pub struct Reassembler {
    config: ReassemblyConfig,
    shards: Vec<Mutex<Shard>>,
}

impl Reassembler {
    pub fn new(config: ReassemblyConfig) -> Self {
        let count = config.shards.max(1);
        let shards = (0..count).map(|_| Mutex::new(HashMap::new())).collect();
        Self { config, shards }
    }

    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
    }

    fn shard(&self, conversation: ConversationId) -> MutexGuard<'_, Shard> {
        let mut hasher = DefaultHasher::new();
        conversation.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one fragment to the stream `key`
    ///
    /// # Arguments
    ///
    /// * `key` - Stream the fragment belongs to
    /// * `frame` - Frame number carrying the fragment
    /// * `fragment` - Fragment payload, may be empty
    /// * `more_follow` - `false` completes the stream
    ///
    /// # Errors
    ///
    /// Returns `DlmsError::Reassembly` and drops the stream when the message
    /// would exceed `max_message_size`.
    pub fn add_fragment(
        &self,
        key: StreamKey,
        frame: FrameNumber,
        fragment: &[u8],
        more_follow: bool,
    ) -> DlmsResult<FragmentStatus> {
        let mut shard = self.shard(key.conversation);
        let partial = shard.entry(key).or_default();

        let total = partial.data.len() + fragment.len();
        if total > self.config.max_message_size {
            shard.remove(&key);
            log::warn!(
                "{:?} stream of conversation {} dropped: {} bytes exceeds {}",
                key.kind,
                key.conversation.0,
                total,
                self.config.max_message_size
            );
            return Err(DlmsError::Reassembly(format!(
                "Reassembled message too large: {} bytes (max: {})",
                total, self.config.max_message_size
            )));
        }

        partial.data.extend_from_slice(fragment);
        partial.frames.push(frame);
        partial.last_frame = frame;

        if more_follow {
            return Ok(FragmentStatus::Pending {
                fragment_index: partial.frames.len(),
                accumulated: partial.data.len(),
            });
        }

        let partial = shard.remove(&key).unwrap_or_default();
        log::debug!(
            "{:?} stream of conversation {} reassembled: {} bytes from {} fragment(s)",
            key.kind,
            key.conversation.0,
            partial.data.len(),
            partial.frames.len()
        );
        Ok(FragmentStatus::Complete(Reassembled {
            data: partial.data.freeze(),
            frames: partial.frames,
        }))
    }

    /// Drop any partial message of `key`; returns whether one existed
    pub fn discard(&self, key: StreamKey) -> bool {
        self.shard(key.conversation).remove(&key).is_some()
    }

    /// Drop both streams of a conversation
    pub fn discard_conversation(&self, conversation: ConversationId) {
        let mut shard = self.shard(conversation);
        shard.retain(|key, _| key.conversation != conversation);
    }

    /// Bytes accumulated so far for `key`, if a message is in progress
    pub fn pending(&self, key: StreamKey) -> Option<usize> {
        self.shard(key.conversation).get(&key).map(|p| p.data.len())
    }

    /// Evict streams whose last fragment is more than `max_idle_frames`
    /// older than `current_frame`; returns the number evicted
    pub fn evict_idle(&self, current_frame: FrameNumber) -> usize {
        let horizon = self.config.max_idle_frames;
        let mut evicted = 0;
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap_or_else(PoisonError::into_inner);
            let before = shard.len();
            shard.retain(|_, p| current_frame.saturating_sub(p.last_frame) <= horizon);
            evicted += before - shard.len();
        }
        if evicted > 0 {
            log::debug!("Evicted {} idle reassembly stream(s) at frame {}", evicted, current_frame);
        }
        evicted
    }

    /// Number of streams currently in progress
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(ReassemblyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    const CONV: ConversationId = ConversationId(7);

    #[test]
    fn test_reassembled_field_lists_frames() {
        let reassembled = Reassembled {
            data: Bytes::from_static(&[1, 2, 3]),
            frames: vec![4, 9],
        };
        let node = reassembled.to_field(10..12);
        assert_eq!(node.display_text().as_deref(), Some("2 fragment(s), 3 bytes"));
        assert_eq!(node.find("Fragments").and_then(|f| f.text.clone()).as_deref(), Some("4, 9"));
        assert_eq!(
            node.find("Reassembled In").and_then(|f| f.value.as_ref()).and_then(|v| v.as_unsigned()),
            Some(9)
        );
    }

    #[test]
    fn test_datablock_stream_completes() {
        let r = Reassembler::default();
        let key = StreamKey::datablock(CONV);

        let status = r.add_fragment(key, 1, &[0xAA, 0xBB], true).unwrap();
        assert_eq!(
            status,
            FragmentStatus::Pending {
                fragment_index: 1,
                accumulated: 2
            }
        );
        assert_eq!(r.pending(key), Some(2));

        match r.add_fragment(key, 2, &[0xCC, 0xDD], false).unwrap() {
            FragmentStatus::Complete(done) => {
                assert_eq!(&done.data[..], &[0xAA, 0xBB, 0xCC, 0xDD]);
                assert_eq!(done.frames, vec![1, 2]);
                assert_eq!(done.reassembled_in(), Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(r.is_empty());
    }

    #[test]
    fn test_empty_final_fragment() {
        let r = Reassembler::default();
        let key = StreamKey::hdlc(CONV);
        r.add_fragment(key, 1, &[1, 2, 3], true).unwrap();
        match r.add_fragment(key, 2, &[], false).unwrap() {
            FragmentStatus::Complete(done) => {
                assert_eq!(&done.data[..], &[1, 2, 3]);
                assert_eq!(done.fragment_count(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stream_kinds_are_independent() {
        let r = Reassembler::default();
        r.add_fragment(StreamKey::hdlc(CONV), 1, &[1], true).unwrap();
        r.add_fragment(StreamKey::datablock(CONV), 1, &[2, 3], true).unwrap();
        assert_eq!(r.pending(StreamKey::hdlc(CONV)), Some(1));
        assert_eq!(r.pending(StreamKey::datablock(CONV)), Some(2));

        assert!(r.discard(StreamKey::datablock(CONV)));
        assert!(!r.discard(StreamKey::datablock(CONV)));
        assert_eq!(r.pending(StreamKey::hdlc(CONV)), Some(1));

        r.discard_conversation(CONV);
        assert!(r.is_empty());
    }

    #[test]
    fn test_overflow_drops_stream() {
        let r = Reassembler::new(ReassemblyConfig {
            max_message_size: 4,
            ..Default::default()
        });
        let key = StreamKey::hdlc(CONV);
        r.add_fragment(key, 1, &[0; 3], true).unwrap();
        let err = r.add_fragment(key, 2, &[0; 2], true).unwrap_err();
        assert!(matches!(err, DlmsError::Reassembly(_)));
        assert_eq!(r.pending(key), None);
    }

    #[test]
    fn test_evict_idle() {
        let r = Reassembler::new(ReassemblyConfig {
            max_idle_frames: 10,
            ..Default::default()
        });
        r.add_fragment(StreamKey::hdlc(ConversationId(1)), 5, &[1], true).unwrap();
        r.add_fragment(StreamKey::hdlc(ConversationId(2)), 20, &[1], true).unwrap();

        assert_eq!(r.evict_idle(15), 0);
        assert_eq!(r.evict_idle(16), 1);
        assert_eq!(r.len(), 1);
        assert_eq!(r.pending(StreamKey::hdlc(ConversationId(2))), Some(1));
    }

    #[test]
    fn test_concurrent_conversations() {
        let r = Arc::new(Reassembler::default());
        let handles: Vec<_> = (0..8u64)
            .map(|conv| {
                let r = Arc::clone(&r);
                thread::spawn(move || {
                    let key = StreamKey::hdlc(ConversationId(conv));
                    for frame in 0..50u64 {
                        r.add_fragment(key, frame, &[conv as u8], true).unwrap();
                    }
                    match r.add_fragment(key, 50, &[], false).unwrap() {
                        FragmentStatus::Complete(done) => done.data,
                        other => panic!("unexpected {:?}", other),
                    }
                })
            })
            .collect();

        for (conv, handle) in handles.into_iter().enumerate() {
            let data = handle.join().unwrap();
            assert_eq!(data.len(), 50);
            assert!(data.iter().all(|&b| b == conv as u8));
        }
        assert!(r.is_empty());
    }

    proptest! {
        #[test]
        fn test_any_split_reassembles_to_the_message(
            message in proptest::collection::vec(any::<u8>(), 0..512),
            cuts in proptest::collection::vec(0usize..512, 0..8),
        ) {
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(message.len())).collect();
            cuts.sort_unstable();
            cuts.push(message.len());

            let r = Reassembler::default();
            let key = StreamKey::hdlc(CONV);
            let mut start = 0;
            let mut result = None;
            for (index, &end) in cuts.iter().enumerate() {
                let more = index + 1 < cuts.len();
                let status = r.add_fragment(key, index as u64, &message[start..end], more).unwrap();
                if !more {
                    result = Some(status);
                }
                start = end;
            }
            match result {
                Some(FragmentStatus::Complete(done)) => {
                    prop_assert_eq!(&done.data[..], &message[..]);
                    prop_assert_eq!(done.fragment_count(), cuts.len());
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
            prop_assert!(r.is_empty());
        }
    }
}
