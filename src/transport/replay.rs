//! Scripted in-memory transport.
use std::collections::VecDeque;

use super::Transport;
use crate::error::Result;

/// Plays back canned deck replies, one per written frame, and records every
/// frame written to it.
#[derive(Debug, Default, Clone)]
pub struct ReplayTransport {
    replies: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
    written: Vec<Vec<u8>>,
    write_limit: Option<usize>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes the deck buffers after the next written frame. An
    /// empty reply models a deck that stays silent.
    pub fn reply(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.replies.push_back(raw.into());
        self
    }

    /// Accept at most `limit` bytes per write.
    pub fn write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Frames written so far, oldest first.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for ReplayTransport {
    fn write_raw(&mut self, raw: &[u8]) -> Result<usize> {
        let n = self.write_limit.map_or(raw.len(), |limit| raw.len().min(limit));
        self.written.push(raw[..n].to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.pending.extend(reply);
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.pending.len())
    }

    fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let len = len.min(self.pending.len());
        Ok(self.pending.drain(..len).collect())
    }
}
