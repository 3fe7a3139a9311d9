//! The evidence pool.
//!
//! Buffers verified evidence of validator misbehavior until it is committed
//! in a block, remembers committed evidence forever so it cannot be proposed
//! twice, and expires pending evidence that has aged out of the consensus
//! parameter window.
//!
//! ## Concurrency
//!
//! One mutex guards the cached chain state, the consensus vote buffer, and
//! the pruning thresholds. The pending count is an atomic so [`Pool::size`]
//! is lock-free. The pending list is independently thread-safe, and the
//! database delegates concurrent single-key access to RocksDB. No public
//! operation holds the mutex while waiting on the pending-list signal.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use tessera_storage::Database;
use tessera_types::{
    ChainState, DuplicateVoteEvidence, Evidence, EvidenceList, Hash, Vote,
};

use crate::clist::{ConcurrentList, Node};
use crate::error::PoolError;
use crate::layout::{select_layout, KeyLayout};
use crate::verify::verify_evidence;
use crate::{BlockStore, StateStore};

/// Options for opening a [`Pool`].
#[derive(Debug, Clone, Default)]
pub struct PoolOptions {
    /// Key layout to use for a fresh database. Ignored when the database
    /// already carries a version record or pre-version-record data.
    pub key_layout: Option<KeyLayout>,
}

/// State guarded by the pool mutex.
struct PoolInner {
    /// Latest chain state; all expiry and validator lookups key off this
    state: ChainState,
    /// Conflicting vote pairs from consensus, awaiting the commit of the
    /// height they happened at
    consensus_buffer: Vec<(Vote, Vote)>,
    /// Height at which pending evidence next expires
    pruning_height: u64,
    /// Time at which pending evidence next expires, Unix milliseconds
    pruning_time: u64,
}

/// A pool of valid evidence waiting to be gossiped and committed.
pub struct Pool {
    /// Evidence database; exclusively owned by the pool for its lifetime
    store: Database,
    state_store: Arc<dyn StateStore>,
    block_store: Arc<dyn BlockStore>,
    layout: KeyLayout,
    /// In-memory pending evidence in insertion order, walked by gossip
    pending_list: ConcurrentList<Evidence>,
    /// Mirrors the number of pending entries on disk
    pending_count: AtomicU64,
    inner: Mutex<PoolInner>,
}

impl Pool {
    /// Open an evidence pool over a dedicated database.
    ///
    /// Loads the latest chain state, selects the on-disk key layout, prunes
    /// evidence that expired while the node was down, and reloads the
    /// surviving pending entries into the in-memory list. Pending entries
    /// that fail to deserialize are logged and skipped but left on disk for
    /// an operator to inspect.
    pub fn open(
        store: Database,
        state_store: Arc<dyn StateStore>,
        block_store: Arc<dyn BlockStore>,
        options: PoolOptions,
    ) -> Result<Self, PoolError> {
        let state = state_store.load().map_err(PoolError::StateLoad)?;
        let layout = select_layout(&store, options.key_layout)?;

        let pool = Self {
            store,
            state_store,
            block_store,
            layout,
            pending_list: ConcurrentList::new(),
            pending_count: AtomicU64::new(0),
            inner: Mutex::new(PoolInner {
                state,
                consensus_buffer: Vec::new(),
                pruning_height: 0,
                pruning_time: 0,
            }),
        };

        // Drop whatever expired while we were down, then recover the rest.
        let (pruning_height, pruning_time) = pool.remove_expired_pending_evidence();
        {
            let mut inner = pool.inner.lock();
            inner.pruning_height = pruning_height;
            inner.pruning_time = pruning_time;
        }

        let (pending, _) = pool.list_evidence(&pool.layout.pending_prefix(), -1)?;
        pool.pending_count
            .store(pending.len() as u64, Ordering::Release);
        for ev in pending {
            pool.pending_list.push_back(ev);
        }

        info!(
            layout = %pool.layout,
            pending = pool.size(),
            "evidence pool opened"
        );
        Ok(pool)
    }

    /// Validate a piece of evidence and add it to the pool.
    ///
    /// Re-submission of evidence that is already pending or already
    /// committed is a no-op: peers that are behind legitimately resend old
    /// evidence and must not be treated as faulty for it.
    pub fn add_evidence(&self, evidence: Evidence) -> Result<(), PoolError> {
        info!(%evidence, "attempting to add evidence");

        if self.is_pending(&evidence) {
            debug!(%evidence, "evidence already pending; ignoring");
            return Ok(());
        }
        if self.is_committed(&evidence) {
            debug!(%evidence, "evidence already committed; ignoring");
            return Ok(());
        }

        let state = self.state();
        verify_evidence(
            &evidence,
            &state,
            self.state_store.as_ref(),
            self.block_store.as_ref(),
        )?;

        self.add_pending_evidence(&evidence)?;
        info!(%evidence, "verified new evidence of byzantine behavior");
        self.pending_list.push_back(evidence);

        Ok(())
    }

    /// Verify the evidence list of a proposed block.
    ///
    /// Evidence the pool already holds as pending is trusted without
    /// re-verification, EXCEPT light-client attack evidence: a different
    /// forged block can collide with a pending entry's identity, so the full
    /// signed-header diff is always re-checked. Valid evidence the pool does
    /// not yet hold is persisted along the way (failure to persist is logged,
    /// not fatal: the evidence is valid and the proposer's intent stands).
    ///
    /// Returns [`PoolError::Duplicate`] if the same evidence appears twice
    /// in the list and [`PoolError::AlreadyCommitted`] if any entry was
    /// already committed in an earlier block.
    pub fn check_evidence(&self, ev_list: &EvidenceList) -> Result<(), PoolError> {
        let mut hashes: Vec<Hash> = Vec::with_capacity(ev_list.len());

        for evidence in ev_list {
            let is_light_attack = matches!(evidence, Evidence::LightClientAttack(_));

            if is_light_attack || !self.is_pending(evidence) {
                if self.is_committed(evidence) {
                    return Err(PoolError::AlreadyCommitted);
                }

                let state = self.state();
                verify_evidence(
                    evidence,
                    &state,
                    self.state_store.as_ref(),
                    self.block_store.as_ref(),
                )?;

                if !self.is_pending(evidence) {
                    if let Err(err) = self.add_pending_evidence(evidence) {
                        error!(%evidence, error = %err, "can't add evidence to pending list");
                    }
                }

                info!(%evidence, "check evidence: verified evidence of byzantine behavior");
            }

            let hash = evidence.hash();
            if hashes.contains(&hash) {
                return Err(PoolError::Duplicate);
            }
            hashes.push(hash);
        }

        Ok(())
    }

    /// Pending evidence in FIFO order, up to `max_bytes` of serialized size.
    ///
    /// Pass `-1` for no size cap. The element that would overflow the budget
    /// is excluded entirely. Never mutates the pool; internal failures are
    /// logged and an empty list returned, because block proposal must not
    /// fail over an evidence-store hiccup.
    pub fn pending_evidence(&self, max_bytes: i64) -> (Vec<Evidence>, i64) {
        if self.size() == 0 {
            return (Vec::new(), 0);
        }
        match self.list_evidence(&self.layout.pending_prefix(), max_bytes) {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "unable to retrieve pending evidence");
                (Vec::new(), 0)
            }
        }
    }

    /// Report two conflicting votes observed by consensus.
    ///
    /// The block at the votes' height has not been committed yet, so its
    /// time is unknown; the pair is buffered unverified and turned into
    /// [`DuplicateVoteEvidence`] during the next [`Pool::update`].
    pub fn report_conflicting_votes(&self, vote_a: Vote, vote_b: Vote) {
        let mut inner = self.inner.lock();
        inner.consensus_buffer.push((vote_a, vote_b));
    }

    /// Advance the pool to the state after a newly committed block.
    ///
    /// 1. flushes the consensus vote buffer into duplicate-vote evidence,
    ///    stamped with committed block times (BEFORE the state swap, so
    ///    evidence for the just-committed height uses that height's time);
    /// 2. replaces the cached state;
    /// 3. moves evidence committed in this block from the pending keyspace
    ///    to the committed keyspace;
    /// 4. prunes expired pending evidence when the pruning threshold passed.
    ///
    /// # Panics
    ///
    /// Panics if `new_state` does not advance past the current state; the
    /// caller drives the pool from consensus, where height is monotonic.
    pub fn update(&self, new_state: ChainState, committed: &EvidenceList) {
        {
            let mut inner = self.inner.lock();
            assert!(
                new_state.last_block_height > inner.state.last_block_height,
                "evidence pool update: new state height {} is not greater than previous height {}",
                new_state.last_block_height,
                inner.state.last_block_height,
            );
            debug!(
                last_block_height = new_state.last_block_height,
                last_block_time = new_state.last_block_time,
                "updating evidence pool"
            );

            self.process_consensus_buffer(&mut inner, &new_state);
            inner.state = new_state.clone();
        }

        self.mark_evidence_as_committed(committed);

        let should_prune = {
            let inner = self.inner.lock();
            self.size() > 0
                && new_state.last_block_height > inner.pruning_height
                && new_state.last_block_time > inner.pruning_time
        };
        if should_prune {
            let (pruning_height, pruning_time) = self.remove_expired_pending_evidence();
            let mut inner = self.inner.lock();
            inner.pruning_height = pruning_height;
            inner.pruning_time = pruning_time;
        }
    }

    /// First node of the pending evidence list.
    pub fn evidence_front(&self) -> Option<Arc<Node<Evidence>>> {
        self.pending_list.front()
    }

    /// Signal that turns `true` whenever pending evidence is available.
    ///
    /// The gossip reactor parks on this between traversals.
    pub fn evidence_wait_signal(&self) -> watch::Receiver<bool> {
        self.pending_list.wait_signal()
    }

    /// Number of pending evidence entries. Lock-free.
    pub fn size(&self) -> u64 {
        self.pending_count.load(Ordering::Acquire)
    }

    /// The pool's cached chain state.
    pub fn state(&self) -> ChainState {
        self.inner.lock().state.clone()
    }

    /// Flush and close the evidence database.
    pub fn close(self) -> Result<(), PoolError> {
        self.store.flush()?;
        Ok(())
    }

    /// Whether evidence has aged out of BOTH the height and time windows.
    fn is_expired(state: &ChainState, height: u64, time: u64) -> bool {
        let params = &state.consensus_params.evidence;
        state.last_block_height.saturating_sub(height) > params.max_age_num_blocks
            && state.last_block_time.saturating_sub(time) > params.max_age_duration
    }

    /// Whether this exact evidence is already marked committed.
    fn is_committed(&self, evidence: &Evidence) -> bool {
        let key = self.layout.key_committed(evidence);
        match self.store.exists(&key) {
            Ok(found) => found,
            Err(err) => {
                error!(error = %err, "unable to look up committed evidence");
                false
            }
        }
    }

    /// Whether this exact evidence is already pending.
    fn is_pending(&self, evidence: &Evidence) -> bool {
        let key = self.layout.key_pending(evidence);
        match self.store.exists(&key) {
            Ok(found) => found,
            Err(err) => {
                error!(error = %err, "unable to look up pending evidence");
                false
            }
        }
    }

    /// Persist evidence under the pending prefix and bump the counter.
    fn add_pending_evidence(&self, evidence: &Evidence) -> Result<(), PoolError> {
        let bytes =
            bincode::serialize(evidence).map_err(|e| PoolError::Serialization(e.to_string()))?;
        let key = self.layout.key_pending(evidence);
        self.store.put(&key, &bytes)?;
        self.pending_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Delete a pending entry and drop the counter. Failures are logged;
    /// the entry will be retried by a later prune.
    fn remove_pending_evidence(&self, evidence: &Evidence) {
        let key = self.layout.key_pending(evidence);
        match self.store.delete(&key) {
            Ok(()) => {
                let _ = self
                    .pending_count
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
                debug!(%evidence, "deleted pending evidence");
            }
            Err(err) => {
                error!(%evidence, error = %err, "unable to delete pending evidence");
            }
        }
    }

    /// Move block-committed evidence out of pending and write its committed
    /// marker. Only the height is stored: the full evidence now lives in the
    /// block itself.
    ///
    /// Storage failures here are logged but never abort the update;
    /// consensus progress cannot be held up by evidence bookkeeping.
    fn mark_evidence_as_committed(&self, committed: &EvidenceList) {
        let mut removed: HashSet<Hash> = HashSet::with_capacity(committed.len());

        for evidence in committed {
            if self.is_pending(evidence) {
                self.remove_pending_evidence(evidence);
                removed.insert(evidence.hash());
            }

            let key = self.layout.key_committed(evidence);
            let height_bytes = match bincode::serialize(&evidence.height()) {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!(%evidence, error = %err, "failed to encode committed evidence marker");
                    continue;
                }
            };
            if let Err(err) = self.store.put(&key, &height_bytes) {
                error!(%evidence, error = %err, "unable to save committed evidence marker");
            }
        }

        if !removed.is_empty() {
            self.remove_evidence_from_list(&removed);
        }
    }

    /// List evidence under a prefix, oldest first, keeping the running
    /// serialized size within `max_bytes` (`-1` = uncapped). The entry that
    /// would exceed the budget is not included. Entries that fail to decode
    /// are logged and skipped, and stay on disk untouched.
    fn list_evidence(
        &self,
        prefix: &[u8],
        max_bytes: i64,
    ) -> Result<(Vec<Evidence>, i64), PoolError> {
        let mut evidence = Vec::new();
        let mut total_size: i64 = 0;

        for entry in self.store.prefix_iterator(prefix) {
            let (key, value) = entry?;
            let ev: Evidence = match bincode::deserialize(&value) {
                Ok(ev) => ev,
                Err(err) => {
                    warn!(
                        key = %hex::encode(&key),
                        error = %err,
                        "skipping undecodable evidence entry"
                    );
                    continue;
                }
            };

            let ev_size = value.len() as i64;
            if max_bytes != -1 && total_size + ev_size > max_bytes {
                return Ok((evidence, total_size));
            }
            total_size += ev_size;
            evidence.push(ev);
        }

        Ok((evidence, total_size))
    }

    /// Scan pending evidence oldest-first, deleting everything expired.
    ///
    /// Returns the `(height, time)` threshold at which the oldest surviving
    /// entry will expire, i.e. when the next prune is due. If nothing
    /// survives, the current state's height and time are returned.
    fn remove_expired_pending_evidence(&self) -> (u64, u64) {
        let state = self.state();
        let params = &state.consensus_params.evidence;
        let mut removed: HashSet<Hash> = HashSet::new();

        for entry in self.store.prefix_iterator(&self.layout.pending_prefix()) {
            let (key, value) = match entry {
                Ok(kv) => kv,
                Err(err) => {
                    error!(error = %err, "unable to iterate over pending evidence");
                    break;
                }
            };
            let ev: Evidence = match bincode::deserialize(&value) {
                Ok(ev) => ev,
                Err(err) => {
                    warn!(
                        key = %hex::encode(&key),
                        error = %err,
                        "skipping undecodable evidence entry"
                    );
                    continue;
                }
            };

            if !Self::is_expired(&state, ev.height(), ev.time()) {
                // Oldest survivor found; everything after it is younger.
                if !removed.is_empty() {
                    self.remove_evidence_from_list(&removed);
                }
                return (
                    ev.height() + params.max_age_num_blocks + 1,
                    ev.time() + params.max_age_duration + 1_000,
                );
            }

            self.remove_pending_evidence(&ev);
            removed.insert(ev.hash());
        }

        // No pending evidence left, or all of it expired.
        if !removed.is_empty() {
            self.remove_evidence_from_list(&removed);
        }
        (state.last_block_height, state.last_block_time)
    }

    /// Unlink every listed hash from the in-memory pending list.
    fn remove_evidence_from_list(&self, hashes: &HashSet<Hash>) {
        let mut cursor = self.pending_list.front();
        while let Some(node) = cursor {
            if hashes.contains(&node.value().hash()) {
                self.pending_list.remove(&node);
            }
            cursor = node.next();
        }
    }

    /// Turn buffered conflicting votes into duplicate-vote evidence.
    ///
    /// Called under the pool mutex with the post-commit state, BEFORE the
    /// cached state is replaced. The evidence timestamp and validator set
    /// come from the height the votes were cast at: the just-committed
    /// block for same-height votes, stored block metadata for older ones.
    /// Failures are logged and the offending pair dropped; one bad pair
    /// must not wedge the buffer.
    fn process_consensus_buffer(&self, inner: &mut PoolInner, new_state: &ChainState) {
        let buffered = std::mem::take(&mut inner.consensus_buffer);

        for (vote_a, vote_b) in buffered {
            let vote_height = vote_a.height;

            let dve = if vote_height == new_state.last_block_height {
                DuplicateVoteEvidence::new(
                    vote_a,
                    vote_b,
                    new_state.last_block_time,
                    &new_state.last_validators,
                )
            } else if vote_height < new_state.last_block_height {
                let validators = match self.state_store.load_validators(vote_height) {
                    Ok(validators) => validators,
                    Err(err) => {
                        error!(
                            height = vote_height,
                            error = %err,
                            "failed to load validator set for conflicting votes"
                        );
                        continue;
                    }
                };
                let block_meta = match self.block_store.load_block_meta(vote_height) {
                    Some(meta) => meta,
                    None => {
                        error!(
                            height = vote_height,
                            "failed to load block time for conflicting votes"
                        );
                        continue;
                    }
                };
                DuplicateVoteEvidence::new(vote_a, vote_b, block_meta.header.time, &validators)
            } else {
                // Consensus should never hand us votes from a height above
                // the state it just committed.
                error!(
                    duplicate_vote_height = vote_height,
                    last_block_height = new_state.last_block_height,
                    "inbound duplicate votes from consensus are of a greater height than current state"
                );
                continue;
            };

            let dve = match dve {
                Ok(dve) => dve,
                Err(err) => {
                    error!(error = %err, "error generating evidence from conflicting votes");
                    continue;
                }
            };
            let evidence = Evidence::DuplicateVote(dve);

            if self.is_pending(&evidence) {
                debug!(%evidence, "evidence already pending; ignoring");
                continue;
            }
            if self.is_committed(&evidence) {
                debug!(%evidence, "evidence already committed; ignoring");
                continue;
            }

            if let Err(err) = self.add_pending_evidence(&evidence) {
                error!(
                    error = %err,
                    "failed to flush evidence from consensus buffer to pending list"
                );
                continue;
            }

            info!(%evidence, "verified new evidence of byzantine behavior");
            self.pending_list.push_back(evidence);
        }
    }
}
