//! A concurrent linked list with removal-safe forward traversal.
//!
//! The evidence pool keeps pending evidence in insertion order in this list;
//! the gossip reactor walks it forward, parking on [`ConcurrentList::wait_signal`]
//! whenever it reaches the end, and the pool removes entries as they commit
//! or expire.
//!
//! Removal and traversal are designed to coexist: removing a node detaches
//! its `prev` link (so a long-lived cursor holding an old handle does not
//! pin earlier nodes in memory) but leaves its `next` link intact, so a
//! traverser holding a removed node still reaches a valid successor. Nodes
//! are reference-counted; a removed node is freed once the last cursor drops
//! its handle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

/// A node in a [`ConcurrentList`].
pub struct Node<T> {
    value: T,
    next: RwLock<Option<Arc<Node<T>>>>,
    prev: RwLock<Option<Weak<Node<T>>>>,
    removed: AtomicBool,
}

impl<T> Node<T> {
    /// The value stored in this node.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The next node in the list.
    ///
    /// Valid to call on a removed node: its `next` link keeps pointing into
    /// the list, so traversal continues from a live successor.
    pub fn next(&self) -> Option<Arc<Node<T>>> {
        self.next.read().clone()
    }

    /// Whether this node has been unlinked from the list.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("removed", &self.is_removed())
            .finish()
    }
}

struct ListLinks<T> {
    head: Option<Arc<Node<T>>>,
    tail: Option<Arc<Node<T>>>,
}

/// A thread-safe FIFO linked list.
///
/// Supports `O(1)` append, forward traversal via shared node handles, and
/// removal that is safe under concurrent traversal.
pub struct ConcurrentList<T> {
    links: Mutex<ListLinks<T>>,
    len: AtomicUsize,
    /// `true` whenever the list is non-empty; receivers park on this.
    signal: watch::Sender<bool>,
}

impl<T> ConcurrentList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            links: Mutex::new(ListLinks {
                head: None,
                tail: None,
            }),
            len: AtomicUsize::new(0),
            signal,
        }
    }

    /// Append a value to the back of the list.
    pub fn push_back(&self, value: T) -> Arc<Node<T>> {
        let node = Arc::new(Node {
            value,
            next: RwLock::new(None),
            prev: RwLock::new(None),
            removed: AtomicBool::new(false),
        });

        let mut links = self.links.lock();
        match links.tail.take() {
            Some(tail) => {
                *tail.next.write() = Some(node.clone());
                *node.prev.write() = Some(Arc::downgrade(&tail));
                links.tail = Some(node.clone());
            }
            None => {
                links.head = Some(node.clone());
                links.tail = Some(node.clone());
            }
        }
        self.len.fetch_add(1, Ordering::Release);
        self.signal.send_replace(true);
        node
    }

    /// The first node in the list, if any.
    pub fn front(&self) -> Option<Arc<Node<T>>> {
        self.links.lock().head.clone()
    }

    /// Unlink a node from the list.
    ///
    /// Returns `false` if the node was already removed. The node's `prev`
    /// link is detached; its `next` link is left pointing into the list for
    /// concurrent traversers.
    pub fn remove(&self, node: &Arc<Node<T>>) -> bool {
        let mut links = self.links.lock();
        if node.removed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let prev = node.prev.read().as_ref().and_then(Weak::upgrade);
        let next = node.next.read().clone();

        match &prev {
            Some(p) => *p.next.write() = next.clone(),
            None => links.head = next.clone(),
        }
        match &next {
            Some(n) => *n.prev.write() = prev.as_ref().map(Arc::downgrade),
            None => links.tail = prev,
        }

        *node.prev.write() = None;

        self.len.fetch_sub(1, Ordering::Release);
        if links.head.is_none() {
            self.signal.send_replace(false);
        }
        true
    }

    /// Number of nodes currently linked.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to the non-empty signal.
    ///
    /// The receiver observes `true` whenever [`ConcurrentList::front`] is
    /// non-nil. Consumers park with `rx.wait_for(|ready| *ready)` and then
    /// traverse from the front. Any number of waiters may subscribe.
    pub fn wait_signal(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }
}

impl<T> Default for ConcurrentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ConcurrentList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentList")
            .field("len", &self.len())
            .finish()
    }
}
