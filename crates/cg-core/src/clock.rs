//! Tree clock: a forkable, binary-tree-shaped logical clock.
//!
//! Each clone owns an identity leaf somewhere in the tree. `fork` splits that
//! leaf into two children, handing one off as a brand-new identity while the
//! original clone keeps the other; every leaf keeps observing the same ticks
//! it always did. `merge` reconciles two (possibly differently shaped) trees
//! by taking the per-leaf maximum, expanding the coarser side to match the
//! finer one so lineages are never lost.

use serde::{Deserialize, Serialize};
use std::cmp::max;

/// Which child of a fork a path element selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// A node in the clock tree: either a leaf tick count or an unlabeled fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Leaf(u64),
    Fork(Box<Node>, Box<Node>),
}

impl Node {
    fn leaf(n: u64) -> Self {
        Node::Leaf(n)
    }

    /// Navigate `path` from this node; `Some(n)` only if the path lands
    /// exactly on a leaf (neither short nor long of the tree's actual depth).
    fn navigate(&self, path: &[Side]) -> Option<u64> {
        let mut cur = self;
        for side in path {
            match cur {
                Node::Leaf(_) => return None,
                Node::Fork(l, r) => {
                    cur = match side {
                        Side::Left => l,
                        Side::Right => r,
                    }
                }
            }
        }
        match cur {
            Node::Leaf(n) => Some(*n),
            Node::Fork(_, _) => None,
        }
    }

    fn replace_at(&self, path: &[Side], f: impl FnOnce(u64) -> Node) -> Node {
        match path.split_first() {
            None => match self {
                Node::Leaf(n) => f(*n),
                Node::Fork(_, _) => {
                    // identity path must always resolve to a leaf
                    self.clone()
                }
            },
            Some((side, rest)) => match self {
                Node::Leaf(n) => Node::Leaf(*n), // path overruns a leaf; identity path is malformed
                Node::Fork(l, r) => match side {
                    Side::Left => Node::Fork(Box::new(l.replace_at(rest, f)), r.clone()),
                    Side::Right => Node::Fork(l.clone(), Box::new(r.replace_at(rest, f))),
                },
            },
        }
    }

    /// Per-leaf maximum of two trees, expanding whichever side is coarser by
    /// duplicating its known tick count into the children it hasn't split.
    fn merge(&self, other: &Node) -> Node {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => Node::Leaf(max(*a, *b)),
            (Node::Leaf(a), Node::Fork(l, r)) => {
                Node::Fork(Box::new(Node::leaf(*a).merge(l)), Box::new(Node::leaf(*a).merge(r)))
            }
            (Node::Fork(l, r), Node::Leaf(b)) => {
                Node::Fork(Box::new(l.merge(&Node::leaf(*b))), Box::new(r.merge(&Node::leaf(*b))))
            }
            (Node::Fork(al, ar), Node::Fork(bl, br)) => {
                Node::Fork(Box::new(al.merge(bl)), Box::new(ar.merge(br)))
            }
        }
    }

    /// True if any leaf of `other` exceeds the corresponding leaf of `self`.
    /// A leaf `self` hasn't split down to is treated as its own tick count on
    /// both sides (see [`Node::merge`]); a leaf genuinely absent from the
    /// comparison (neither side has split there) never contributes.
    fn any_lt(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => b > a,
            (Node::Leaf(a), Node::Fork(l, r)) => {
                Node::leaf(*a).any_lt(l) || Node::leaf(*a).any_lt(r)
            }
            (Node::Fork(l, r), Node::Leaf(b)) => l.any_lt(&Node::leaf(*b)) || r.any_lt(&Node::leaf(*b)),
            (Node::Fork(al, ar), Node::Fork(bl, br)) => al.any_lt(bl) || ar.any_lt(br),
        }
    }
}

/// Forkable logical clock: a tree shape plus the path to this process's
/// identity leaf within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeClock {
    root: Node,
    identity: Vec<Side>,
}

/// Whether [`TreeClock::any_lt`] also considers the two clocks' identity
/// leaves, or only the leaves observed from other processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyLtMode {
    ExcludeIds,
    IncludeIds,
}

impl TreeClock {
    /// The unique root clock: a single identity leaf at tick 0.
    pub fn genesis() -> Self {
        TreeClock {
            root: Node::Leaf(0),
            identity: Vec::new(),
        }
    }

    /// Tick count on this clock's own identity leaf.
    pub fn ticks(&self) -> u64 {
        self.root
            .navigate(&self.identity)
            .expect("identity path always resolves to a leaf")
    }

    /// A new clock with the identity leaf advanced by one.
    #[must_use]
    pub fn tick(&self) -> Self {
        let root = self.root.replace_at(&self.identity, |n| Node::Leaf(n + 1));
        TreeClock {
            root,
            identity: self.identity.clone(),
        }
    }

    /// Split the identity leaf into two children. `self` keeps the left
    /// child as its identity; the returned clock owns the right child as a
    /// brand-new process identity. Both halves retain every tick either one
    /// had observed up to the fork.
    #[must_use]
    pub fn fork(&self) -> (Self, Self) {
        let root = self
            .root
            .replace_at(&self.identity, |n| Node::Fork(Box::new(Node::Leaf(n)), Box::new(Node::Leaf(n))));

        let mut left_identity = self.identity.clone();
        left_identity.push(Side::Left);
        let mut right_identity = self.identity.clone();
        right_identity.push(Side::Right);

        (
            TreeClock {
                root: root.clone(),
                identity: left_identity,
            },
            TreeClock {
                root,
                identity: right_identity,
            },
        )
    }

    /// Per-leaf maximum of `a` and `b`; the identity leaf of the result is
    /// `a`'s.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        TreeClock {
            root: a.root.merge(&b.root),
            identity: a.identity.clone(),
        }
    }

    /// True iff some leaf of `other` exceeds the corresponding leaf of
    /// `self`. With [`AnyLtMode::ExcludeIds`] (the common case) both clocks'
    /// own identity leaves are skipped, since a clock always ticks ahead of
    /// its own past self and that comparison carries no information about
    /// causal novelty.
    pub fn any_lt(&self, other: &Self, mode: AnyLtMode) -> bool {
        match mode {
            AnyLtMode::IncludeIds => self.root.any_lt(&other.root),
            AnyLtMode::ExcludeIds => {
                let self_masked = self.root.replace_at(&self.identity, |_| Node::Leaf(0));
                let other_masked = other.root.replace_at(&self.identity, |_| Node::Leaf(0));
                let self_masked = self_masked.replace_at(&other.identity, |_| Node::Leaf(0));
                let other_masked = other_masked.replace_at(&other.identity, |_| Node::Leaf(0));
                self_masked.any_lt(&other_masked)
            }
        }
    }

    /// Ticks attributed to `other`'s identity, as observed within `self`, or
    /// `None` if `self` has never learned that `other`'s identity leaf
    /// exists (it hasn't split down that far yet).
    pub fn get_ticks(&self, other: &Self) -> Option<u64> {
        self.root.navigate(&other.identity)
    }

    /// This clock's own identity path, for debugging/wire encoding.
    pub fn identity_path(&self) -> &[Side] {
        &self.identity
    }

    /// True if this clock's identity leaf is at the same tree position as
    /// `other`'s — the basis of the mandatory self-echo check in §4.1.
    pub fn same_identity(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}
