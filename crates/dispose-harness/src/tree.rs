#![forbid(unsafe_code)]

//! Declarative composite trees.
//!
//! A [`TreeSpec`] describes a tree of composites whose leaves are
//! [`Probe`]s. [`build`] turns it into live composites wired to one
//! [`RecordingSink`], keeping a [`ProbeHandle`] for every leaf so tests can
//! check release counts after teardown.
//!
//! # Example
//!
//! ```rust
//! use dispose_harness::probe::Behavior;
//! use dispose_harness::recording::RecordingSink;
//! use dispose_harness::tree::{TreeSpec, build};
//!
//! let spec = TreeSpec::Node(vec![
//!     TreeSpec::Node(vec![TreeSpec::Leaf(Behavior::Fail)]),
//!     TreeSpec::Leaf(Behavior::Succeed),
//! ]);
//! let sink = RecordingSink::new();
//! let tree = build(&spec, &sink).unwrap();
//!
//! let err = tree.root.release().unwrap_err();
//! assert_eq!(err.leaf_count(), spec.leaf_failures());
//! assert_eq!(sink.len(), 1);
//! assert!(tree.probes.iter().all(|p| p.release_count() == 1));
//! ```

use dispose_core::composite::CompositeDisposable;
use dispose_core::error::ReleaseError;

use crate::probe::{Behavior, Probe, ProbeHandle};
use crate::recording::RecordingSink;

/// Shape of a composite tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSpec {
    /// A probe member.
    Leaf(Behavior),
    /// A nested composite holding the given children in order.
    Node(Vec<TreeSpec>),
}

impl TreeSpec {
    /// Children of a node (empty for a leaf).
    #[must_use]
    pub fn children(&self) -> &[TreeSpec] {
        match self {
            Self::Leaf(_) => &[],
            Self::Node(children) => children,
        }
    }

    /// Number of probe leaves.
    #[must_use]
    pub fn leaves(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Node(children) => children.iter().map(Self::leaves).sum(),
        }
    }

    /// Number of probe leaves whose release fails or panics.
    #[must_use]
    pub fn leaf_failures(&self) -> usize {
        match self {
            Self::Leaf(behavior) => usize::from(behavior.is_failure()),
            Self::Node(children) => children.iter().map(Self::leaf_failures).sum(),
        }
    }

    /// Nesting depth; a bare leaf has depth 0, a flat node depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Node(children) => 1 + children.iter().map(Self::depth).max().unwrap_or(0),
        }
    }
}

/// Live composites built from a [`TreeSpec`].
#[derive(Debug)]
pub struct BuiltTree {
    pub root: CompositeDisposable,
    /// One handle per leaf, in depth-first order.
    pub probes: Vec<ProbeHandle>,
    /// Ids of every composite in the tree, root first.
    pub composite_ids: Vec<u64>,
}

/// Build live composites for `spec`. A bare leaf gets wrapped in a root node.
pub fn build(spec: &TreeSpec, sink: &RecordingSink) -> Result<BuiltTree, ReleaseError> {
    let mut probes = Vec::new();
    let mut composite_ids = Vec::new();
    let root = match spec {
        TreeSpec::Leaf(_) => build_node(
            std::slice::from_ref(spec),
            sink,
            &mut probes,
            &mut composite_ids,
        )?,
        TreeSpec::Node(children) => build_node(children, sink, &mut probes, &mut composite_ids)?,
    };
    Ok(BuiltTree {
        root,
        probes,
        composite_ids,
    })
}

fn build_node(
    children: &[TreeSpec],
    sink: &RecordingSink,
    probes: &mut Vec<ProbeHandle>,
    composite_ids: &mut Vec<u64>,
) -> Result<CompositeDisposable, ReleaseError> {
    let composite = CompositeDisposable::new().with_sink(sink.clone());
    composite_ids.push(composite.id());
    for child in children {
        match child {
            TreeSpec::Leaf(behavior) => {
                let (probe, handle) = Probe::new(format!("p{}", probes.len()), *behavior);
                probes.push(handle);
                composite.push(probe)?;
            }
            TreeSpec::Node(grandchildren) => {
                let nested = build_node(grandchildren, sink, probes, composite_ids)?;
                composite.push(nested)?;
            }
        }
    }
    Ok(composite)
}
