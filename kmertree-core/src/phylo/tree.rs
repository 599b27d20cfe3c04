use super::distance::DistanceMatrix;
use super::newick;
use crate::seq::SequenceSet;

/// A branch from a parent (or from the base) down to `node`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Child {
    pub node: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: usize,
    pub parent: Option<usize>,
    /// Number of leaves in the subtree rooted here.
    pub size: usize,
    pub children: Option<[Child; 2]>,
    pub name: Option<Box<str>>,
}

impl TreeNode {
    fn leaf(id: usize, name: Box<str>) -> Self {
        Self {
            id,
            parent: None,
            size: 1,
            children: None,
            name: Some(name),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn child1(&self) -> Option<Child> {
        self.children.map(|c| c[0])
    }

    pub fn child2(&self) -> Option<Child> {
        self.children.map(|c| c[1])
    }
}

/// Append-only arena of tree nodes.
///
/// Leaves occupy indices `0..n` in input order. Every join appends one
/// internal node; existing indices are never moved or removed. The last two
/// (rooted) or three (unrooted) subtrees are not joined into an arena node:
/// they form the tree's base, which becomes the outermost parentheses of the
/// Newick string.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    base: Vec<Child>,
}

impl Tree {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        let nodes = names
            .into_iter()
            .enumerate()
            .map(|(id, name)| TreeNode::leaf(id, name.into()))
            .collect();
        Self {
            nodes,
            base: Vec::new(),
        }
    }

    /// One leaf per sequence, named after it.
    pub fn from_sequences(set: &SequenceSet) -> Self {
        Self::from_names(set.names().iter().cloned())
    }

    /// One leaf per matrix row, named by its label or, if unlabeled, its id.
    pub fn from_matrix(dist: &DistanceMatrix) -> Self {
        Self::from_names(dist.rows().iter().zip(dist.labels()).map(|(row, label)| {
            if label.is_empty() {
                row.id.to_string().into_boxed_str()
            } else {
                label.clone()
            }
        }))
    }

    /// Join unparented nodes `i` and `j` under a new node and return its index.
    ///
    /// # Panics
    ///
    /// Panics if `i == j`, either index is out of range, either node already
    /// has a parent, or the tree has been finished.
    pub fn join_nodes(&mut self, i: usize, j: usize, d_i: f64, d_j: f64) -> usize {
        assert!(self.base.is_empty(), "cannot join nodes of a finished tree");
        assert_ne!(i, j, "cannot join node {i} with itself");
        assert!(
            i < self.nodes.len() && j < self.nodes.len(),
            "join of ({i}, {j}) out of range for {} nodes",
            self.nodes.len()
        );
        assert!(
            self.nodes[i].parent.is_none() && self.nodes[j].parent.is_none(),
            "join of ({i}, {j}) would re-parent a node"
        );

        let id = self.nodes.len();
        let size = self.nodes[i].size + self.nodes[j].size;
        self.nodes.push(TreeNode {
            id,
            parent: None,
            size,
            children: Some([
                Child {
                    node: i,
                    distance: d_i,
                },
                Child {
                    node: j,
                    distance: d_j,
                },
            ]),
            name: None,
        });
        self.nodes[i].parent = Some(id);
        self.nodes[j].parent = Some(id);
        id
    }

    /// Close the tree by attaching every remaining root to the base.
    ///
    /// # Panics
    ///
    /// Panics if `base` does not name each currently unparented node exactly
    /// once, or holds fewer than two entries.
    pub fn finish(&mut self, base: Vec<Child>) {
        assert!(self.base.is_empty(), "tree already finished");
        assert!(base.len() >= 2, "a tree base needs at least two subtrees");
        let mut named: Vec<usize> = base.iter().map(|c| c.node).collect();
        named.sort_unstable();
        assert_eq!(named, self.roots(), "base must list every unparented node once");
        self.base = base;
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn leaves(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    pub fn leaf_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.name.as_deref().unwrap_or("").to_string())
            .collect()
    }

    pub fn node(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn children(&self, idx: usize) -> Option<[Child; 2]> {
        self.nodes[idx].children
    }

    /// Nodes without a parent, in index order.
    pub fn roots(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    pub fn base(&self) -> &[Child] {
        &self.base
    }

    pub fn is_complete(&self) -> bool {
        !self.base.is_empty()
    }

    /// A two-way base is a root; a three-way base is an unrooted trifurcation.
    pub fn is_rooted(&self) -> bool {
        self.base.len() == 2
    }

    /// Length of the branch above `idx`, if it has been attached.
    pub fn edge_length(&self, idx: usize) -> Option<f64> {
        match self.nodes[idx].parent {
            Some(p) => self.nodes[p]
                .children
                .and_then(|c| c.iter().find(|c| c.node == idx).map(|c| c.distance)),
            None => self
                .base
                .iter()
                .find(|c| c.node == idx)
                .map(|c| c.distance),
        }
    }

    pub(crate) fn set_edge_length(&mut self, idx: usize, len: f64) {
        let slot = match self.nodes[idx].parent {
            Some(p) => self.nodes[p]
                .children
                .as_mut()
                .and_then(|c| c.iter_mut().find(|c| c.node == idx)),
            None => self.base.iter_mut().find(|c| c.node == idx),
        };
        if let Some(child) = slot {
            child.distance = len;
        }
    }

    /// Path length from `idx` down to its leaves, following first children.
    pub fn height(&self, idx: usize) -> f64 {
        let mut h = 0.0;
        let mut cur = idx;
        while let Some(c) = self.nodes[cur].child1() {
            h += c.distance;
            cur = c.node;
        }
        h
    }

    /// Leaf indices under `idx`.
    pub fn leaves_below(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes[idx].size);
        let mut stack = vec![idx];
        while let Some(cur) = stack.pop() {
            match self.nodes[cur].children {
                Some([a, b]) => {
                    stack.push(b.node);
                    stack.push(a.node);
                }
                None => out.push(cur),
            }
        }
        out
    }

    /// Sum of branch lengths between every pair of leaves, indexed by leaf id.
    ///
    /// # Panics
    ///
    /// Panics if the tree is not complete.
    pub fn patristic_matrix(&self) -> Vec<Vec<f64>> {
        assert!(self.is_complete(), "patristic distances need a finished tree");
        let parents: Vec<Option<usize>> = self.nodes.iter().map(|n| n.parent).collect();
        // Parents always sit after their children, so a reverse sweep sees them first.
        let mut depths = vec![0.0f64; self.nodes.len()];
        for idx in (0..self.nodes.len()).rev() {
            let above = match parents[idx] {
                Some(p) => depths[p],
                None => 0.0,
            };
            depths[idx] = above + self.edge_length(idx).unwrap_or(0.0);
        }
        pairwise_distances(&parents, &depths, &self.leaves())
    }

    /// Newick fragment for the subtree rooted at `idx`, without a trailing `;`.
    pub fn subtree_newick(&self, idx: usize) -> String {
        let mut s = String::new();
        newick::write_subtree(self, idx, &mut s);
        s
    }

    /// The full Newick string, once the tree is complete.
    pub fn newick(&self) -> Option<String> {
        self.is_complete().then(|| newick::to_newick(self))
    }
}

/// Pairwise path lengths between `leaves`, given each node's parent and its
/// depth below a common (possibly virtual) top.
pub(crate) fn pairwise_distances(
    parents: &[Option<usize>],
    depths: &[f64],
    leaves: &[usize],
) -> Vec<Vec<f64>> {
    let n = leaves.len();
    let mut out = vec![vec![0.0f64; n]; n];
    let mut on_path = vec![false; parents.len()];

    for (a_pos, &a) in leaves.iter().enumerate() {
        let mut cur = Some(a);
        while let Some(x) = cur {
            on_path[x] = true;
            cur = parents[x];
        }

        for (b_pos, &b) in leaves.iter().enumerate().skip(a_pos + 1) {
            let mut cur = Some(b);
            let mut lca_depth = 0.0;
            while let Some(x) = cur {
                if on_path[x] {
                    lca_depth = depths[x];
                    break;
                }
                cur = parents[x];
            }
            let d = depths[a] + depths[b] - 2.0 * lca_depth;
            out[a_pos][b_pos] = d;
            out[b_pos][a_pos] = d;
        }

        let mut cur = Some(a);
        while let Some(x) = cur {
            on_path[x] = false;
            cur = parents[x];
        }
    }
    out
}
