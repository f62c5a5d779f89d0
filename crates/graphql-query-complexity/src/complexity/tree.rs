use std::collections::{HashMap, HashSet};

use crate::CostAnnotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CostNodeId(usize);

/// How a node contributes on top of its children.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CostKind<'a> {
    /// The document root and fragment definitions only group their children.
    Container,
    /// A selected field with the annotation resolved for it.
    Field(Option<&'a CostAnnotation>),
}

#[derive(Debug)]
pub(crate) struct CostNode<'a> {
    pub kind: CostKind<'a>,
    /// Flat cost declared on the type the field resolves to.
    pub own_complexity: usize,
    pub multipliers: Vec<usize>,
    pub children: Vec<ChildRef<'a>>,
}

impl<'a> CostNode<'a> {
    pub fn container() -> Self {
        CostNode {
            kind: CostKind::Container,
            own_complexity: 0,
            multipliers: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn field(annotation: Option<&'a CostAnnotation>) -> Self {
        CostNode {
            kind: CostKind::Field(annotation),
            ..Self::container()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ChildRef<'a> {
    Node(CostNodeId),
    /// Resolved by name once the whole document has been walked.
    Fragment(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FoldError {
    /// Fragment names along the spread path, starting and ending with the same fragment.
    FragmentCycle(Vec<String>),
}

/// Arena of the cost nodes built during one pass, with the fragment table.
#[derive(Debug, Default)]
pub(crate) struct CostTree<'a> {
    nodes: Vec<CostNode<'a>>,
    fragments: HashMap<&'a str, CostNodeId>,
}

impl<'a> std::ops::Index<CostNodeId> for CostTree<'a> {
    type Output = CostNode<'a>;

    fn index(&self, index: CostNodeId) -> &CostNode<'a> {
        &self.nodes[index.0]
    }
}

impl<'a> std::ops::IndexMut<CostNodeId> for CostTree<'a> {
    fn index_mut(&mut self, index: CostNodeId) -> &mut CostNode<'a> {
        &mut self.nodes[index.0]
    }
}

impl<'a> CostTree<'a> {
    pub fn push(&mut self, node: CostNode<'a>) -> CostNodeId {
        let id = CostNodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn register_fragment(&mut self, name: &'a str, id: CostNodeId) {
        self.fragments.entry(name).or_insert(id);
    }

    pub fn fold(&self, root: CostNodeId, default_complexity: usize) -> Result<usize, FoldError> {
        Folder {
            tree: self,
            default_complexity,
            folded_fragments: HashMap::new(),
            in_progress: Vec::new(),
            in_progress_names: HashSet::new(),
        }
        .fold(root)
    }
}

enum Frame<'a> {
    Node {
        id: CostNodeId,
        next_child: usize,
        children: usize,
    },
    /// Marks the end of a fragment body, its folded value is memoized when popped.
    Fragment(&'a str),
}

impl Frame<'_> {
    fn node(id: CostNodeId) -> Self {
        Frame::Node {
            id,
            next_child: 0,
            children: 0,
        }
    }
}

struct Folder<'t, 'a> {
    tree: &'t CostTree<'a>,
    default_complexity: usize,
    /// A fragment folds to the same value wherever it is spread.
    folded_fragments: HashMap<&'a str, usize>,
    in_progress: Vec<&'a str>,
    in_progress_names: HashSet<&'a str>,
}

impl<'a> Folder<'_, 'a> {
    /// Post-order fold with an explicit stack, spread chains can be arbitrarily long.
    fn fold(&mut self, root: CostNodeId) -> Result<usize, FoldError> {
        let tree = self.tree;
        let mut stack = vec![Frame::node(root)];
        let mut folded: Option<usize> = None;

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Node {
                    id,
                    next_child,
                    children,
                } => {
                    let children = children.saturating_add(folded.take().unwrap_or(0));
                    let node = &tree[id];

                    let Some(child) = node.children.get(next_child) else {
                        folded = Some(self.complexity(node, children));
                        continue;
                    };

                    stack.push(Frame::Node {
                        id,
                        next_child: next_child + 1,
                        children,
                    });

                    match *child {
                        ChildRef::Node(child) => stack.push(Frame::node(child)),
                        ChildRef::Fragment(name) => folded = self.enter_fragment(name, &mut stack)?,
                    }
                }
                Frame::Fragment(name) => {
                    let complexity = folded.unwrap_or(0);

                    self.in_progress.pop();
                    self.in_progress_names.remove(name);
                    self.folded_fragments.insert(name, complexity);

                    folded = Some(complexity);
                }
            }
        }

        Ok(folded.unwrap_or(0))
    }

    /// Either the already known value of the fragment, or `None` after
    /// scheduling its body on the stack.
    fn enter_fragment(&mut self, name: &'a str, stack: &mut Vec<Frame<'a>>) -> Result<Option<usize>, FoldError> {
        if let Some(&complexity) = self.folded_fragments.get(name) {
            return Ok(Some(complexity));
        }

        if self.in_progress_names.contains(name) {
            let start = self.in_progress.iter().position(|in_progress| *in_progress == name);
            let mut cycle = self.in_progress[start.unwrap_or(0)..]
                .iter()
                .map(|name| name.to_string())
                .collect::<Vec<_>>();
            cycle.push(name.to_string());

            return Err(FoldError::FragmentCycle(cycle));
        }

        let Some(&id) = self.tree.fragments.get(name) else {
            tracing::debug!("No definition for spread fragment {name}, it contributes nothing");
            return Ok(Some(0));
        };

        self.in_progress.push(name);
        self.in_progress_names.insert(name);

        stack.push(Frame::Fragment(name));
        stack.push(Frame::node(id));

        Ok(None)
    }

    fn complexity(&self, node: &CostNode<'a>, children: usize) -> usize {
        match node.kind {
            CostKind::Container => children,
            CostKind::Field(Some(CostAnnotation::List {
                complexity,
                assumed_size,
                ..
            })) => {
                // The per item cost: the list's own weight, its landing type and its selections.
                let base = complexity
                    .unwrap_or(0)
                    .saturating_add(node.own_complexity)
                    .saturating_add(children);

                if node.multipliers.is_empty() {
                    base.saturating_mul(assumed_size.unwrap_or(0))
                } else {
                    // Independent size arguments add up, they do not compound.
                    node.multipliers
                        .iter()
                        .fold(0usize, |total, multiplier| total.saturating_add(base.saturating_mul(*multiplier)))
                }
            }
            CostKind::Field(Some(CostAnnotation::Flat { complexity })) => {
                complexity.unwrap_or(self.default_complexity).saturating_add(children)
            }
            CostKind::Field(None) => self.default_complexity.saturating_add(children),
        }
    }
}
