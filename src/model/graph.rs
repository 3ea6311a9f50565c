//! Directed dependency graph over cells.
//!
//! Edges point precedent → dependent: if `B1 = A1 * 2` the graph holds
//! `A1 → B1`. Nodes are interned to dense indices so traversals use flat
//! vectors instead of hash sets.

use super::address::CellKey;
use indexmap::IndexSet;
use std::collections::{HashMap, VecDeque};

/// Work budget for simple-cycle enumeration (edge visits).
const CYCLE_STEP_BUDGET: usize = 2_000_000;

/// Cycles counted beyond the reported ones, relative to the report cap.
const CYCLE_COUNT_FACTOR: usize = 10;

/// Adjacency-list dependency graph. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<CellKey>,
    ids: HashMap<CellKey, usize>,
    succs: Vec<IndexSet<usize>>,
    preds: Vec<IndexSet<usize>>,
    edge_count: usize,
}

/// Result of simple-cycle enumeration.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Reported cycles, each starting at its earliest-inserted cell
    pub cycles: Vec<Vec<CellKey>>,
    /// Cycles found, including those past the report cap
    pub total: usize,
    /// False when enumeration stopped early on its work budget
    pub exhaustive: bool,
}

impl CycleReport {
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.total > self.cycles.len() || !self.exhaustive
    }
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a node, returning its index.
    pub fn add_node(&mut self, key: &CellKey) -> usize {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(key.clone());
        self.ids.insert(key.clone(), id);
        self.succs.push(IndexSet::new());
        self.preds.push(IndexSet::new());
        id
    }

    /// Add `from → to`, interning both ends. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: &CellKey, to: &CellKey) {
        let a = self.add_node(from);
        let b = self.add_node(to);
        if self.succs[a].insert(b) {
            self.preds[b].insert(a);
            self.edge_count += 1;
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[must_use]
    pub fn contains(&self, key: &CellKey) -> bool {
        self.ids.contains_key(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CellKey> {
        self.nodes.iter()
    }

    /// Direct predecessors: the cells `key` reads.
    #[must_use]
    pub fn precedents(&self, key: &CellKey) -> Vec<&CellKey> {
        self.neighbours(key, &self.preds)
    }

    /// Direct successors: the cells that read `key`.
    #[must_use]
    pub fn dependents(&self, key: &CellKey) -> Vec<&CellKey> {
        self.neighbours(key, &self.succs)
    }

    fn neighbours<'a>(&'a self, key: &CellKey, adjacency: &'a [IndexSet<usize>]) -> Vec<&'a CellKey> {
        self.ids
            .get(key)
            .map(|&id| adjacency[id].iter().map(|&n| &self.nodes[n]).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn out_degree(&self, key: &CellKey) -> usize {
        self.ids.get(key).map_or(0, |&id| self.succs[id].len())
    }

    #[must_use]
    pub fn in_degree(&self, key: &CellKey) -> usize {
        self.ids.get(key).map_or(0, |&id| self.preds[id].len())
    }

    /// Every cell reachable downstream from `key`, excluding `key` itself
    /// unless it sits on a cycle.
    #[must_use]
    pub fn descendants(&self, key: &CellKey) -> Vec<&CellKey> {
        self.reach(std::iter::once(key), &self.succs)
    }

    /// Every cell `key` transitively reads.
    #[must_use]
    pub fn ancestors(&self, key: &CellKey) -> Vec<&CellKey> {
        self.reach(std::iter::once(key), &self.preds)
    }

    /// Union of the descendants of every key. A cell reachable from several
    /// starts appears once.
    pub fn union_descendants<'k>(&self, keys: impl IntoIterator<Item = &'k CellKey>) -> Vec<&CellKey> {
        self.reach(keys, &self.succs)
    }

    fn reach<'k>(
        &self,
        starts: impl IntoIterator<Item = &'k CellKey>,
        adjacency: &[IndexSet<usize>],
    ) -> Vec<&CellKey> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        let mut out = Vec::new();

        for start in starts {
            if let Some(&id) = self.ids.get(start) {
                queue.extend(adjacency[id].iter().copied());
            }
            while let Some(node) = queue.pop_front() {
                if seen[node] {
                    continue;
                }
                seen[node] = true;
                out.push(&self.nodes[node]);
                queue.extend(adjacency[node].iter().copied().filter(|&n| !seen[n]));
            }
        }
        out
    }

    /// Strongly connected components (Tarjan, iterative so deep chains cannot
    /// overflow the stack). Components come out in reverse topological order.
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;
        let n = self.nodes.len();
        let mut index = vec![UNVISITED; n];
        let mut low = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut next = 0;
        let mut components = Vec::new();
        let mut call: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            index[root] = next;
            low[root] = next;
            next += 1;
            stack.push(root);
            on_stack[root] = true;
            call.push((root, 0));

            while let Some(frame) = call.last_mut() {
                let v = frame.0;
                if frame.1 < self.succs[v].len() {
                    let w = self.succs[v][frame.1];
                    frame.1 += 1;
                    if index[w] == UNVISITED {
                        index[w] = next;
                        low[w] = next;
                        next += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        call.push((w, 0));
                    } else if on_stack[w] {
                        low[v] = low[v].min(index[w]);
                    }
                    continue;
                }

                call.pop();
                if let Some(&(parent, _)) = call.last() {
                    low[parent] = low[parent].min(low[v]);
                }
                if low[v] == index[v] {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
        components
    }

    /// Whether any cycle exists.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.strongly_connected_components()
            .iter()
            .any(|c| self.is_cyclic_component(c))
    }

    fn is_cyclic_component(&self, component: &[usize]) -> bool {
        component.len() > 1 || component.first().is_some_and(|&v| self.succs[v].contains(&v))
    }

    /// Enumerate simple cycles, reporting at most `max_reported`.
    ///
    /// Each cycle is found from its lowest-index node, searching only through
    /// higher-index nodes of the same strongly connected component, so no cycle
    /// is listed twice. Counting continues past the cap up to a bounded amount
    /// of work; `exhaustive` records whether every cycle was seen.
    #[must_use]
    pub fn simple_cycles(&self, max_reported: usize) -> CycleReport {
        let count_cap = max_reported.saturating_mul(CYCLE_COUNT_FACTOR).max(1);
        let mut report = CycleReport {
            exhaustive: true,
            ..CycleReport::default()
        };

        let mut component_of = vec![usize::MAX; self.nodes.len()];
        let mut components: Vec<Vec<usize>> = self
            .strongly_connected_components()
            .into_iter()
            .filter(|c| self.is_cyclic_component(c))
            .collect();
        for (c, members) in components.iter_mut().enumerate() {
            members.sort_unstable();
            for &v in members.iter() {
                component_of[v] = c;
            }
        }
        components.sort_by_key(|members| members[0]);

        let mut steps = 0usize;
        let mut on_path = vec![false; self.nodes.len()];

        'search: for members in &components {
            for &start in members {
                let component = component_of[start];
                let mut path = vec![start];
                let mut cursor = vec![0usize];
                on_path[start] = true;

                while let Some(pos) = cursor.last_mut() {
                    steps += 1;
                    if steps > CYCLE_STEP_BUDGET || report.total >= count_cap {
                        report.exhaustive = false;
                        for &v in &path {
                            on_path[v] = false;
                        }
                        break 'search;
                    }

                    let v = path[path.len() - 1];
                    if *pos < self.succs[v].len() {
                        let w = self.succs[v][*pos];
                        *pos += 1;
                        if w == start {
                            report.total += 1;
                            if report.cycles.len() < max_reported {
                                report
                                    .cycles
                                    .push(path.iter().map(|&n| self.nodes[n].clone()).collect());
                            }
                        } else if w > start && component_of[w] == component && !on_path[w] {
                            on_path[w] = true;
                            path.push(w);
                            cursor.push(0);
                        }
                    } else {
                        cursor.pop();
                        if let Some(v) = path.pop() {
                            on_path[v] = false;
                        }
                    }
                }
            }
        }

        tracing::debug!(
            cycles = report.total,
            exhaustive = report.exhaustive,
            "simple cycle enumeration finished"
        );
        report
    }
}
