//! Dependency orderer: a total order over source units from `@include`
//! directives, ties broken by original source order.

use crate::error::{Error, Result};
use crate::model::SourcePos;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// `before` must be processed before `after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationEdge {
    pub before: String,
    pub after: String,
    pub pos: SourcePos,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Order `units` (given in source order) so that every edge is respected.
///
/// Edges naming units outside `units` must be filtered out by the caller.
pub fn collate(units: &[String], edges: &[CollationEdge]) -> Result<Vec<String>> {
    let position: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(i, u)| (u.as_str(), i))
        .collect();

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    let mut indegree = vec![0usize; units.len()];
    for edge in edges {
        let (Some(&from), Some(&to)) = (position.get(edge.before.as_str()), position.get(edge.after.as_str())) else {
            continue;
        };
        if !successors[from].contains(&to) {
            successors[from].push(to);
            indegree[to] += 1;
        }
    }
    for list in &mut successors {
        list.sort_unstable();
    }

    if let Some(cycle) = find_cycle(&successors) {
        return Err(Error::Cycle {
            chain: cycle.into_iter().map(|i| units[i].clone()).collect(),
        });
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(units.len());
    while let Some(Reverse(next)) = ready.pop() {
        order.push(units[next].clone());
        for &succ in &successors[next] {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                ready.push(Reverse(succ));
            }
        }
    }
    Ok(order)
}

/// Depth-first search with an explicit recursion stack; returns the first
/// cycle found as a closed chain (first node repeated at the end).
fn find_cycle(successors: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; successors.len()];
    let mut stack = Vec::new();
    for start in 0..successors.len() {
        if marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(start, successors, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    node: usize,
    successors: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::OnStack;
    stack.push(node);
    for &next in &successors[node] {
        match marks[next] {
            Mark::OnStack => {
                let from = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut chain = stack[from..].to_vec();
                chain.push(next);
                return Some(chain);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, successors, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
    None
}
