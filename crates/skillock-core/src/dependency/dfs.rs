//! Three-color depth-first search over an index-based adjacency list.
//!
//! Uses an explicit stack instead of recursion so adversarially deep graphs
//! cannot overflow the call stack.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Every back-edge `(from, to)` found while visiting all vertices in index
/// order. A back-edge targets a vertex still on the DFS path, so the result
/// is empty exactly when the graph is acyclic.
pub(crate) fn back_edges(adjacency: &[Vec<usize>]) -> Vec<(usize, usize)> {
    let mut color = vec![Color::White; adjacency.len()];
    let mut found = Vec::new();
    // (vertex, index of the next successor to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..adjacency.len() {
        if color[start] != Color::White {
            continue;
        }
        color[start] = Color::Gray;
        stack.push((start, 0));

        while let Some(&(vertex, next)) = stack.last() {
            match adjacency[vertex].get(next) {
                Some(&succ) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match color[succ] {
                        Color::Gray => found.push((vertex, succ)),
                        Color::White => {
                            color[succ] = Color::Gray;
                            stack.push((succ, 0));
                        }
                        Color::Black => {}
                    }
                }
                None => {
                    color[vertex] = Color::Black;
                    stack.pop();
                }
            }
        }
    }

    found
}
