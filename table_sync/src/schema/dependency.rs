//! Foreign-key dependency ordering for table creation

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::types::TableSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Table-to-table reference graph over the declared schemas
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    /// Table names in registration order
    nodes: Vec<&'a str>,
    /// Referenced tables per node, by node index, in field order
    edges: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph. References to tables outside `schemas`, and
    /// self references, are not edges.
    pub fn build<S: AsRef<TableSchema>>(schemas: &'a [S]) -> Self {
        let nodes: Vec<&str> = schemas.iter().map(|s| s.as_ref().name()).collect();
        let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let edges = schemas
            .iter()
            .enumerate()
            .map(|(i, schema)| {
                let mut targets: Vec<usize> = Vec::new();
                for table in schema.as_ref().referenced_tables() {
                    if let Some(&target) = index.get(table) {
                        if target != i && !targets.contains(&target) {
                            targets.push(target);
                        }
                    }
                }
                targets
            })
            .collect();

        Self { nodes, edges }
    }

    /// Topological order: every table comes after the tables it references.
    /// Unconstrained tables keep registration order.
    pub fn order(&self) -> Result<Vec<String>> {
        let mut state = vec![Visit::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        for node in 0..self.nodes.len() {
            self.visit(node, &mut state, &mut order)?;
        }

        Ok(order)
    }

    fn visit(&self, node: usize, state: &mut [Visit], order: &mut Vec<String>) -> Result<()> {
        match state[node] {
            Visit::Done => return Ok(()),
            Visit::InProgress => {
                return Err(Error::CyclicDependency {
                    table: self.nodes[node].to_string(),
                })
            }
            Visit::Unvisited => {}
        }

        state[node] = Visit::InProgress;
        for &target in &self.edges[node] {
            self.visit(target, state, order)?;
        }
        state[node] = Visit::Done;
        order.push(self.nodes[node].to_string());

        Ok(())
    }
}

/// Resolve the creation order of a set of declared tables
pub fn order<S: AsRef<TableSchema>>(schemas: &[S]) -> Result<Vec<String>> {
    DependencyGraph::build(schemas).order()
}
