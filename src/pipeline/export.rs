// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Text descriptions of a built task graph for external rendering tools.

use serde::Serialize;
use std::fmt::Write;

use crate::engine::container::{InputSource, TaskContainer};
use crate::slots::SlotDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphDescription {
    pub nodes: Vec<NodeDescription>,
    pub edges: Vec<EdgeDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescription {
    pub index: usize,
    pub name: String,
    pub thread_groups: Vec<String>,
    pub inputs: Vec<SlotDescription>,
    pub outputs: Vec<SlotDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDescription {
    pub name: String,
    pub value_type: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
}

/// Connection from an output slot to an input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeDescription {
    pub from: usize,
    pub output: usize,
    pub to: usize,
    pub input: usize,
}

fn slot(descriptor: &SlotDescriptor, external: bool) -> SlotDescription {
    SlotDescription {
        name: descriptor.name(),
        value_type: descriptor.type_name.to_string(),
        external,
    }
}

impl GraphDescription {
    pub(crate) fn of(containers: &[std::sync::Arc<TaskContainer>]) -> Self {
        let mut nodes = Vec::with_capacity(containers.len());
        let mut edges = Vec::new();

        for container in containers {
            let sources = container.sources();
            let inputs = container
                .input_descriptors()
                .iter()
                .zip(sources)
                .map(|(descriptor, source)| slot(descriptor, *source == InputSource::External))
                .collect();
            let outputs = container
                .output_descriptors()
                .iter()
                .map(|descriptor| slot(descriptor, false))
                .collect();

            for (input, source) in sources.iter().enumerate() {
                if let InputSource::Task { task, position } = *source {
                    edges.push(EdgeDescription {
                        from: task,
                        output: position,
                        to: container.index(),
                        input,
                    });
                }
            }

            nodes.push(NodeDescription {
                index: container.index(),
                name: container.name().to_string(),
                thread_groups: container.thread_groups().iter().map(str::to_string).collect(),
                inputs,
                outputs,
            });
        }

        edges.sort_by_key(|edge| (edge.from, edge.output, edge.to, edge.input));
        Self { nodes, edges }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Graphviz rendering: one record node per task, one edge per connection,
    /// external inputs drawn as dashed point nodes.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph pipeline {\n    rankdir=LR;\n    node [shape=record];\n");

        for node in &self.nodes {
            let inputs = ports(&node.inputs, 'i');
            let outputs = ports(&node.outputs, 'o');
            let _ = writeln!(
                dot,
                "    n{} [label=\"{{{{{}}}|{} {}|{{{}}}}}\"];",
                node.index,
                inputs,
                escape(&node.name),
                escape(&format!("{:?}", node.thread_groups)),
                outputs
            );
            for (position, input) in node.inputs.iter().enumerate() {
                if input.external {
                    let _ = writeln!(
                        dot,
                        "    x{}_{} [shape=point];\n    x{}_{} -> n{}:i{} [style=dashed];",
                        node.index, position, node.index, position, node.index, position
                    );
                }
            }
        }

        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "    n{}:o{} -> n{}:i{};",
                edge.from, edge.output, edge.to, edge.input
            );
        }

        dot.push_str("}\n");
        dot
    }
}

fn ports(slots: &[SlotDescription], prefix: char) -> String {
    slots
        .iter()
        .enumerate()
        .map(|(position, slot)| format!("<{}{}> {}", prefix, position, escape(&slot.name)))
        .collect::<Vec<_>>()
        .join("|")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '"' | '{' | '}' | '|' | '<' | '>' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_record_characters() {
        assert_eq!(escape("Vec<u8>"), "Vec\\<u8\\>");
        assert_eq!(escape("a|b"), "a\\|b");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_ports_are_numbered() {
        let slots = vec![
            SlotDescription {
                name: "LEFT".to_string(),
                value_type: "i32".to_string(),
                external: false,
            },
            SlotDescription {
                name: "RIGHT".to_string(),
                value_type: "i32".to_string(),
                external: true,
            },
        ];
        assert_eq!(ports(&slots, 'i'), "<i0> LEFT|<i1> RIGHT");
    }
}
