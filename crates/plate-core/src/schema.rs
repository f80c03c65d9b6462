use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Block,
    Inline,
    /// Only valid inside a parent that names it in `ChildConstraint::Kinds`.
    Component,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
    Kinds(Vec<String>),
}

impl ChildConstraint {
    pub fn accepts(&self, child: &NodeSpec) -> bool {
        match self {
            ChildConstraint::None => false,
            ChildConstraint::BlockOnly => child.role == NodeRole::Block,
            ChildConstraint::InlineOnly => child.role == NodeRole::Inline,
            ChildConstraint::Any => child.role != NodeRole::Component,
            ChildConstraint::Kinds(kinds) => kinds.iter().any(|kind| *kind == child.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
    #[serde(default)]
    pub code: bool,
}

impl NodeSpec {
    pub fn block(kind: impl Into<String>, children: ChildConstraint) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: false,
            children,
            code: false,
        }
    }

    pub fn text_block(kind: impl Into<String>) -> Self {
        Self::block(kind, ChildConstraint::InlineOnly)
    }

    pub fn void_block(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
            code: false,
        }
    }

    pub fn inline_void(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Inline,
            is_void: true,
            children: ChildConstraint::None,
            code: false,
        }
    }

    pub fn component(kind: impl Into<String>, children: ChildConstraint) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Component,
            is_void: false,
            children,
            code: false,
        }
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn is_text_block(&self) -> bool {
        !self.is_void && self.children == ChildConstraint::InlineOnly
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSpec {
    pub kind: String,
}

impl MarkSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateNode(String),
    #[error("duplicate mark spec kind: {0}")]
    DuplicateMark(String),
}

/// The node and mark vocabulary a document is allowed to use.
///
/// The document root is implicit and accepts any `Block` node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
}

impl Schema {
    pub fn new(
        nodes: impl IntoIterator<Item = NodeSpec>,
        marks: impl IntoIterator<Item = MarkSpec>,
    ) -> Result<Self, SchemaError> {
        let mut schema = Self::default();
        for spec in nodes {
            schema.add_node(spec)?;
        }
        for spec in marks {
            schema.add_mark(spec)?;
        }
        Ok(schema)
    }

    pub fn add_node(&mut self, spec: NodeSpec) -> Result<(), SchemaError> {
        if self.has_node(&spec.kind) {
            return Err(SchemaError::DuplicateNode(spec.kind));
        }
        self.nodes.push(spec);
        Ok(())
    }

    pub fn add_mark(&mut self, spec: MarkSpec) -> Result<(), SchemaError> {
        if self.has_mark(&spec.kind) {
            return Err(SchemaError::DuplicateMark(spec.kind));
        }
        self.marks.push(spec);
        Ok(())
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn marks(&self) -> &[MarkSpec] {
        &self.marks
    }

    pub fn node(&self, kind: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|spec| spec.kind == kind)
    }

    pub fn mark(&self, kind: &str) -> Option<&MarkSpec> {
        self.marks.iter().find(|spec| spec.kind == kind)
    }

    pub fn has_node(&self, kind: &str) -> bool {
        self.node(kind).is_some()
    }

    pub fn has_mark(&self, kind: &str) -> bool {
        self.mark(kind).is_some()
    }

    pub fn is_text_block(&self, kind: &str) -> bool {
        self.node(kind).is_some_and(NodeSpec::is_text_block)
    }

    /// Whether `child` may sit directly inside `parent` (`None` is the document root).
    ///
    /// Unknown kinds are treated as plain blocks so foreign content is never
    /// rejected by accident.
    pub fn accepts(&self, parent: Option<&str>, child: &str) -> bool {
        let fallback;
        let child_spec = match self.node(child) {
            Some(spec) => spec,
            None => {
                fallback = NodeSpec::block(child, ChildConstraint::Any);
                &fallback
            }
        };

        match parent {
            None => ChildConstraint::BlockOnly.accepts(child_spec),
            Some(parent) => match self.node(parent) {
                Some(spec) => spec.children.accepts(child_spec),
                None => ChildConstraint::Any.accepts(child_spec),
            },
        }
    }

    /// Outer-first chain of kinds needed to hold `kind`, ending with `kind` itself.
    pub fn find_wrapping(&self, kind: &str) -> Option<Vec<String>> {
        const MAX_DEPTH: usize = 8;

        let mut chain = vec![self.node(kind)?.kind.clone()];
        let mut current = self.node(kind)?;
        while current.role == NodeRole::Component {
            if chain.len() > MAX_DEPTH {
                return None;
            }
            let parent = self.nodes.iter().find(|spec| {
                matches!(&spec.children, ChildConstraint::Kinds(kinds) if kinds.contains(&current.kind))
            })?;
            chain.push(parent.kind.clone());
            current = parent;
        }
        chain.reverse();
        Some(chain)
    }
}
