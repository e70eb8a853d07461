//! `Precondition` — a list of `(condition, optional resolver, required)`
//! gates in front of a main child (spec §4.3). Conditions/resolvers and the
//! main child all live in one flat `children` vec (required by
//! [`crate::node::BtNode::children`]); `specs`/`main_idx` record the shape.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

/// One gate: a condition, an optional resolver run when it fails, and
/// whether failing it (even after the resolver) is fatal to the whole node.
pub struct PreconditionEntry {
    pub condition: Box<dyn BtNode>,
    pub resolver: Option<Box<dyn BtNode>>,
    pub required: bool,
}

#[derive(Clone, Copy)]
struct Spec {
    condition_idx: usize,
    resolver_idx: Option<usize>,
    required: bool,
}

pub struct Precondition {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    specs: Vec<Spec>,
    main_idx: usize,
    cursor: usize,
    checked: bool,
}

impl Precondition {
    pub fn new(id: impl Into<String>, entries: Vec<PreconditionEntry>, main: Box<dyn BtNode>) -> Self {
        let mut children = Vec::new();
        let mut specs = Vec::with_capacity(entries.len());
        for entry in entries {
            let condition_idx = children.len();
            children.push(entry.condition);
            let resolver_idx = entry.resolver.map(|resolver| {
                let idx = children.len();
                children.push(resolver);
                idx
            });
            specs.push(Spec {
                condition_idx,
                resolver_idx,
                required: entry.required,
            });
        }
        let main_idx = children.len();
        children.push(main);
        Precondition {
            core: NodeCore::new(id, "Precondition"),
            children,
            specs,
            main_idx,
            cursor: 0,
            checked: false,
        }
    }

    /// Builds an empty-children `Precondition` whose `specs`/`main_idx` are
    /// derived purely from the gate shape (`required[i]`/`has_resolver[i]`),
    /// for the declarative loader: it constructs the node before appending
    /// children one at a time in the same condition[,resolver]*,main order
    /// this shape implies, so the flat positions line up without needing
    /// the nested subtrees up front.
    pub fn new_for_loading(
        id: impl Into<String>,
        required: Vec<bool>,
        has_resolver: Vec<bool>,
    ) -> Result<Self, TickError> {
        if required.len() != has_resolver.len() {
            return Err(TickError::configuration(
                "Precondition requires `required` and `has_resolver` of equal length",
            ));
        }
        let mut specs = Vec::with_capacity(required.len());
        let mut next_idx = 0usize;
        for (required, has_resolver) in required.into_iter().zip(has_resolver) {
            let condition_idx = next_idx;
            next_idx += 1;
            let resolver_idx = if has_resolver {
                let idx = next_idx;
                next_idx += 1;
                Some(idx)
            } else {
                None
            };
            specs.push(Spec {
                condition_idx,
                resolver_idx,
                required,
            });
        }
        Ok(Precondition {
            core: NodeCore::new(id, "Precondition"),
            children: Vec::new(),
            specs,
            main_idx: next_idx,
            cursor: 0,
            checked: false,
        })
    }
}

#[async_trait]
impl BtNode for Precondition {
    fn core(&self) -> &NodeCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }
    fn children(&self) -> &[Box<dyn BtNode>] {
        &self.children
    }
    fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>> {
        &mut self.children
    }
    fn clone_fresh(&self) -> Box<dyn BtNode> {
        Box::new(Precondition {
            core: NodeCore::new(self.core.id.clone(), "Precondition").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            specs: self.specs.clone(),
            main_idx: self.main_idx,
            cursor: 0,
            checked: false,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if !self.checked {
            while self.cursor < self.specs.len() {
                let spec = self.specs[self.cursor];
                ctx.check_cancelled()?;
                match self.children[spec.condition_idx].tick(ctx).await? {
                    Status::Success => {
                        self.cursor += 1;
                        continue;
                    }
                    Status::Running => return Ok(Status::Running),
                    Status::Failure => {
                        let resolved = match spec.resolver_idx {
                            None => false,
                            Some(resolver_idx) => {
                                ctx.check_cancelled()?;
                                match self.children[resolver_idx].tick(ctx).await? {
                                    Status::Running => return Ok(Status::Running),
                                    Status::Failure => false,
                                    Status::Success => {
                                        ctx.check_cancelled()?;
                                        match self.children[spec.condition_idx].tick(ctx).await? {
                                            Status::Success => true,
                                            Status::Running => return Ok(Status::Running),
                                            Status::Failure => false,
                                            Status::Idle => unreachable!("tick() never commits Idle"),
                                        }
                                    }
                                    Status::Idle => unreachable!("tick() never commits Idle"),
                                }
                            }
                        };
                        if resolved {
                            self.cursor += 1;
                            continue;
                        }
                        if spec.required {
                            self.cursor = 0;
                            return Ok(Status::Failure);
                        }
                        self.cursor += 1;
                    }
                    Status::Idle => unreachable!("tick() never commits Idle"),
                }
            }
            self.checked = true;
            self.cursor = 0;
        }

        ctx.check_cancelled()?;
        let status = self.children[self.main_idx].tick(ctx).await?;
        if status.is_terminal() {
            self.checked = false;
        }
        Ok(status)
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        for child in self.children.iter_mut() {
            if child.status() == Status::Running {
                child.halt(ctx).await;
            }
        }
    }

    fn on_reset(&mut self) {
        self.cursor = 0;
        self.checked = false;
    }
}
