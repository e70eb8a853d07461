//! `ForEach` — iterates a blackboard sequence, ticking a single body child
//! once per element (spec §4.2).

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;
use serde_json::Value as Json;

pub struct ForEach {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    collection_key: String,
    item_key: String,
    index_key: Option<String>,
    cursor: usize,
}

impl ForEach {
    pub fn new(
        id: impl Into<String>,
        collection_key: impl Into<String>,
        item_key: impl Into<String>,
        index_key: Option<String>,
    ) -> Self {
        ForEach {
            core: NodeCore::new(id, "ForEach"),
            children: Vec::new(),
            collection_key: collection_key.into(),
            item_key: item_key.into(),
            index_key,
            cursor: 0,
        }
    }
}

#[async_trait]
impl BtNode for ForEach {
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
        Box::new(ForEach {
            core: NodeCore::new(self.core.id.clone(), "ForEach").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            collection_key: self.collection_key.clone(),
            item_key: self.item_key.clone(),
            index_key: self.index_key.clone(),
            cursor: 0,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        let body = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("ForEach requires a body child"))?;

        let collection = match ctx.blackboard.get(&self.collection_key) {
            None => return Err(TickError::operational(format!("missing collection key: {}", self.collection_key))),
            Some(Json::Array(items)) => items,
            Some(_) => return Err(TickError::operational(format!("collection key {} is not an array", self.collection_key))),
        };
        if collection.is_empty() {
            return Ok(Status::Success);
        }

        loop {
            if self.cursor >= collection.len() {
                self.cursor = 0;
                return Ok(Status::Success);
            }
            ctx.check_cancelled()?;
            ctx.blackboard.set(self.item_key.clone(), collection[self.cursor].clone());
            if let Some(index_key) = &self.index_key {
                ctx.blackboard.set(index_key.clone(), Json::from(self.cursor as u64));
            }
            let body = self.children.first_mut().expect("checked above");
            match body.tick(ctx).await? {
                Status::Success => {
                    body.reset();
                    self.cursor += 1;
                }
                Status::Failure => {
                    self.cursor = 0;
                    return Ok(Status::Failure);
                }
                Status::Running => return Ok(Status::Running),
                Status::Idle => unreachable!("tick() never commits Idle"),
            }
        }
    }

    fn on_reset(&mut self) {
        self.cursor = 0;
    }
}
