//! A minimal Terraform JSON document model.
//!
//! Blocks are registered on a [`Stack`] under a `(type, name)` identifier and
//! hand back a typed [`Handle`]. References to other blocks can only be made
//! through a handle, so every reference points at a block that is already
//! declared.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

const AWS_PROVIDER_SOURCE: &str = "hashicorp/aws";
const AWS_PROVIDER_VERSION: &str = "~> 4.0";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("{block_type}.{name} is already declared")]
    DuplicateIdentifier { block_type: String, name: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Resource,
    Data,
}

/// A Terraform block body that can be registered on a [`Stack`].
pub trait Block: Serialize {
    const TYPE: &'static str;
    const KIND: BlockKind = BlockKind::Resource;
}

/// A Terraform interpolation expression, e.g. `${aws_iam_role.app.arn}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.0
    }
}

/// Typed pointer to a block declared on a [`Stack`].
#[derive(Debug)]
pub struct Handle<B> {
    name: String,
    _block: PhantomData<fn() -> B>,
}

impl<B: Block> Handle<B> {
    pub fn attr(&self, attribute: &str) -> Reference {
        let reference = match B::KIND {
            BlockKind::Resource => format!("${{{}.{}.{}}}", B::TYPE, self.name, attribute),
            BlockKind::Data => format!("${{data.{}.{}.{}}}", B::TYPE, self.name, attribute),
        };
        return Reference(reference);
    }
}

#[derive(Debug)]
struct Declared {
    kind: BlockKind,
    block_type: &'static str,
    name: String,
    body: Value,
}

#[derive(Debug)]
struct Output {
    name: String,
    value: Reference,
    description: String,
}

/// Position in a [`Stack`] that can be rolled back to.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    blocks: usize,
    outputs: usize,
}

#[derive(Debug)]
pub struct Stack {
    region: String,
    blocks: Vec<Declared>,
    outputs: Vec<Output>,
}

impl Stack {
    pub fn new(region: impl Into<String>) -> Self {
        return Self {
            region: region.into(),
            blocks: Vec::new(),
            outputs: Vec::new(),
        };
    }

    /// Registers `body` under `name` and returns a handle to it.
    pub fn add<B: Block>(&mut self, name: &str, body: B) -> Result<Handle<B>, Error> {
        let taken = self
            .blocks
            .iter()
            .any(|b| b.kind == B::KIND && b.block_type == B::TYPE && b.name == name);
        if taken {
            return Err(Error::DuplicateIdentifier {
                block_type: B::TYPE.to_string(),
                name: name.to_string(),
            });
        }

        let body = match serde_json::to_value(&body) {
            Ok(value) => value,
            Err(error) => return Err(Error::Serialization(error.to_string())),
        };

        debug!(block_type = B::TYPE, name, kind = ?B::KIND, "declared block");
        self.blocks.push(Declared {
            kind: B::KIND,
            block_type: B::TYPE,
            name: name.to_string(),
            body,
        });

        return Ok(Handle {
            name: name.to_string(),
            _block: PhantomData,
        });
    }

    pub fn output(
        &mut self,
        name: &str,
        value: Reference,
        description: &str,
    ) -> Result<(), Error> {
        if self.outputs.iter().any(|o| o.name == name) {
            return Err(Error::DuplicateIdentifier {
                block_type: "output".to_string(),
                name: name.to_string(),
            });
        }
        self.outputs.push(Output {
            name: name.to_string(),
            value,
            description: description.to_string(),
        });
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            blocks: self.blocks.len(),
            outputs: self.outputs.len(),
        }
    }

    /// Drops every block and output declared after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.blocks.truncate(checkpoint.blocks);
        self.outputs.truncate(checkpoint.outputs);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Renders the stack as a Terraform JSON configuration.
    pub fn synth(&self) -> Value {
        let mut resources = Map::new();
        let mut data = Map::new();
        for block in &self.blocks {
            let group = match block.kind {
                BlockKind::Resource => &mut resources,
                BlockKind::Data => &mut data,
            };
            let by_name = group
                .entry(block.block_type)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(by_name) = by_name {
                by_name.insert(block.name.clone(), block.body.clone());
            }
        }

        let mut document = Map::new();
        document.insert(
            "terraform".to_string(),
            json!({
                "required_providers": {
                    "aws": {
                        "source": AWS_PROVIDER_SOURCE,
                        "version": AWS_PROVIDER_VERSION,
                    }
                }
            }),
        );
        document.insert(
            "provider".to_string(),
            json!({ "aws": [{ "region": self.region }] }),
        );
        if !data.is_empty() {
            document.insert("data".to_string(), Value::Object(data));
        }
        if !resources.is_empty() {
            document.insert("resource".to_string(), Value::Object(resources));
        }
        if !self.outputs.is_empty() {
            let outputs: Map<String, Value> = self
                .outputs
                .iter()
                .map(|o| {
                    (
                        o.name.clone(),
                        json!({ "value": o.value, "description": o.description }),
                    )
                })
                .collect();
            document.insert("output".to_string(), Value::Object(outputs));
        }

        Value::Object(document)
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::Block;
    use super::BlockKind;
    use super::Error;
    use super::Stack;

    #[derive(Serialize)]
    struct Bucket {
        bucket: String,
    }

    impl Block for Bucket {
        const TYPE: &'static str = "aws_s3_bucket";
    }

    #[derive(Serialize)]
    struct Caller {}

    impl Block for Caller {
        const TYPE: &'static str = "aws_caller_identity";
        const KIND: BlockKind = BlockKind::Data;
    }

    fn bucket(name: &str) -> Bucket {
        Bucket {
            bucket: name.to_string(),
        }
    }

    #[test]
    fn references_resources_and_data_sources() {
        let mut stack = Stack::new("eu-west-1");
        let bucket = stack.add("logs", bucket("logs")).unwrap();
        let caller = stack.add("current", Caller {}).unwrap();

        assert_eq!("${aws_s3_bucket.logs.arn}", bucket.attr("arn").as_str());
        assert_eq!(
            "${data.aws_caller_identity.current.account_id}",
            caller.attr("account_id").as_str()
        );
    }

    #[test]
    fn rejects_duplicate_identifiers() {
        let mut stack = Stack::new("eu-west-1");
        stack.add("logs", bucket("a")).unwrap();

        let result = stack.add("logs", bucket("b"));
        assert_eq!(
            Some(Error::DuplicateIdentifier {
                block_type: "aws_s3_bucket".to_string(),
                name: "logs".to_string(),
            }),
            result.err()
        );
        assert_eq!(1, stack.len());
    }

    #[test]
    fn same_name_is_allowed_across_types() {
        let mut stack = Stack::new("eu-west-1");
        stack.add("shared", bucket("a")).unwrap();
        assert_eq!(true, stack.add("shared", Caller {}).is_ok());
    }

    #[test]
    fn rollback_drops_later_blocks() {
        let mut stack = Stack::new("eu-west-1");
        stack.add("kept", bucket("kept")).unwrap();
        let checkpoint = stack.checkpoint();
        let dropped = stack.add("dropped", bucket("dropped")).unwrap();
        stack
            .output("dropped", dropped.attr("arn"), "dropped bucket")
            .unwrap();

        stack.rollback(checkpoint);

        let document = stack.synth();
        assert_eq!(1, stack.len());
        assert_eq!(true, document["resource"]["aws_s3_bucket"]["dropped"].is_null());
        assert_eq!(true, document.get("output").is_none());
    }

    #[test]
    fn synth_groups_blocks_in_declaration_order() {
        let mut stack = Stack::new("eu-west-1");
        let first = stack.add("first", bucket("first")).unwrap();
        stack.add("second", bucket("second")).unwrap();
        stack.add("current", Caller {}).unwrap();
        stack
            .output("first_arn", first.attr("arn"), "first bucket")
            .unwrap();

        let document = stack.synth();
        let keys: Vec<&String> = document.as_object().unwrap().keys().collect();
        assert_eq!(vec!["terraform", "provider", "data", "resource", "output"], keys);
        assert_eq!("eu-west-1", document["provider"]["aws"][0]["region"]);

        let names: Vec<&String> = document["resource"]["aws_s3_bucket"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(vec!["first", "second"], names);
        assert_eq!(
            "${aws_s3_bucket.first.arn}",
            document["output"]["first_arn"]["value"]
        );
    }

    #[test]
    fn duplicate_outputs_are_rejected() {
        let mut stack = Stack::new("eu-west-1");
        let logs = stack.add("logs", bucket("logs")).unwrap();
        stack.output("arn", logs.attr("arn"), "").unwrap();
        assert_eq!(true, stack.output("arn", logs.attr("arn"), "").is_err());
    }
}
