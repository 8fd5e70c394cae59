use serde::Serialize;
use tracing::debug;

use crate::aws::{IamPolicy, IamRole, IamRolePolicyAttachment};
use crate::terraform::{Error, Handle, Reference, Stack};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    #[serde(rename = "type")]
    pub principal_type: String,
    pub identifiers: Vec<String>,
}

impl Principal {
    pub fn service(identifier: impl Into<String>) -> Self {
        Self {
            principal_type: String::from("Service"),
            identifiers: vec![identifier.into()],
        }
    }
}

/// One `statement` block of an `aws_iam_policy_document`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub principals: Vec<Principal>,
}

impl PolicyStatement {
    pub fn allow<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources: Vec::new(),
            principals: Vec::new(),
        }
    }

    pub fn on<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyDocument {
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self { statement }
    }
}

pub struct RoleWithPolicyConfig {
    /// Name of the standalone policy.
    pub name: String,
    pub role: IamRole,
    pub policy_document: PolicyDocument,
}

/// An IAM role with exactly one managed policy attached to it.
///
/// Only the role's ARN is visible to callers.
#[derive(Debug)]
pub struct RoleWithPolicy {
    role: Handle<IamRole>,
    /// Document, policy and attachment; owned by the role, never handed out.
    _owned: (
        Handle<PolicyDocument>,
        Handle<IamPolicy>,
        Handle<IamRolePolicyAttachment>,
    ),
}

impl RoleWithPolicy {
    /// Declares the role, its policy document, the policy and the attachment
    /// under `id`. Nothing is left on `stack` if any of them fails.
    pub fn new(stack: &mut Stack, id: &str, config: RoleWithPolicyConfig) -> Result<Self, Error> {
        let checkpoint = stack.checkpoint();
        match Self::declare(stack, id, config) {
            Ok(role) => Ok(role),
            Err(error) => {
                stack.rollback(checkpoint);
                Err(error)
            }
        }
    }

    fn declare(stack: &mut Stack, id: &str, config: RoleWithPolicyConfig) -> Result<Self, Error> {
        let RoleWithPolicyConfig {
            name,
            role,
            policy_document,
        } = config;

        let role = stack.add(id, role)?;
        let policy_document = stack.add(id, policy_document)?;
        let policy = stack.add(
            id,
            IamPolicy {
                name,
                policy: policy_document.json(),
            },
        )?;
        let attachment = stack.add(
            id,
            IamRolePolicyAttachment {
                role: role.role_name(),
                policy_arn: policy.arn(),
            },
        )?;
        debug!(id, "role with policy declared");

        return Ok(Self {
            role,
            _owned: (policy_document, policy, attachment),
        });
    }

    pub fn role_arn(&self) -> Reference {
        self.role.arn()
    }
}
