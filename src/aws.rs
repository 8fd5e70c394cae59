//! Argument structs for the AWS provider resources and data sources the stack uses.

use serde::Serialize;

use crate::iam::PolicyDocument;
use crate::terraform::{Block, BlockKind, Handle, Reference};

#[derive(Debug, Serialize)]
pub struct SecurityGroup {
    pub vpc_id: String,
}

impl Block for SecurityGroup {
    const TYPE: &'static str = "aws_security_group";
}

impl Handle<SecurityGroup> {
    pub fn id(&self) -> Reference {
        self.attr("id")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageScanningConfiguration {
    pub scan_on_push: bool,
}

#[derive(Debug, Serialize)]
pub struct EcrRepository {
    pub name: String,
    pub image_tag_mutability: String,
    pub image_scanning_configuration: ImageScanningConfiguration,
}

impl Block for EcrRepository {
    const TYPE: &'static str = "aws_ecr_repository";
}

impl Handle<EcrRepository> {
    pub fn arn(&self) -> Reference {
        self.attr("arn")
    }

    pub fn repository_url(&self) -> Reference {
        self.attr("repository_url")
    }
}

#[derive(Debug, Serialize)]
pub struct ClusterSetting {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct EcsCluster {
    pub name: String,
    pub setting: Vec<ClusterSetting>,
}

impl Block for EcsCluster {
    const TYPE: &'static str = "aws_ecs_cluster";
}

impl Handle<EcsCluster> {
    pub fn arn(&self) -> Reference {
        self.attr("arn")
    }

    pub fn cluster_name(&self) -> Reference {
        self.attr("name")
    }
}

#[derive(Debug, Serialize)]
pub struct CloudwatchLogGroup {
    pub name: String,
    pub retention_in_days: u32,
}

impl Block for CloudwatchLogGroup {
    const TYPE: &'static str = "aws_cloudwatch_log_group";
}

impl Handle<CloudwatchLogGroup> {
    pub fn group_name(&self) -> Reference {
        self.attr("name")
    }
}

impl Block for PolicyDocument {
    const TYPE: &'static str = "aws_iam_policy_document";
    const KIND: BlockKind = BlockKind::Data;
}

impl Handle<PolicyDocument> {
    /// The rendered IAM policy JSON.
    pub fn json(&self) -> Reference {
        self.attr("json")
    }
}

#[derive(Debug, Serialize)]
pub struct IamRole {
    pub name: String,
    pub assume_role_policy: Reference,
}

impl Block for IamRole {
    const TYPE: &'static str = "aws_iam_role";
}

impl Handle<IamRole> {
    pub fn arn(&self) -> Reference {
        self.attr("arn")
    }

    pub fn role_name(&self) -> Reference {
        self.attr("name")
    }
}

#[derive(Debug, Serialize)]
pub struct IamPolicy {
    pub name: String,
    pub policy: Reference,
}

impl Block for IamPolicy {
    const TYPE: &'static str = "aws_iam_policy";
}

impl Handle<IamPolicy> {
    pub fn arn(&self) -> Reference {
        self.attr("arn")
    }
}

#[derive(Debug, Serialize)]
pub struct IamRolePolicyAttachment {
    pub role: Reference,
    pub policy_arn: Reference,
}

impl Block for IamRolePolicyAttachment {
    const TYPE: &'static str = "aws_iam_role_policy_attachment";
}

#[derive(Debug, Serialize)]
pub struct EcsTaskDefinition {
    pub family: String,
    /// JSON-encoded list of container definitions.
    pub container_definitions: String,
    pub execution_role_arn: Reference,
    pub task_role_arn: Reference,
    pub network_mode: String,
    pub requires_compatibilities: Vec<String>,
    pub cpu: String,
    pub memory: String,
}

impl Block for EcsTaskDefinition {
    const TYPE: &'static str = "aws_ecs_task_definition";
}

impl Handle<EcsTaskDefinition> {
    pub fn arn(&self) -> Reference {
        self.attr("arn")
    }
}

#[derive(Debug, Serialize)]
pub struct NetworkConfiguration {
    pub assign_public_ip: bool,
    pub security_groups: Vec<Reference>,
    pub subnets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EcsService {
    pub name: String,
    pub cluster: Reference,
    pub desired_count: u32,
    pub launch_type: String,
    pub platform_version: String,
    pub scheduling_strategy: String,
    pub task_definition: Reference,
    pub enable_execute_command: bool,
    pub network_configuration: NetworkConfiguration,
}

impl Block for EcsService {
    const TYPE: &'static str = "aws_ecs_service";
}

impl Handle<EcsService> {
    pub fn service_name(&self) -> Reference {
        self.attr("name")
    }
}
