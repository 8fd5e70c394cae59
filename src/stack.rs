//! The upstream/downstream/collector Fargate service and everything it depends on.

use serde_json::Value;
use tracing::info;

use crate::aws::{
    CloudwatchLogGroup, ClusterSetting, EcrRepository, EcsCluster, EcsService, EcsTaskDefinition,
    IamRole, ImageScanningConfiguration, NetworkConfiguration, SecurityGroup,
};
use crate::config::StackConfig;
use crate::ecs::{ContainerDefinition, ContainerDefinitionOptions, LogConfiguration};
use crate::iam::{PolicyDocument, PolicyStatement, Principal, RoleWithPolicy, RoleWithPolicyConfig};
use crate::terraform::{Error, Handle, Reference, Stack};

const LOG_RETENTION_DAYS: u32 = 3;
const TASK_FAMILY: &str = "app";
const TASK_CPU: &str = "1024";
const TASK_MEMORY: &str = "3072";
const PLATFORM_VERSION: &str = "1.4.0";
const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

pub struct MainStack {
    stack: Stack,
}

impl MainStack {
    pub fn new(config: &StackConfig) -> Result<Self, Error> {
        let prefix = config.app_name.as_str();
        let mut stack = Stack::new(config.region.clone());

        info!(prefix, region = %config.region, "assembling stack");

        let security_group = stack.add(
            "app-service-sg",
            SecurityGroup {
                vpc_id: config.network.vpc_id.clone(),
            },
        )?;

        let upstream_repo = stack.add("app-upstream", repository(prefix, "upstream"))?;
        let downstream_repo = stack.add("app-downstream", repository(prefix, "downstream"))?;
        let collector_repo = stack.add("collector", repository(prefix, "collector"))?;

        let cluster = stack.add(
            "cluster",
            EcsCluster {
                name: format!("{}-app", prefix),
                setting: vec![ClusterSetting {
                    name: String::from("containerInsights"),
                    value: String::from("enabled"),
                }],
            },
        )?;

        let log_group = stack.add(
            "log-group",
            CloudwatchLogGroup {
                name: format!("{}-app", prefix),
                retention_in_days: LOG_RETENTION_DAYS,
            },
        )?;
        info!("registries, cluster and log group declared");

        let allow_from_ecs_tasks = stack.add(
            "allow-from-ecs-tasks",
            PolicyDocument::new(vec![PolicyStatement::allow(["sts:AssumeRole"])
                .principal(Principal::service(ECS_TASKS_PRINCIPAL))]),
        )?;

        let task_role = RoleWithPolicy::new(
            &mut stack,
            "app-task-role",
            role_config(
                format!("{}-app-task", prefix),
                allow_from_ecs_tasks.json(),
                task_policy(),
            ),
        )?;
        let execution_role = RoleWithPolicy::new(
            &mut stack,
            "app-execution-role",
            role_config(
                format!("{}-app-execution", prefix),
                allow_from_ecs_tasks.json(),
                execution_policy([&upstream_repo, &downstream_repo, &collector_repo]),
            ),
        )?;
        info!("task and execution roles declared");

        let tags = &config.image_tags;
        let container_definitions = [
            container("upstream", &upstream_repo, &tags.upstream, true, &log_group, config),
            container("downstream", &downstream_repo, &tags.downstream, true, &log_group, config),
            container("collector", &collector_repo, &tags.collector, false, &log_group, config),
        ];
        let container_definitions = match serde_json::to_string(&container_definitions) {
            Ok(json) => json,
            Err(error) => return Err(Error::Serialization(error.to_string())),
        };

        let task_definition = stack.add(
            "app-task-definition",
            EcsTaskDefinition {
                family: String::from(TASK_FAMILY),
                container_definitions,
                execution_role_arn: execution_role.role_arn(),
                task_role_arn: task_role.role_arn(),
                network_mode: String::from("awsvpc"),
                requires_compatibilities: vec![String::from("FARGATE")],
                cpu: String::from(TASK_CPU),
                memory: String::from(TASK_MEMORY),
            },
        )?;

        let service = stack.add(
            "app-service",
            EcsService {
                name: prefix.to_string(),
                cluster: cluster.arn(),
                desired_count: 1,
                launch_type: String::from("FARGATE"),
                platform_version: String::from(PLATFORM_VERSION),
                scheduling_strategy: String::from("REPLICA"),
                task_definition: task_definition.arn(),
                enable_execute_command: true,
                network_configuration: NetworkConfiguration {
                    assign_public_ip: false,
                    security_groups: vec![security_group.id()],
                    subnets: config.network.subnet_ids.clone(),
                },
            },
        )?;
        info!(subnets = config.network.subnet_ids.len(), "task definition and service declared");

        stack.output(
            "upstream_repository_url",
            upstream_repo.repository_url(),
            "Repository the upstream image is pushed to",
        )?;
        stack.output(
            "downstream_repository_url",
            downstream_repo.repository_url(),
            "Repository the downstream image is pushed to",
        )?;
        stack.output(
            "collector_repository_url",
            collector_repo.repository_url(),
            "Repository the collector image is pushed to",
        )?;
        stack.output("cluster_name", cluster.cluster_name(), "ECS cluster running the service")?;
        stack.output("service_name", service.service_name(), "ECS service name")?;

        return Ok(Self { stack });
    }

    pub fn synth(&self) -> Value {
        self.stack.synth()
    }
}

fn repository(prefix: &str, component: &str) -> EcrRepository {
    EcrRepository {
        name: format!("{}-{}", prefix, component),
        image_tag_mutability: String::from("IMMUTABLE"),
        image_scanning_configuration: ImageScanningConfiguration {
            scan_on_push: false,
        },
    }
}

fn role_config(
    name: String,
    trust: Reference,
    policy_document: PolicyDocument,
) -> RoleWithPolicyConfig {
    RoleWithPolicyConfig {
        name: name.clone(),
        role: IamRole {
            name,
            assume_role_policy: trust,
        },
        policy_document,
    }
}

/// Application containers only get to look around the cluster.
fn task_policy() -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement::allow(["ecs:List*"]).on(["*"])])
}

/// Pulling images is scoped to the stack's own registries.
fn execution_policy(repositories: [&Handle<EcrRepository>; 3]) -> PolicyDocument {
    PolicyDocument::new(vec![
        PolicyStatement::allow([
            "ecr:GetAuthorizationToken",
            "logs:CreateLogStream",
            "logs:PutLogEvents",
        ])
        .on(["*"]),
        PolicyStatement::allow([
            "ecr:BatchCheckLayerAvailability",
            "ecr:GetDownloadUrlForLayer",
            "ecr:BatchGetImage",
        ])
        .on(repositories.iter().map(|repository| repository.arn())),
    ])
}

fn container(
    name: &str,
    repository: &Handle<EcrRepository>,
    image_tag: &str,
    essential: bool,
    log_group: &Handle<CloudwatchLogGroup>,
    config: &StackConfig,
) -> ContainerDefinition {
    ContainerDefinition::new(
        name,
        ContainerDefinitionOptions {
            image: format!("{}:{}", repository.repository_url(), image_tag),
            essential: if essential { Some(true) } else { None },
            log_configuration: Some(LogConfiguration::awslogs(
                log_group.group_name(),
                config.region.clone(),
                image_tag,
            )),
            ..Default::default()
        },
    )
}
