//! ECS container definitions, serialized into the shape the task definition's
//! `container_definitions` field expects.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

impl PortMapping {
    pub fn tcp(container_port: u16) -> Self {
        Self {
            container_port,
            host_port: None,
            protocol: Some(Protocol::Tcp),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_period: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDriver {
    Awslogs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwsLogsOptions {
    #[serde(rename = "awslogs-group")]
    pub group: String,
    #[serde(rename = "awslogs-region")]
    pub region: String,
    #[serde(rename = "awslogs-stream-prefix")]
    pub stream_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: LogDriver,
    pub options: AwsLogsOptions,
}

impl LogConfiguration {
    pub fn awslogs(
        group: impl Into<String>,
        region: impl Into<String>,
        stream_prefix: impl Into<String>,
    ) -> Self {
        Self {
            log_driver: LogDriver::Awslogs,
            options: AwsLogsOptions {
                group: group.into(),
                region: region.into(),
                stream_prefix: stream_prefix.into(),
            },
        }
    }
}

/// Base settings for a [`ContainerDefinition`].
///
/// `port_mappings` and `environment` only seed the definition's accumulators;
/// they are emitted by the definition itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinitionOptions {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<u32>,
    #[serde(skip)]
    pub port_mappings: Vec<PortMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip)]
    pub environment: Vec<EnvironmentVariable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<LogConfiguration>,
}

/// A single container of a Fargate task.
///
/// Port mappings and environment variables are append-only. Either list is left
/// out of the serialized form entirely while it is empty.
#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    name: String,
    options: ContainerDefinitionOptions,
    port_mappings: Vec<PortMapping>,
    environment: Vec<EnvironmentVariable>,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<String>, mut options: ContainerDefinitionOptions) -> Self {
        let port_mappings = std::mem::take(&mut options.port_mappings);
        let environment = std::mem::take(&mut options.environment);
        return Self {
            name: name.into(),
            options,
            port_mappings,
            environment,
        };
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_port_mapping(&mut self, mappings: impl IntoIterator<Item = PortMapping>) {
        self.port_mappings.extend(mappings);
    }

    pub fn add_environment(&mut self, variables: impl IntoIterator<Item = EnvironmentVariable>) {
        self.environment.extend(variables);
    }
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Wire<'a> {
    #[serde(flatten)]
    options: &'a ContainerDefinitionOptions,
    name: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    port_mappings: &'a [PortMapping],
    #[serde(skip_serializing_if = "is_empty")]
    environment: &'a [EnvironmentVariable],
}

impl Serialize for ContainerDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Wire {
            options: &self.options,
            name: &self.name,
            port_mappings: &self.port_mappings,
            environment: &self.environment,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ContainerDefinition;
    use super::ContainerDefinitionOptions;
    use super::EnvironmentVariable;
    use super::HealthCheck;
    use super::LogConfiguration;
    use super::PortMapping;
    use super::Protocol;

    fn options() -> ContainerDefinitionOptions {
        ContainerDefinitionOptions {
            image: String::from("registry/app:v1"),
            ..Default::default()
        }
    }

    #[test]
    fn omits_empty_lists() {
        let definition = ContainerDefinition::new("app", options());

        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(json!({ "image": "registry/app:v1", "name": "app" }), value);
    }

    #[test]
    fn omits_lists_seeded_empty() {
        let definition = ContainerDefinition::new(
            "app",
            ContainerDefinitionOptions {
                port_mappings: vec![],
                environment: vec![],
                ..options()
            },
        );

        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(true, value.get("portMappings").is_none());
        assert_eq!(true, value.get("environment").is_none());
    }

    #[test]
    fn appends_preserve_order_and_duplicates() {
        let mut definition = ContainerDefinition::new(
            "app",
            ContainerDefinitionOptions {
                environment: vec![EnvironmentVariable::new("A", "1")],
                ..options()
            },
        );
        definition.add_environment(vec![
            EnvironmentVariable::new("B", "2"),
            EnvironmentVariable::new("A", "3"),
        ]);
        definition.add_environment([EnvironmentVariable::new("C", "4")]);
        definition.add_port_mapping([PortMapping::tcp(8080), PortMapping::tcp(8080)]);

        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(
            json!([
                { "name": "A", "value": "1" },
                { "name": "B", "value": "2" },
                { "name": "A", "value": "3" },
                { "name": "C", "value": "4" },
            ]),
            value["environment"]
        );
        assert_eq!(
            json!([
                { "containerPort": 8080, "protocol": "tcp" },
                { "containerPort": 8080, "protocol": "tcp" },
            ]),
            value["portMappings"]
        );
    }

    #[test]
    fn name_follows_options_and_lists_follow_name() {
        let mut definition = ContainerDefinition::new(
            "collector",
            ContainerDefinitionOptions {
                essential: Some(true),
                cpu: Some(256),
                ..options()
            },
        );
        definition.add_port_mapping([PortMapping::tcp(4317)]);
        definition.add_environment([EnvironmentVariable::new("OTEL", "on")]);

        let serialized = serde_json::to_string(&definition).unwrap();
        assert_eq!(
            r#"{"image":"registry/app:v1","cpu":256,"essential":true,"name":"collector","portMappings":[{"containerPort":4317,"protocol":"tcp"}],"environment":[{"name":"OTEL","value":"on"}]}"#,
            serialized
        );
    }

    #[test]
    fn serializes_memory_command_and_udp_host_ports() {
        let mut definition = ContainerDefinition::new(
            "collector",
            ContainerDefinitionOptions {
                memory: Some(512),
                memory_reservation: Some(256),
                command: Some(vec![String::from("--config"), String::from("/etc/otel.yaml")]),
                ..options()
            },
        );
        definition.add_port_mapping([PortMapping {
            container_port: 8125,
            host_port: Some(8125),
            protocol: Some(Protocol::Udp),
        }]);

        let serialized = serde_json::to_string(&definition).unwrap();
        assert_eq!(
            r#"{"image":"registry/app:v1","memory":512,"memoryReservation":256,"command":["--config","/etc/otel.yaml"],"name":"collector","portMappings":[{"containerPort":8125,"hostPort":8125,"protocol":"udp"}]}"#,
            serialized
        );
    }

    #[test]
    fn serializes_health_check_and_log_configuration() {
        let definition = ContainerDefinition::new(
            "upstream",
            ContainerDefinitionOptions {
                health_check: Some(HealthCheck {
                    command: Some(vec![String::from("CMD"), String::from("true")]),
                    start_period: Some(10),
                    ..Default::default()
                }),
                log_configuration: Some(LogConfiguration::awslogs("group", "eu-west-1", "v1")),
                ..options()
            },
        );

        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(
            json!({ "command": ["CMD", "true"], "startPeriod": 10 }),
            value["healthCheck"]
        );
        assert_eq!(
            json!({
                "logDriver": "awslogs",
                "options": {
                    "awslogs-group": "group",
                    "awslogs-region": "eu-west-1",
                    "awslogs-stream-prefix": "v1",
                }
            }),
            value["logConfiguration"]
        );
    }

    #[test]
    fn serialization_is_repeatable() {
        let mut definition = ContainerDefinition::new("app", options());
        definition.add_port_mapping([PortMapping::tcp(80)]);

        let first = serde_json::to_string(&definition).unwrap();
        let second = serde_json::to_string(&definition).unwrap();
        assert_eq!(first, second);
    }
}
