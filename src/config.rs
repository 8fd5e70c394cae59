use aws_config::meta::region::RegionProviderChain;
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, io, path::Path};
use validator::{Validate, ValidationError};

pub const KEY_IMAGE_TAG: &str = "APP_IMAGE_TAG";
pub const KEY_VPC_ID: &str = "APP_VPC_ID";
pub const KEY_SUBNET_IDS: &str = "APP_SUBNET_IDS";

/// Region used when neither the settings file nor the AWS environment names one.
pub const FALLBACK_REGION: &str = "us-east-1";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("environment variable(s) not defined: {}", .0.join(", "))]
    MissingEnvironment(Vec<&'static str>),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Validate)]
struct RawEnv {
    #[validate(required, length(min = 1))]
    image_tag: Option<String>,

    #[validate(required)]
    vpc_id: Option<String>,

    #[validate(required, length(min = 1))]
    subnet_ids: Option<String>,
}

const ENV_FIELDS: [(&str, &str); 3] = [
    ("image_tag", KEY_IMAGE_TAG),
    ("vpc_id", KEY_VPC_ID),
    ("subnet_ids", KEY_SUBNET_IDS),
];

/// Validated deployment inputs taken from the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub image_tag: String,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
}

/// Reads the required variables out of `env`.
///
/// Every missing or empty variable is reported in a single error. `APP_VPC_ID`
/// is only checked for presence on its own; it is reported as empty whenever
/// `APP_IMAGE_TAG` is empty, as the deployed pipeline has always done.
// TODO: check APP_VPC_ID for emptiness on its own once the pipeline owners sign off.
pub fn consume_env(env: &HashMap<String, String>) -> Result<EnvConfig, Error> {
    let raw = RawEnv {
        image_tag: env.get(KEY_IMAGE_TAG).cloned(),
        vpc_id: env.get(KEY_VPC_ID).cloned(),
        subnet_ids: env.get(KEY_SUBNET_IDS).cloned(),
    };

    if let Err(errors) = raw.validate() {
        let field_errors = errors.field_errors();
        let image_tag_empty = raw.image_tag.as_deref() == Some("");
        let missing: Vec<&'static str> = ENV_FIELDS
            .iter()
            .filter(|(field, _)| {
                field_errors.contains_key(field) || (*field == "vpc_id" && image_tag_empty)
            })
            .map(|(_, key)| *key)
            .collect();
        return Err(Error::MissingEnvironment(missing));
    }

    let (image_tag, vpc_id, subnet_ids) = match (raw.image_tag, raw.vpc_id, raw.subnet_ids) {
        (Some(image_tag), Some(vpc_id), Some(subnet_ids)) => (image_tag, vpc_id, subnet_ids),
        _ => return Err(Error::Unknown(String::from("validated environment is incomplete"))),
    };

    return Ok(EnvConfig {
        image_tag,
        vpc_id,
        subnet_ids: subnet_ids.split(',').map(String::from).collect(),
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageTagOverrides {
    pub upstream: Option<String>,
    pub downstream: Option<String>,
    pub collector: Option<String>,
}

/// Optional settings file, read from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[serde(default = "default_app_name")]
    #[validate(custom = "validate_app_name")]
    pub app_name: String,

    #[serde(default = "default_stack_name")]
    #[validate(length(min = 1))]
    pub stack_name: String,

    pub region: Option<String>,

    #[serde(default)]
    pub image_tags: ImageTagOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            stack_name: default_stack_name(),
            region: None,
            image_tags: ImageTagOverrides::default(),
        }
    }
}

fn default_app_name() -> String {
    String::from("enjoy-otel")
}

fn default_stack_name() -> String {
    String::from("enjoy-otel-main")
}

pub fn parse(path: &Path) -> Result<Settings, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let settings: Settings = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    match settings.validate() {
        Ok(_) => (),
        Err(error) => return Err(Error::ValidationError(error.to_string())),
    }

    return Ok(settings);
}

fn validate_app_name(app_name: &str) -> Result<(), ValidationError> {
    if app_name.is_empty() {
        return Err(ValidationError::new("The app name cannot be empty"));
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
    if !app_name.chars().all(allowed) {
        return Err(ValidationError::new(
            "The app name may only contain lowercase letters, digits and `-`",
        ));
    }

    return Ok(());
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTags {
    pub upstream: String,
    pub downstream: String,
    pub collector: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
}

/// Everything the stack needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    pub app_name: String,
    pub region: String,
    pub image_tags: ImageTags,
    pub network: NetworkConfig,
}

impl StackConfig {
    pub fn new(env: EnvConfig, settings: &Settings, region: String) -> Self {
        let overrides = &settings.image_tags;
        let tag = |tag: &Option<String>| tag.clone().unwrap_or_else(|| env.image_tag.clone());

        return Self {
            app_name: settings.app_name.clone(),
            region,
            image_tags: ImageTags {
                upstream: tag(&overrides.upstream),
                downstream: tag(&overrides.downstream),
                collector: tag(&overrides.collector),
            },
            network: NetworkConfig {
                vpc_id: env.vpc_id,
                subnet_ids: env.subnet_ids,
            },
        };
    }
}

/// Picks the configured region, then the AWS default provider chain, then [`FALLBACK_REGION`].
pub async fn resolve_region(configured: Option<&str>) -> String {
    let region = RegionProviderChain::first_try(configured.map(|r| Region::new(r.to_string())))
        .or_default_provider()
        .or_else(Region::new(FALLBACK_REGION));

    match region.region().await {
        Some(region) => region.as_ref().to_string(),
        None => FALLBACK_REGION.to_string(),
    }
}
