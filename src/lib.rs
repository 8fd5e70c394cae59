pub mod aws;
pub mod config;
pub mod ecs;
pub mod iam;
pub mod stack;
pub mod terraform;
pub mod writer;
