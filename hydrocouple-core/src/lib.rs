pub mod buffer;
pub mod component;
pub mod composition;
pub mod config;
pub mod deployer;
pub mod event;
pub mod exchange;
pub mod group;
pub mod link;
pub mod link_manager;
pub mod support;
pub mod time;
pub mod trigger;
pub mod values;

pub mod errors;

#[cfg(test)]
mod example_components;
