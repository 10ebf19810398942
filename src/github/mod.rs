mod client;
pub mod executor;
pub mod queries;

pub use client::{ClientOptions, GitHubClient};
pub use executor::GraphQLExecutor;
