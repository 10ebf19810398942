mod normalize;
mod publish;
mod tabular;

pub use normalize::{normalize, NormalizeOptions};
pub use publish::{post_issue, stage_artifact, write_files, ArtifactEnvironment};
