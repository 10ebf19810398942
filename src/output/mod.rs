mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::OrganizationProgress;
use styling::{banner, muted};
pub use summary::print_summary;

/// Prints the `collab-audit` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        banner("🔍 collab-audit"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Repository Collaborator Audit")
    );
}
