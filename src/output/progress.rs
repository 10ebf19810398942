use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{collected, collecting, failed, muted};

/// Spinner shown while one organization is being crawled.
pub struct OrganizationProgress {
    pb: ProgressBar,
}

impl OrganizationProgress {
    pub fn start(organization: &str) -> Self {
        let pb = create_spinner(collecting(format!("Collecting {organization}")).to_string());
        Self { pb }
    }

    pub fn finish(self, organization: &str, repositories: usize) {
        self.pb.finish_with_message(
            collected(format!("{organization}: {repositories} repositories ✓")).to_string(),
        );
    }

    pub fn skip(self, organization: &str) {
        self.pb
            .finish_with_message(muted(format!("{organization}: nothing to collect")).to_string());
    }

    pub fn fail(self, organization: &str) {
        self.pb
            .finish_with_message(failed(format!("{organization}: failed ✗")).to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
