use crate::core::{Result, SourceControl};
use crate::domain::model::PullRequestSummary;
use chrono::{DateTime, Utc};

pub const DEFAULT_REPORT_FILE: &str = "repos.txt";
const PULL_REQUEST_SEPARATOR: &str = "------------------------------";

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryBranches {
    pub name: String,
    pub branches: Vec<String>,
}

pub struct RepositoryLister<S: SourceControl> {
    source: S,
}

impl<S: SourceControl> RepositoryLister<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Repositories whose name contains `search` (case-insensitive), each
    /// with its branches.
    pub async fn repositories_with_branches(&self, search: &str) -> Result<Vec<RepositoryBranches>> {
        let needle = search.to_lowercase();
        let mut matches = Vec::new();

        for name in self.source.list_repositories().await? {
            if !name.to_lowercase().contains(&needle) {
                continue;
            }
            tracing::debug!("Listing branches of {}", name);
            let branches = self.source.list_branches(&name).await?;
            matches.push(RepositoryBranches { name, branches });
        }

        tracing::info!(
            "{} repositories match '{}'",
            matches.len(),
            search
        );
        Ok(matches)
    }

    pub async fn open_pull_requests(&self, repository: &str) -> Result<Vec<PullRequestSummary>> {
        let ids = self.source.list_open_pull_requests(repository).await?;
        let mut pull_requests = Vec::with_capacity(ids.len());
        for id in ids {
            pull_requests.push(self.source.get_pull_request(&id).await?);
        }
        Ok(pull_requests)
    }
}

pub fn render_repository_report(repositories: &[RepositoryBranches]) -> String {
    let mut out = String::new();
    for repository in repositories {
        out.push_str(&format!("Repository: {}\n", repository.name));
        out.push_str("Branches:\n");
        for branch in &repository.branches {
            out.push_str(&format!(" - {}\n", branch));
        }
        out.push('\n');
    }
    out
}

fn format_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M:%S%:z").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn render_pull_request(repository: &str, pull_request: &PullRequestSummary) -> String {
    format!(
        "Repository: {}\nPull Request ID: {}\nTitle: {}\nAuthor: {}\nLast Activity Date: {}\nCreation Date: {}\n{}\n",
        repository,
        pull_request.pull_request_id,
        pull_request.title,
        pull_request.author_arn.as_deref().unwrap_or("unknown"),
        format_date(pull_request.last_activity_date.as_ref()),
        format_date(pull_request.creation_date.as_ref()),
        PULL_REQUEST_SEPARATOR
    )
}
