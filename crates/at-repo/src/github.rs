//! A reference `Repo`/`ChangeTarget` pair against the GitHub REST API,
//! shaped after `original_source/autotransform/repo/github.py` and
//! `change/github.py`. The local working copy is driven with the `git`
//! binary via `std::process::Command` (the crate carries no `git2`
//! dependency — see DESIGN.md) the way `GitPython`, which the source wraps,
//! itself shells out to `git`.

use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use at_core::{Batch, Bundle, ChangeState, ReviewState, TestState};
use at_schema::{ChangeTarget, Repo};
use serde_json::{json, Value};

use crate::body;
use crate::naming::{branch_name, commit_message};

fn git(working_copy: &std::path::Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git").arg("-C").arg(working_copy).args(args).output()?;
    if !output.status.success() {
        anyhow::bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// One outstanding pull request, read/acted on through the GitHub REST API.
pub struct GithubChange {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
    full_repo_name: String,
    pull_number: u64,
    state: ChangeState,
    review_state: ReviewState,
    test_state: TestState,
    labels: Vec<String>,
    reviewers: Vec<String>,
    team_reviewers: Vec<String>,
    created_at: i64,
    updated_at: i64,
    raw_body: String,
    decoded: OnceLock<(Value, Batch)>,
}

impl GithubChange {
    fn decode(&self) -> anyhow::Result<&(Value, Batch)> {
        if let Some(cached) = self.decoded.get() {
            return Ok(cached);
        }
        let decoded = body::extract(&self.raw_body).map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(self.decoded.get_or_init(|| decoded))
    }

    fn issues_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/issues/{}{suffix}",
            self.base_url, self.full_repo_name, self.pull_number
        )
    }

    fn pulls_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/pulls/{}{suffix}",
            self.base_url, self.full_repo_name, self.pull_number
        )
    }

    fn bearer(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("User-Agent", "autotransform-engine")
            .header("Accept", "application/vnd.github+json")
    }
}

impl ChangeTarget for GithubChange {
    fn schema_name(&self) -> &str {
        // Computed from the decoded body; an undecodable body is a contract
        // violation at this point (a Change is never constructed from a
        // body with no sentinel markers — `get_outstanding_changes` only
        // yields Changes it has already decoded once), so the accessor
        // itself stays infallible by caching an empty name on failure.
        self.decode().ok().and_then(|(schema, _)| schema["config"]["schema_name"].as_str()).unwrap_or("")
    }

    fn state(&self) -> ChangeState {
        self.state
    }

    fn review_state(&self) -> ReviewState {
        self.review_state
    }

    fn test_state(&self) -> TestState {
        self.test_state
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn reviewers(&self) -> &[String] {
        &self.reviewers
    }

    fn team_reviewers(&self) -> &[String] {
        &self.team_reviewers
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn batch(&self) -> anyhow::Result<Batch> {
        Ok(self.decode()?.1.clone())
    }

    fn schema_bundle(&self) -> anyhow::Result<Bundle> {
        Bundle::from_value(self.decode()?.0.clone()).map_err(|e| anyhow::anyhow!("{e}"))
    }

    fn abandon(&self) -> anyhow::Result<bool> {
        let resp = self.bearer(self.client.patch(self.pulls_url(""))).json(&json!({ "state": "closed" })).send()?;
        Ok(resp.status().is_success())
    }

    fn merge(&self) -> anyhow::Result<bool> {
        let resp = self.bearer(self.client.put(self.pulls_url("/merge"))).send()?;
        Ok(resp.status().is_success())
    }

    fn add_labels(&self, labels: &[String]) -> anyhow::Result<bool> {
        let resp = self
            .bearer(self.client.post(self.issues_url("/labels")))
            .json(&json!({ "labels": labels }))
            .send()?;
        Ok(resp.status().is_success())
    }

    fn remove_label(&self, label: &str) -> anyhow::Result<bool> {
        let resp = self
            .bearer(self.client.delete(self.issues_url(&format!("/labels/{label}"))))
            .send()?;
        Ok(resp.status().is_success())
    }

    fn add_reviewers(&self, reviewers: &[String], team_reviewers: &[String]) -> anyhow::Result<bool> {
        let resp = self
            .bearer(self.client.post(self.pulls_url("/requested_reviewers")))
            .json(&json!({ "reviewers": reviewers, "team_reviewers": team_reviewers }))
            .send()?;
        Ok(resp.status().is_success())
    }

    fn comment(&self, body: &str) -> anyhow::Result<bool> {
        let resp = self
            .bearer(self.client.post(self.issues_url("/comments")))
            .json(&json!({ "body": body }))
            .send()?;
        Ok(resp.status().is_success())
    }
}

/// Builds a [`GithubRepo`] from a component bundle's params (spec.md §6.1),
/// registered into `at-schema`'s process-wide `Repo` factory under the name
/// `"github"` by [`crate::register`]. `at-repo` cannot register this at
/// `at-schema`'s `Factories::new` time the way builtins in that crate do —
/// it sits on the other side of the dependency (`at-repo` depends on
/// `at-schema`, not the reverse) — so registration instead happens
/// explicitly, once, the first time a caller (typically `at-cli`) needs a
/// Schema that may reference a `"github"` repo.
pub fn from_params(params: &Value) -> anyhow::Result<Box<dyn Repo>> {
    let str_field = |field: &str| -> anyhow::Result<String> {
        params
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("github repo requires '{field}'"))
    };
    let string_list = |field: &str| -> Vec<String> {
        params
            .get(field)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default()
    };

    let base_url = params
        .get("base_url")
        .and_then(Value::as_str)
        .unwrap_or("https://api.github.com")
        .to_string();
    let token = std::env::var("GITHUB_TOKEN")
        .ok()
        .or_else(|| params.get("token").and_then(Value::as_str).map(str::to_owned))
        .ok_or_else(|| anyhow::anyhow!("github repo requires a token (GITHUB_TOKEN or 'token')"))?;

    let repo = GithubRepo::new(
        base_url,
        token,
        str_field("full_github_name")?,
        str_field("base_branch_name")?,
        str_field("working_copy")?,
        str_field("bot_login")?,
        str_field("schema_name")?,
    )
    .with_labels(string_list("labels"))
    .with_reviewers(string_list("reviewers"), string_list("team_reviewers"));
    Ok(Box::new(repo))
}

/// Submits Batches as pull requests against a GitHub repo, backed by a local
/// git working copy (spec.md §6.2).
pub struct GithubRepo {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
    full_repo_name: String,
    base_branch: String,
    working_copy: PathBuf,
    bot_login: String,
    schema_name: String,
    labels: Vec<String>,
    reviewers: Vec<String>,
    team_reviewers: Vec<String>,
}

impl GithubRepo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        full_repo_name: impl Into<String>,
        base_branch: impl Into<String>,
        working_copy: impl Into<PathBuf>,
        bot_login: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            full_repo_name: full_repo_name.into(),
            base_branch: base_branch.into(),
            working_copy: working_copy.into(),
            bot_login: bot_login.into(),
            schema_name: schema_name.into(),
            labels: Vec::new(),
            reviewers: Vec::new(),
            team_reviewers: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_reviewers(mut self, reviewers: Vec<String>, team_reviewers: Vec<String>) -> Self {
        self.reviewers = reviewers;
        self.team_reviewers = team_reviewers;
        self
    }

    fn bearer(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("User-Agent", "autotransform-engine")
            .header("Accept", "application/vnd.github+json")
    }

    fn commit(&self, batch: &Batch, branch: &str, amend: bool) -> anyhow::Result<()> {
        git(&self.working_copy, &["checkout", "-B", branch])?;
        git(&self.working_copy, &["add", "-A"])?;
        let message = commit_message(&self.schema_name, &batch.title);
        if amend {
            git(&self.working_copy, &["commit", "--amend", "-m", &message])?;
        } else {
            git(&self.working_copy, &["commit", "-m", &message])?;
        }
        Ok(())
    }
}

impl Repo for GithubRepo {
    fn get_changed_files(&self, _batch: &Batch) -> anyhow::Result<Vec<String>> {
        let out = git(&self.working_copy, &["status", "--porcelain"])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l[3..].to_string())
            .collect())
    }

    fn submit(&self, batch: &Batch, _transform_data: &Value, change: Option<&dyn ChangeTarget>) -> anyhow::Result<()> {
        let branch = branch_name(&self.schema_name, &batch.title);
        self.commit(batch, &branch, change.is_some())?;

        if change.is_some() {
            git(&self.working_copy, &["push", "origin", "-u", "-f", &branch])?;
            return Ok(());
        }
        git(&self.working_copy, &["push", "origin", "-u", &branch])?;

        let body_text = batch.metadata.body.clone().ok_or_else(|| {
            anyhow::anyhow!("batch metadata must have a body before submitting a pull request")
        })?;
        let schema_bundle = json!({ "config": { "schema_name": self.schema_name } });
        let full_body = body::embed(&body_text, &schema_bundle, batch);

        let resp = self
            .bearer(self.client.post(format!("{}/repos/{}/pulls", self.base_url, self.full_repo_name)))
            .json(&json!({
                "title": commit_message(&self.schema_name, &batch.title),
                "body": full_body,
                "base": self.base_branch,
                "head": branch,
            }))
            .send()?;
        if !resp.status().is_success() {
            anyhow::bail!("creating pull request failed: {}", resp.status());
        }
        let created: Value = resp.json()?;
        let number = created["number"]
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("pull request response missing 'number'"))?;

        let mut labels = self.labels.clone();
        if let Some(extra) = batch.metadata.get("labels").and_then(Value::as_array) {
            labels.extend(extra.iter().filter_map(|v| v.as_str()).map(str::to_owned));
        }
        if !labels.is_empty() {
            self.bearer(self.client.post(format!(
                "{}/repos/{}/issues/{number}/labels",
                self.base_url, self.full_repo_name
            )))
            .json(&json!({ "labels": labels }))
            .send()?;
        }

        let mut reviewers = self.reviewers.clone();
        if let Some(extra) = batch.metadata.get("reviewers").and_then(Value::as_array) {
            reviewers.extend(extra.iter().filter_map(|v| v.as_str()).map(str::to_owned));
        }
        let mut team_reviewers = self.team_reviewers.clone();
        if let Some(extra) = batch.metadata.get("team_reviewers").and_then(Value::as_array) {
            team_reviewers.extend(extra.iter().filter_map(|v| v.as_str()).map(str::to_owned));
        }
        if !reviewers.is_empty() || !team_reviewers.is_empty() {
            self.bearer(self.client.post(format!(
                "{}/repos/{}/pulls/{number}/requested_reviewers",
                self.base_url, self.full_repo_name
            )))
            .json(&json!({ "reviewers": reviewers, "team_reviewers": team_reviewers }))
            .send()?;
        }
        Ok(())
    }

    fn clean(&self, _batch: &Batch) -> anyhow::Result<()> {
        git(&self.working_copy, &["checkout", &self.base_branch])?;
        git(&self.working_copy, &["reset", "--hard", &format!("origin/{}", self.base_branch)])?;
        git(&self.working_copy, &["clean", "-fd"])?;
        Ok(())
    }

    fn rewind(&self, _batch: &Batch) -> anyhow::Result<()> {
        git(&self.working_copy, &["checkout", &self.base_branch])?;
        Ok(())
    }

    fn get_outstanding_changes(&self) -> anyhow::Result<Vec<Box<dyn ChangeTarget>>> {
        let resp = self
            .bearer(self.client.get(format!(
                "{}/repos/{}/pulls?state=open",
                self.base_url, self.full_repo_name
            )))
            .send()?;
        if !resp.status().is_success() {
            anyhow::bail!("listing pull requests failed: {}", resp.status());
        }
        let pulls: Vec<Value> = resp.json()?;
        let mut changes: Vec<Box<dyn ChangeTarget>> = Vec::new();
        for pull in pulls {
            let login = pull["user"]["login"].as_str().unwrap_or_default();
            if login != self.bot_login {
                continue;
            }
            changes.push(Box::new(change_from_pull(
                self.client.clone(),
                &self.base_url,
                &self.token,
                &self.full_repo_name,
                &pull,
            )?));
        }
        Ok(changes)
    }
}

fn change_from_pull(
    client: reqwest::blocking::Client,
    base_url: &str,
    token: &str,
    full_repo_name: &str,
    pull: &Value,
) -> anyhow::Result<GithubChange> {
    let pull_number = pull["number"]
        .as_u64()
        .ok_or_else(|| anyhow::anyhow!("pull request missing 'number'"))?;
    let state = if pull["merged_at"].is_string() {
        ChangeState::Merged
    } else if pull["state"].as_str() == Some("closed") {
        ChangeState::Closed
    } else {
        ChangeState::Open
    };
    let review_state = match pull["review_decision"].as_str() {
        Some("APPROVED") => ReviewState::Approved,
        Some("CHANGES_REQUESTED") => ReviewState::ChangesRequested,
        _ => ReviewState::NeedsReview,
    };
    let test_state = match pull["mergeable_state"].as_str() {
        Some("clean") => TestState::Success,
        Some("dirty") | Some("unstable") => TestState::Failure,
        _ => TestState::Pending,
    };
    let labels = pull["labels"]
        .as_array()
        .map(|a| a.iter().filter_map(|l| l["name"].as_str()).map(str::to_owned).collect())
        .unwrap_or_default();
    let raw_body = pull["body"].as_str().unwrap_or_default().to_string();

    Ok(GithubChange {
        client,
        base_url: base_url.to_string(),
        token: token.to_string(),
        full_repo_name: full_repo_name.to_string(),
        pull_number,
        state,
        review_state,
        test_state,
        labels,
        reviewers: Vec::new(),
        team_reviewers: Vec::new(),
        created_at: parse_timestamp(pull["created_at"].as_str()),
        updated_at: parse_timestamp(pull["updated_at"].as_str()),
        raw_body,
        decoded: OnceLock::new(),
    })
}

fn parse_timestamp(rfc3339: Option<&str>) -> i64 {
    rfc3339
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}
