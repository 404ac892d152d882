// github.rs — RepoStore implementation against the GitHub REST API.
//
// One GithubStore is scoped to a single owner/repo pair. Every method is a
// single REST call; the engine composes them. Failure statuses are mapped
// into the StoreError taxonomy in one place (`fail`), so callers never see
// raw HTTP statuses.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::StoreError;
use crate::store::RepoStore;
use crate::types::{
    BranchSummary, CommitInfo, Comparison, DirEntry, EntryKind, FileContent, TreeEntry,
};

const API_BASE: &str = "https://api.github.com";

/// GitHub-backed repository store for one `owner/repo`.
pub struct GithubStore {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    token: String,
}

impl GithubStore {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    /// Point at a non-default API host (GitHub Enterprise, test server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, tail
        )
    }

    /// Percent-encode a repository path, keeping '/' separators intact.
    fn encode_path(path: &str) -> String {
        path.split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "yurt-cms")
    }

    /// Convert a failure response into a typed error, pulling GitHub's
    /// `message` field out of the body when present.
    async fn fail<T>(response: reqwest::Response) -> Result<T, StoreError> {
        let status = response.status().as_u16();
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => "request failed".to_string(),
        };
        tracing::debug!(status, %message, "store request failed");
        Err(StoreError::from_status(status, message))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, StoreError> {
        let response = self.request(reqwest::Method::GET, url).send().await?;
        if !response.status().is_success() {
            return Self::fail(response).await;
        }
        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentFile {
    #[serde(default)]
    content: Option<String>,
    sha: String,
}

#[derive(Deserialize)]
struct ContentDirEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct BranchItem {
    name: String,
    commit: CommitPointer,
}

#[derive(Deserialize)]
struct CommitPointer {
    sha: String,
}

#[derive(Deserialize)]
struct CommitDetail {
    sha: String,
    commit: CommitObject,
}

#[derive(Deserialize)]
struct CommitObject {
    #[serde(default)]
    message: String,
    author: Option<CommitAuthor>,
    committer: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct CompareResponse {
    ahead_by: u64,
    #[serde(default)]
    commits: Vec<CommitDetail>,
    merge_base_commit: Option<CommitPointer>,
}

impl CommitDetail {
    fn into_info(self) -> CommitInfo {
        let author = self.commit.author.or(self.commit.committer);
        CommitInfo {
            sha: self.sha,
            message: self.commit.message,
            author_name: author
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            author_email: author.as_ref().map(|a| a.email.clone()).unwrap_or_default(),
            date: author.and_then(|a| a.date).unwrap_or_else(Utc::now),
        }
    }
}

fn entry_kind(raw: &str) -> EntryKind {
    if raw == "tree" || raw == "dir" {
        EntryKind::Tree
    } else {
        EntryKind::Blob
    }
}

#[async_trait]
impl RepoStore for GithubStore {
    async fn default_branch(&self) -> Result<String, StoreError> {
        let url = format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo);
        let repo: RepoResponse = self.get_json(url).await?;
        Ok(repo.default_branch)
    }

    async fn list_tree(&self, reference: &str) -> Result<Vec<TreeEntry>, StoreError> {
        let url = self.url(&format!(
            "git/trees/{}?recursive=true",
            urlencoding::encode(reference)
        ));
        let tree: TreeResponse = self.get_json(url).await?;
        Ok(tree
            .tree
            .into_iter()
            .map(|item| TreeEntry {
                kind: entry_kind(&item.kind),
                path: item.path,
            })
            .collect())
    }

    async fn get_file(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> Result<FileContent, StoreError> {
        let mut url = self.url(&format!("contents/{}", Self::encode_path(path)));
        if let Some(reference) = reference {
            url.push_str(&format!("?ref={}", urlencoding::encode(reference)));
        }
        let file: ContentFile = self.get_json(url).await?;
        let encoded = file.content.ok_or_else(|| StoreError::Decode {
            context: path.to_string(),
            reason: "expected a file, got a directory listing".to_string(),
        })?;
        // GitHub wraps base64 bodies at 60 columns; strip the newlines first.
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64.decode(compact).map_err(|e| StoreError::Decode {
            context: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(FileContent {
            bytes,
            sha: file.sha,
        })
    }

    async fn list_dir(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> Result<Vec<DirEntry>, StoreError> {
        let mut url = self.url(&format!("contents/{}", Self::encode_path(path)));
        if let Some(reference) = reference {
            url.push_str(&format!("?ref={}", urlencoding::encode(reference)));
        }
        let entries: Vec<ContentDirEntry> = self.get_json(url).await?;
        Ok(entries
            .into_iter()
            .map(|e| DirEntry {
                kind: entry_kind(&e.kind),
                name: e.name,
                path: e.path,
            })
            .collect())
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
        branch: Option<&str>,
    ) -> Result<String, StoreError> {
        let url = self.url(&format!("contents/{}", Self::encode_path(path)));
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        if let Some(branch) = branch {
            body["branch"] = json!(branch);
        }

        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Self::fail(response).await;
        }
        let result: serde_json::Value = response.json().await?;
        Ok(result["commit"]["sha"].as_str().unwrap_or_default().to_string())
    }

    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        sha: &str,
        branch: Option<&str>,
    ) -> Result<String, StoreError> {
        let url = self.url(&format!("contents/{}", Self::encode_path(path)));
        let mut body = json!({ "message": message, "sha": sha });
        if let Some(branch) = branch {
            body["branch"] = json!(branch);
        }

        let response = self
            .request(reqwest::Method::DELETE, url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Self::fail(response).await;
        }
        let result: serde_json::Value = response.json().await?;
        Ok(result["commit"]["sha"].as_str().unwrap_or_default().to_string())
    }

    async fn branch_sha(&self, branch: &str) -> Result<String, StoreError> {
        let url = self.url(&format!("git/ref/heads/{}", urlencoding::encode(branch)));
        let reference: RefResponse = self.get_json(url).await?;
        Ok(reference.object.sha)
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), StoreError> {
        let url = self.url("git/refs");
        let body = json!({ "ref": format!("refs/heads/{name}"), "sha": sha });
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Self::fail(response).await;
        }
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> Result<(), StoreError> {
        let url = self.url(&format!("git/refs/heads/{}", urlencoding::encode(name)));
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        if !response.status().is_success() {
            return Self::fail(response).await;
        }
        Ok(())
    }

    async fn list_branches(&self) -> Result<Vec<BranchSummary>, StoreError> {
        // Preview branches are few; one page is plenty.
        let url = self.url("branches?per_page=100");
        let branches: Vec<BranchItem> = self.get_json(url).await?;
        Ok(branches
            .into_iter()
            .map(|b| BranchSummary {
                name: b.name,
                sha: b.commit.sha,
            })
            .collect())
    }

    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, StoreError> {
        let url = self.url(&format!(
            "compare/{}...{}",
            urlencoding::encode(base),
            urlencoding::encode(head)
        ));
        let compared: CompareResponse = self.get_json(url).await?;
        Ok(Comparison {
            ahead_by: compared.ahead_by,
            commits: compared.commits.into_iter().map(CommitDetail::into_info).collect(),
            merge_base: compared.merge_base_commit.map(|c| c.sha),
        })
    }

    async fn merge(&self, base: &str, head: &str, message: &str) -> Result<(), StoreError> {
        let url = self.url("merges");
        let body = json!({ "base": base, "head": head, "commit_message": message });
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Self::fail(response).await;
        }
        Ok(())
    }

    async fn get_commit(&self, sha: &str) -> Result<CommitInfo, StoreError> {
        let url = self.url(&format!("commits/{}", urlencoding::encode(sha)));
        let detail: CommitDetail = self.get_json(url).await?;
        Ok(detail.into_info())
    }
}
