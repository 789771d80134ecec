// src/git/mod.rs

//! Git operations used while fetching and preparing recipe sources.
//!
//! Each operation builds a git command line and hands it to the
//! [`ShellContext`]. Network-heavy operations (`fetch`, submodule updates,
//! checkouts) run on the async I/O lane; quick local queries block.

pub mod submodules;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::context::ShellContext;
use crate::errors::{ExecResult, Result};
use crate::exec::{ExecutionRequest, ExecutionResult};
use crate::types::{ExecutionMode, FailPolicy};

use self::submodules::{local_urls, original_urls, parse_config_listing};

pub const DEFAULT_GIT: &str = "git";

/// Branch created in a local source repo by [`Git::local_checkout`].
pub const LOCAL_BUILD_BRANCH: &str = "recipe_build";

const DEFAULT_EMAIL: &str = "builder@localhost";
const DEFAULT_NAME: &str = "Recipe Build System";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Other,
}

impl HostPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else {
            HostPlatform::Other
        }
    }
}

/// Git wrapper bound to a shell context.
#[derive(Debug, Clone)]
pub struct Git<'a> {
    ctx: &'a ShellContext,
    binary: String,
}

impl<'a> Git<'a> {
    pub fn new(ctx: &'a ShellContext) -> Self {
        Self {
            ctx,
            binary: DEFAULT_GIT.to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn request<I, S>(&self, args: I, dir: Option<&Path>, logfile: Option<&str>) -> ExecutionRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv = std::iter::once(self.binary.clone()).chain(args.into_iter().map(Into::into));
        let mut req = ExecutionRequest::argv(argv).mode(ExecutionMode::Blocking);
        if let Some(dir) = dir {
            req = req.in_dir(dir);
        }
        if let Some(sink) = logfile {
            req = req.log_to(sink);
        }
        req
    }

    fn call<I, S>(&self, args: I, dir: Option<&Path>, logfile: Option<&str>) -> ExecResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctx.run(&self.request(args, dir, logfile))
    }

    async fn call_async<I, S>(
        &self,
        args: I,
        dir: &Path,
        fail: FailPolicy,
        logfile: Option<&str>,
    ) -> ExecResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let req = self
            .request(args, Some(dir), logfile)
            .fail_policy(fail)
            .io_bound();
        self.ctx.run_async(req).await
    }

    /// Make sure commits in `git_dir` have an author identity.
    pub fn ensure_user_is_set(&self, git_dir: &Path, logfile: Option<&str>) -> Result<()> {
        if self.call(["config", "user.email"], Some(git_dir), logfile).is_err() {
            self.call(["config", "user.email", DEFAULT_EMAIL], Some(git_dir), logfile)?;
        }
        if self.call(["config", "user.name"], Some(git_dir), logfile).is_err() {
            self.call(["config", "user.name", DEFAULT_NAME], Some(git_dir), logfile)?;
        }
        Ok(())
    }

    /// `git init`, creating `git_dir` first.
    pub fn init(&self, git_dir: &Path, logfile: Option<&str>) -> Result<()> {
        std::fs::create_dir_all(git_dir)?;
        self.call(["init"], Some(git_dir), logfile)?;
        self.ensure_user_is_set(git_dir, logfile)
    }

    /// `git clean -dfx`.
    pub fn clean(&self, git_dir: &Path, logfile: Option<&str>) -> ExecResult {
        self.call(["clean", "-dfx"], Some(git_dir), logfile)
    }

    pub fn list_tags(&self, git_dir: &Path) -> Result<Vec<String>> {
        let res = self.call(["tag", "-l"], Some(git_dir), None)?;
        Ok(res
            .stdout_lossy()
            .trim()
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Create a signed tag on `commit` and push it to `origin`.
    pub fn create_tag(
        &self,
        git_dir: &Path,
        tag_name: &str,
        description: &str,
        commit: &str,
        logfile: Option<&str>,
    ) -> ExecResult {
        self.call(
            ["tag", "-s", tag_name, "-m", description, commit],
            Some(git_dir),
            logfile,
        )?;
        self.call(["push", "origin", tag_name], Some(git_dir), logfile)
    }

    pub fn delete_tag(&self, git_dir: &Path, tag_name: &str, logfile: Option<&str>) -> ExecResult {
        self.call(["tag", "-d", tag_name], Some(git_dir), logfile)
    }

    /// Fetch all refs from all remotes.
    pub async fn fetch(&self, git_dir: &Path, fail: FailPolicy, logfile: Option<&str>) -> ExecResult {
        self.call_async(["fetch", "--all"], git_dir, fail, logfile).await
    }

    /// Update submodules, optionally from local checkouts under `src_dir`.
    ///
    /// With `src_dir`, submodule URLs are pointed at `src_dir/<path>` for
    /// the update and restored afterwards.
    pub async fn submodules_update(
        &self,
        git_dir: &Path,
        src_dir: Option<&str>,
        fail: FailPolicy,
        offline: bool,
        logfile: Option<&str>,
    ) -> Result<()> {
        let gitmodules = ["config", "--file=.gitmodules"];

        let entries = match src_dir {
            Some(src) => {
                let listing = self
                    .call_async(
                        gitmodules.iter().copied().chain(["--list"]),
                        git_dir,
                        FailPolicy::TolerateFailure,
                        logfile,
                    )
                    .await?;
                let entries = parse_config_listing(&listing.stdout_lossy());
                for (name, url) in local_urls(&entries, src) {
                    debug!(submodule = %name, %url, "pointing submodule at local source");
                    let key = format!("submodule.{name}.url");
                    self.call_async(
                        gitmodules.iter().map(|s| s.to_string()).chain([key, url]),
                        git_dir,
                        FailPolicy::FailFast,
                        logfile,
                    )
                    .await?;
                }
                entries
            }
            None => Vec::new(),
        };

        self.call_async(["submodule", "init"], git_dir, FailPolicy::FailFast, logfile)
            .await?;

        if src_dir.is_some() || !offline {
            self.call_async(["submodule", "sync"], git_dir, FailPolicy::FailFast, logfile)
                .await?;
            self.call_async(["submodule", "update"], git_dir, fail, logfile)
                .await?;
        } else {
            self.call_async(["submodule", "update", "--no-fetch"], git_dir, fail, logfile)
                .await?;
        }

        if src_dir.is_some() {
            for entry in original_urls(&entries) {
                self.call_async(
                    gitmodules
                        .iter()
                        .map(|s| s.to_string())
                        .chain([entry.key.clone(), entry.value.clone()]),
                    git_dir,
                    FailPolicy::FailFast,
                    logfile,
                )
                .await?;
            }
            self.call_async(["submodule", "sync"], git_dir, FailPolicy::FailFast, logfile)
                .await?;
        }
        Ok(())
    }

    /// Reset the work tree to `commit`.
    pub async fn checkout(&self, git_dir: &Path, commit: &str, logfile: Option<&str>) -> ExecResult {
        self.call_async(["reset", "--hard", commit], git_dir, FailPolicy::FailFast, logfile)
            .await
    }

    /// Resolve `commit` to a hash.
    ///
    /// A directory that is not a git checkout yields `not-git-<unix time>`,
    /// which never matches a stored hash and so forces a full fetch.
    pub fn get_hash(&self, git_dir: &Path, commit: &str, logfile: Option<&str>) -> Result<String> {
        if !git_dir.join(".git").is_dir() {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or_default();
            return Ok(format!("not-git-{now}"));
        }
        let req = self
            .request(["rev-parse", commit], Some(git_dir), logfile)
            .tolerate_failure();
        let res = self.ctx.run(&req)?;
        Ok(res.stdout_lossy().trim_end().to_string())
    }

    /// Clone `local_git_dir` at `commit` into `git_dir`, sharing objects.
    pub async fn local_checkout(
        &self,
        git_dir: &Path,
        local_git_dir: &Path,
        commit: &str,
        logfile: Option<&str>,
    ) -> Result<()> {
        self.call_async(
            ["checkout", commit, "-B", LOCAL_BUILD_BRANCH],
            local_git_dir,
            FailPolicy::FailFast,
            logfile,
        )
        .await?;

        let source = local_git_dir.to_string_lossy().into_owned();
        self.call_async(
            ["clone", source.as_str(), "-s", "-b", LOCAL_BUILD_BRANCH, "."],
            git_dir,
            FailPolicy::FailFast,
            logfile,
        )
        .await?;

        self.ensure_user_is_set_async(git_dir, logfile).await?;
        self.submodules_update(git_dir, Some(source.as_str()), FailPolicy::FailFast, false, logfile)
            .await
    }

    async fn ensure_user_is_set_async(&self, git_dir: &Path, logfile: Option<&str>) -> Result<()> {
        for (key, default) in [("user.email", DEFAULT_EMAIL), ("user.name", DEFAULT_NAME)] {
            let current = self
                .call_async(["config", key], git_dir, FailPolicy::FailFast, logfile)
                .await;
            if current.is_err() {
                self.call_async(["config", key, default], git_dir, FailPolicy::FailFast, logfile)
                    .await?;
            }
        }
        Ok(())
    }

    /// Add a remote, or update its URL if it already exists.
    pub fn add_remote(
        &self,
        git_dir: &Path,
        name: &str,
        url: &str,
        logfile: Option<&str>,
    ) -> ExecResult {
        match self.call(["remote", "add", name, url], Some(git_dir), logfile) {
            Ok(res) => Ok(res),
            Err(e) if e.is_configuration_error() => Err(e),
            Err(_) => self.call(["remote", "set-url", name, url], Some(git_dir), logfile),
        }
    }

    /// On Windows, automatic CRLF conversion must be off.
    pub fn check_line_endings(&self, platform: HostPlatform) -> Result<bool> {
        if platform != HostPlatform::Windows {
            return Ok(true);
        }
        let req = self
            .request(["config", "--get", "core.autocrlf"], None, None)
            .tolerate_failure();
        let res: ExecutionResult = self.ctx.run(&req)?;
        Ok(res.stdout_lossy().to_lowercase().contains("false"))
    }

    /// Turn an existing directory into a repository with one commit.
    ///
    /// Failing to add or commit (e.g. an empty directory) is ignored.
    pub fn init_directory(&self, git_dir: &Path, logfile: Option<&str>) -> Result<()> {
        self.init(git_dir, logfile)?;
        let committed = self
            .call(["add", "--force", "-A", "."], Some(git_dir), logfile)
            .and_then(|_| self.call(["commit", "-m", "Initial commit"], Some(git_dir), logfile));
        if let Err(e) = committed {
            info!(dir = %git_dir.display(), error = %e, "initial commit skipped");
        }
        Ok(())
    }

    /// Apply a mailbox patch with `git am`.
    pub fn apply_patch(&self, patch: &Path, git_dir: &Path, logfile: Option<&str>) -> ExecResult {
        let patch = patch.to_string_lossy().into_owned();
        self.call(["am", "--ignore-whitespace", patch.as_str()], Some(git_dir), logfile)
    }
}
