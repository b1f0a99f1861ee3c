//! In-memory collaborators for exercising the migration pipeline without a host.
//!
//! Every fake records the calls it receives so tests can assert on ordering and
//! arguments. Storage and mirror fakes operate on real temporary directories.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use profmig_core::{
    AccountIdentity, AccountTranslator, AclEditor, BlockSize, BlockStorage, CollaboratorError,
    CollaboratorResult, CommandOutput, DirectoryEntry, DirectoryQuery, DirectoryService,
    HiveStore, MirrorOutput, MirrorRequest, MirrorTool, MountPoint, ProcessRunner,
};
use walkdir::WalkDir;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn io_error(operation: &'static str, path: &Path, source: io::Error) -> CollaboratorError {
    CollaboratorError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

/// Directory with entries registered per search root.
#[derive(Default)]
pub struct FakeDirectory {
    entries: HashMap<String, Vec<DirectoryEntry>>,
    failing_roots: HashSet<String>,
    queries: Mutex<Vec<(String, DirectoryQuery)>>,
}

impl FakeDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account under `root`.
    #[must_use]
    pub fn with_account(mut self, root: &str, identity: &AccountIdentity) -> Self {
        self.entries
            .entry(root.to_string())
            .or_default()
            .push(DirectoryEntry {
                sid: identity.sid.clone(),
                account_name: identity.account_name.clone(),
                domain: identity.domain.clone(),
            });
        self
    }

    /// Make every query against `root` fail.
    #[must_use]
    pub fn with_failing_root(mut self, root: &str) -> Self {
        self.failing_roots.insert(root.to_string());
        self
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<(String, DirectoryQuery)> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl DirectoryService for FakeDirectory {
    async fn find_in_root(
        &self,
        root: &str,
        query: &DirectoryQuery,
    ) -> CollaboratorResult<Option<DirectoryEntry>> {
        lock(&self.queries).push((root.to_string(), query.clone()));
        if self.failing_roots.contains(root) {
            return Err(CollaboratorError::rejected(
                "directory query",
                format!("server for {root} unavailable"),
            ));
        }
        let found = self.entries.get(root).and_then(|entries| {
            entries
                .iter()
                .find(|entry| match query {
                    DirectoryQuery::AccountName(name) => entry.account_name.eq_ignore_ascii_case(name),
                    DirectoryQuery::Identifier(sid) => &entry.sid == sid,
                })
                .cloned()
        });
        Ok(found)
    }
}

/// Host-local translator backed by a fixed account table.
#[derive(Default)]
pub struct FakeTranslator {
    accounts: HashMap<String, AccountIdentity>,
    failing: bool,
    lookups: Mutex<Vec<String>>,
}

impl FakeTranslator {
    /// Translator that knows no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account.
    #[must_use]
    pub fn with_account(mut self, identity: AccountIdentity) -> Self {
        self.accounts
            .insert(identity.account_name.to_ascii_lowercase(), identity);
        self
    }

    /// Make every translation fail.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Names looked up so far.
    pub fn lookups(&self) -> Vec<String> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl AccountTranslator for FakeTranslator {
    async fn translate(&self, account_name: &str) -> CollaboratorResult<Option<AccountIdentity>> {
        lock(&self.lookups).push(account_name.to_string());
        if self.failing {
            return Err(CollaboratorError::rejected("translate", "trust relationship failed"));
        }
        Ok(self.accounts.get(&account_name.to_ascii_lowercase()).cloned())
    }
}

/// Storage call recorded by [`FakeBlockStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    /// Container created.
    Create {
        /// Backing file.
        path: PathBuf,
        /// Requested quota.
        size_bytes: u64,
        /// Requested block size.
        block_size: BlockSize,
    },
    /// Container initialized and formatted.
    Initialize {
        /// Backing file.
        path: PathBuf,
        /// Volume label.
        label: String,
    },
    /// Existing container attached.
    Attach(PathBuf),
    /// Container detached.
    Detach(PathBuf),
}

#[derive(Default)]
struct StorageState {
    calls: Vec<StorageCall>,
    attached: BTreeSet<PathBuf>,
    empty_polls_remaining: u32,
}

/// Block storage whose volumes are plain directories under a mount root.
pub struct FakeBlockStorage {
    mount_root: PathBuf,
    fail_initialize: bool,
    fail_attach: bool,
    fail_detach: bool,
    extra_designators: Vec<MountPoint>,
    state: Mutex<StorageState>,
}

impl FakeBlockStorage {
    /// Storage that mounts every container at `mount_root/<file stem>`.
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
            fail_initialize: false,
            fail_attach: false,
            fail_detach: false,
            extra_designators: Vec::new(),
            state: Mutex::new(StorageState::default()),
        }
    }

    /// Fail every initialization after the backing file was written.
    #[must_use]
    pub const fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Fail every attach of an existing container.
    #[must_use]
    pub const fn failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    /// Fail every detach.
    #[must_use]
    pub const fn failing_detach(mut self) -> Self {
        self.fail_detach = true;
        self
    }

    /// Report an additional designator for every attached container.
    #[must_use]
    pub fn with_extra_designator(mut self, designator: MountPoint) -> Self {
        self.extra_designators.push(designator);
        self
    }

    /// Report no designators for the first `polls` enumerations.
    #[must_use]
    pub fn with_empty_polls(self, polls: u32) -> Self {
        lock(&self.state).empty_polls_remaining = polls;
        self
    }

    /// Directory that backs the volume of `backing_path`.
    pub fn mount_dir(&self, backing_path: &Path) -> PathBuf {
        let stem = backing_path
            .file_stem()
            .map_or_else(|| "volume".into(), |stem| stem.to_string_lossy().into_owned());
        self.mount_root.join(stem)
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<StorageCall> {
        lock(&self.state).calls.clone()
    }

    /// Whether `backing_path` is currently attached.
    pub fn is_attached(&self, backing_path: &Path) -> bool {
        lock(&self.state).attached.contains(backing_path)
    }

    /// Number of initialize calls received.
    pub fn initialize_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| matches!(call, StorageCall::Initialize { .. }))
            .count()
    }

    fn mark_attached(&self, path: &Path) -> CollaboratorResult<()> {
        let mount = self.mount_dir(path);
        fs::create_dir_all(&mount).map_err(|err| io_error("mount", &mount, err))?;
        lock(&self.state).attached.insert(path.to_path_buf());
        Ok(())
    }
}

#[async_trait]
impl BlockStorage for FakeBlockStorage {
    async fn create(
        &self,
        path: &Path,
        size_bytes: u64,
        block_size: BlockSize,
    ) -> CollaboratorResult<()> {
        lock(&self.state).calls.push(StorageCall::Create {
            path: path.to_path_buf(),
            size_bytes,
            block_size,
        });
        if path.exists() {
            return Err(CollaboratorError::rejected("create", "backing file already exists"));
        }
        fs::write(path, b"container").map_err(|err| io_error("create", path, err))
    }

    async fn initialize(&self, path: &Path, label: &str) -> CollaboratorResult<()> {
        lock(&self.state).calls.push(StorageCall::Initialize {
            path: path.to_path_buf(),
            label: label.to_string(),
        });
        if self.fail_initialize {
            lock(&self.state).attached.insert(path.to_path_buf());
            return Err(CollaboratorError::rejected("initialize", "format failed"));
        }
        self.mark_attached(path)
    }

    async fn attach(&self, path: &Path) -> CollaboratorResult<()> {
        lock(&self.state).calls.push(StorageCall::Attach(path.to_path_buf()));
        if self.fail_attach {
            return Err(CollaboratorError::rejected("attach", "container in use"));
        }
        if !path.exists() {
            return Err(CollaboratorError::rejected("attach", "backing file missing"));
        }
        self.mark_attached(path)
    }

    async fn mount_points(&self, path: &Path) -> CollaboratorResult<Vec<MountPoint>> {
        let mut state = lock(&self.state);
        if state.empty_polls_remaining > 0 {
            state.empty_polls_remaining -= 1;
            return Ok(Vec::new());
        }
        if !state.attached.contains(path) {
            return Ok(Vec::new());
        }
        let mut designators = vec![MountPoint::new(self.mount_dir(path).display().to_string())];
        designators.extend(self.extra_designators.iter().cloned());
        Ok(designators)
    }

    async fn detach(&self, path: &Path) -> CollaboratorResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(StorageCall::Detach(path.to_path_buf()));
        if self.fail_detach {
            return Err(CollaboratorError::rejected("detach", "volume busy"));
        }
        state.attached.remove(path);
        Ok(())
    }
}

/// Mirror tool that copies with the filesystem and prints a robocopy-style summary.
#[derive(Default)]
pub struct CopyingMirror {
    forced_exit_codes: HashMap<PathBuf, Option<i32>>,
    requests: Mutex<Vec<MirrorRequest>>,
}

#[derive(Default)]
struct CopyStats {
    dirs_total: u64,
    dirs_copied: u64,
    files_total: u64,
    files_copied: u64,
    bytes_total: u64,
    bytes_copied: u64,
}

impl CopyingMirror {
    /// Mirror that derives its exit code from what it copied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `code` for transfers from `source` after copying.
    #[must_use]
    pub fn with_exit_code_for(mut self, source: impl Into<PathBuf>, code: Option<i32>) -> Self {
        self.forced_exit_codes.insert(source.into(), code);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<MirrorRequest> {
        lock(&self.requests).clone()
    }

    fn copy(request: &MirrorRequest) -> CollaboratorResult<CopyStats> {
        let excluded_files = compile_globs(&request.exclude_files)?;
        let mut stats = CopyStats::default();
        let walker = WalkDir::new(&request.source).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.depth() > 0
                && request
                    .exclude_dirs
                    .iter()
                    .any(|dir| entry.file_name().to_string_lossy().eq_ignore_ascii_case(dir)))
        });
        for entry in walker {
            let entry = entry.map_err(|err| {
                io_error("walk", &request.source, io::Error::other(err.to_string()))
            })?;
            let relative = entry
                .path()
                .strip_prefix(&request.source)
                .map_err(|err| io_error("walk", entry.path(), io::Error::other(err.to_string())))?;
            let destination = request.destination.join(relative);
            if entry.file_type().is_dir() {
                stats.dirs_total += 1;
                if !destination.exists() {
                    stats.dirs_copied += 1;
                    fs::create_dir_all(&destination)
                        .map_err(|err| io_error("create dir", &destination, err))?;
                }
                continue;
            }
            if excluded_files.is_match(entry.file_name()) {
                continue;
            }
            let len = entry
                .metadata()
                .map_err(|err| io_error("stat", entry.path(), io::Error::other(err.to_string())))?
                .len();
            stats.files_total += 1;
            stats.bytes_total += len;
            if request.existing_target && is_not_older(&destination, entry.path()) {
                continue;
            }
            fs::copy(entry.path(), &destination).map_err(|err| io_error("copy", &destination, err))?;
            stats.files_copied += 1;
            stats.bytes_copied += len;
        }
        Ok(stats)
    }
}

fn is_not_older(destination: &Path, source: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(destination), modified(source)) {
        (Some(dest), Some(src)) => dest >= src,
        _ => false,
    }
}

fn compile_globs(patterns: &[String]) -> CollaboratorResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| CollaboratorError::rejected("mirror", err.to_string()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| CollaboratorError::rejected("mirror", err.to_string()))
}

#[async_trait]
impl MirrorTool for CopyingMirror {
    async fn mirror(&self, request: &MirrorRequest) -> CollaboratorResult<MirrorOutput> {
        lock(&self.requests).push(request.clone());
        let stats = Self::copy(request)?;
        let exit_code = self
            .forced_exit_codes
            .get(&request.source)
            .copied()
            .unwrap_or(Some(i32::from(stats.files_copied > 0)));
        let stdout = format!(
            "------------------------------------------------------------------------------\n\
             \n               Total    Copied   Skipped  Mismatch    FAILED    Extras\n\
             \x20   Dirs : {:>9} {:>9} {:>9}         0         0         0\n\
             \x20  Files : {:>9} {:>9} {:>9}         0         0         0\n\
             \x20  Bytes : {:>9} {:>9} {:>9}         0         0         0\n",
            stats.dirs_total,
            stats.dirs_copied,
            stats.dirs_total - stats.dirs_copied,
            stats.files_total,
            stats.files_copied,
            stats.files_total - stats.files_copied,
            stats.bytes_total,
            stats.bytes_copied,
            stats.bytes_total - stats.bytes_copied,
        );
        Ok(MirrorOutput { exit_code, stdout })
    }
}

/// ACL call recorded by [`RecordingAclEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclCall {
    /// Owner change.
    SetOwner {
        /// Target path.
        path: PathBuf,
        /// New owner.
        principal: String,
        /// Applied to the whole tree.
        recursive: bool,
    },
    /// Reset to inherited entries.
    Reset {
        /// Target path.
        path: PathBuf,
        /// Applied to the whole tree.
        recursive: bool,
    },
    /// Full-control grant.
    Grant {
        /// Target path.
        path: PathBuf,
        /// Grantee.
        principal: String,
        /// Applied to the whole tree.
        recursive: bool,
    },
}

/// ACL editor that only records calls.
#[derive(Default)]
pub struct RecordingAclEditor {
    failing: bool,
    calls: Mutex<Vec<AclCall>>,
}

impl RecordingAclEditor {
    /// Editor that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor that rejects every call.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<AclCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: AclCall, operation: &'static str) -> CollaboratorResult<()> {
        lock(&self.calls).push(call);
        if self.failing {
            return Err(CollaboratorError::rejected(operation, "access is denied"));
        }
        Ok(())
    }
}

#[async_trait]
impl AclEditor for RecordingAclEditor {
    async fn set_owner(&self, path: &Path, principal: &str, recursive: bool) -> CollaboratorResult<()> {
        self.record(
            AclCall::SetOwner {
                path: path.to_path_buf(),
                principal: principal.to_string(),
                recursive,
            },
            "set owner",
        )
    }

    async fn reset(&self, path: &Path, recursive: bool) -> CollaboratorResult<()> {
        self.record(
            AclCall::Reset {
                path: path.to_path_buf(),
                recursive,
            },
            "reset",
        )
    }

    async fn grant_full_control(
        &self,
        path: &Path,
        principal: &str,
        recursive: bool,
    ) -> CollaboratorResult<()> {
        self.record(
            AclCall::Grant {
                path: path.to_path_buf(),
                principal: principal.to_string(),
                recursive,
            },
            "grant",
        )
    }
}

#[derive(Default)]
struct HiveState {
    loaded: BTreeMap<String, PathBuf>,
    keys: BTreeSet<String>,
    deleted: Vec<String>,
    load_failures: u32,
    unload_failures: u32,
    load_attempts: u32,
    unload_attempts: u32,
}

/// Registry hive store kept entirely in memory.
#[derive(Default)]
pub struct FakeHiveStore {
    seeded_keys: Vec<String>,
    keep_root_after_unload: bool,
    state: Mutex<HiveState>,
}

impl FakeHiveStore {
    /// Store whose hives contain no subkeys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subkeys (relative to the hive root) present in every loaded hive.
    #[must_use]
    pub fn with_keys(mut self, keys: &[&str]) -> Self {
        self.seeded_keys = keys.iter().map(|key| (*key).to_string()).collect();
        self
    }

    /// Fail the first `count` load attempts.
    #[must_use]
    pub fn failing_loads(self, count: u32) -> Self {
        lock(&self.state).load_failures = count;
        self
    }

    /// Fail the first `count` unload attempts.
    #[must_use]
    pub fn failing_unloads(self, count: u32) -> Self {
        lock(&self.state).unload_failures = count;
        self
    }

    /// Leave the namespace root key behind after a successful unload.
    #[must_use]
    pub const fn keeping_root_after_unload(mut self) -> Self {
        self.keep_root_after_unload = true;
        self
    }

    /// Namespaces still loaded.
    pub fn mounted(&self) -> Vec<String> {
        lock(&self.state).loaded.keys().cloned().collect()
    }

    /// Keys deleted so far, in order.
    pub fn deleted_keys(&self) -> Vec<String> {
        lock(&self.state).deleted.clone()
    }

    /// Load attempts received.
    pub fn load_attempts(&self) -> u32 {
        lock(&self.state).load_attempts
    }

    /// Unload attempts received.
    pub fn unload_attempts(&self) -> u32 {
        lock(&self.state).unload_attempts
    }
}

fn key_id(key: &str) -> String {
    key.to_ascii_uppercase()
}

fn is_within(key: &str, root: &str) -> bool {
    key == root || key.starts_with(&format!("{root}\\"))
}

#[async_trait]
impl HiveStore for FakeHiveStore {
    async fn load(&self, namespace: &str, hive_file: &Path) -> CollaboratorResult<()> {
        let mut state = lock(&self.state);
        state.load_attempts += 1;
        if state.load_failures > 0 {
            state.load_failures -= 1;
            return Err(CollaboratorError::rejected("load", "hive file in use"));
        }
        let root = key_id(namespace);
        state.loaded.insert(namespace.to_string(), hive_file.to_path_buf());
        state.keys.insert(root.clone());
        for key in &self.seeded_keys {
            state.keys.insert(format!("{root}\\{}", key_id(key)));
        }
        Ok(())
    }

    async fn unload(&self, namespace: &str) -> CollaboratorResult<()> {
        let mut state = lock(&self.state);
        state.unload_attempts += 1;
        if state.unload_failures > 0 {
            state.unload_failures -= 1;
            return Err(CollaboratorError::rejected("unload", "access is denied"));
        }
        state.loaded.remove(namespace);
        let root = key_id(namespace);
        let keep_root = self.keep_root_after_unload;
        state
            .keys
            .retain(|key| !is_within(key, &root) || (keep_root && *key == root));
        Ok(())
    }

    async fn key_exists(&self, key: &str) -> CollaboratorResult<bool> {
        Ok(lock(&self.state).keys.contains(&key_id(key)))
    }

    async fn delete_key(&self, key: &str) -> CollaboratorResult<()> {
        let mut state = lock(&self.state);
        let root = key_id(key);
        if !state.keys.contains(&root) {
            return Err(CollaboratorError::rejected("delete key", "key not found"));
        }
        state.keys.retain(|existing| !is_within(existing, &root));
        state.deleted.push(key.to_string());
        Ok(())
    }
}

/// Process runner that replays queued outputs and records every invocation.
#[derive(Default)]
pub struct ScriptedRunner {
    outputs: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    /// Runner with an empty queue; unscripted calls succeed with no output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful invocation printing `stdout`.
    #[must_use]
    pub fn with_stdout(self, stdout: &str) -> Self {
        self.push(CommandOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
        self
    }

    /// Queue an arbitrary output.
    #[must_use]
    pub fn with_output(self, output: CommandOutput) -> Self {
        self.push(output);
        self
    }

    /// Queue an output.
    pub fn push(&self, output: CommandOutput) {
        lock(&self.outputs).push_back(output);
    }

    /// Invocations received so far.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> CollaboratorResult<CommandOutput> {
        lock(&self.calls).push((program.to_string(), args.to_vec()));
        Ok(lock(&self.outputs).pop_front().unwrap_or(CommandOutput {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{STANDARD_PROFILE, account, write_profile};

    #[tokio::test]
    async fn copying_mirror_honours_exclusions_and_incremental_mode() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let source = write_profile(temp.path(), "jdoe", STANDARD_PROFILE)?;
        let destination = temp.path().join("dest");
        fs::create_dir_all(&destination)?;
        let mirror = CopyingMirror::new();
        let mut request = MirrorRequest {
            source: source.clone(),
            destination: destination.clone(),
            threads: 4,
            exclude_dirs: vec!["Temp".into()],
            exclude_files: vec!["*.ost".into()],
            existing_target: false,
            verbose: false,
            log_path: None,
        };

        let first = mirror.mirror(&request).await?;
        assert_eq!(first.exit_code, Some(1));
        assert!(destination.join("Documents").join("report.txt").is_file());
        assert!(!destination.join("AppData/Local/Temp/cache.tmp").exists());
        assert!(!destination.join("AppData/Local/Microsoft/Outlook/mail.ost").exists());

        request.existing_target = true;
        let second = mirror.mirror(&request).await?;
        assert_eq!(second.exit_code, Some(0));
        assert_eq!(mirror.requests().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn fake_hive_store_tracks_mounts_and_keys() -> anyhow::Result<()> {
        let store = FakeHiveStore::new().with_keys(&["Software\\Shell"]);
        store.load("HKU\\T1", Path::new("NTUSER.DAT")).await?;
        assert!(store.key_exists("HKU\\T1\\Software\\Shell").await?);
        store.delete_key("HKU\\T1\\Software\\Shell").await?;
        assert!(!store.key_exists("HKU\\T1\\Software\\Shell").await?);
        store.unload("HKU\\T1").await?;
        assert!(store.mounted().is_empty());
        assert!(!store.key_exists("HKU\\T1").await?);
        Ok(())
    }

    #[tokio::test]
    async fn fake_directory_matches_names_case_insensitively() -> anyhow::Result<()> {
        let directory = FakeDirectory::new().with_account("DC=corp", &account("S-1-5-21-9-1001", "JDoe", None));
        let found = directory
            .find_in_root("DC=corp", &DirectoryQuery::AccountName("jdoe".into()))
            .await?;
        assert_eq!(found.map(|entry| entry.account_name), Some("JDoe".into()));
        Ok(())
    }
}
