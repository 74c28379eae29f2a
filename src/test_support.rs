//! Local source repositories for tests. Nothing here touches the network.

use git2::{Commit, Oid, Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};

/// A non-bare repository with two commits on its default branch.
///
/// - `first`: `README.md` = "first\n"
/// - `latest`: `README.md` = "second\n", plus `src/lib.rs`
pub struct SourceRepo {
    pub path: PathBuf,
    pub first: Oid,
    pub latest: Oid,
    url: String,
}

impl SourceRepo {
    /// Location usable as a clone URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

pub fn init_source_repo(path: &Path) -> SourceRepo {
    fs::create_dir_all(path).expect("create source dir");
    let repo = Repository::init(path).expect("init source repo");

    let first = commit_files(&repo, &[("README.md", "first\n")], "initial");
    let latest = commit_files(
        &repo,
        &[("README.md", "second\n"), ("src/lib.rs", "pub fn packed() {}\n")],
        "add lib",
    );

    SourceRepo {
        path: path.to_path_buf(),
        first,
        latest,
        url: path.display().to_string(),
    }
}

/// Write `files` into the working tree and commit them on HEAD.
pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
    let workdir = repo.workdir().expect("non-bare repo").to_path_buf();
    let mut index = repo.index().expect("open index");

    for (name, contents) in files {
        let file_path = workdir.join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&file_path, contents).expect("write file");
        index.add_path(Path::new(name)).expect("stage file");
    }
    index.write().expect("write index");

    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let signature = Signature::now("packer", "packer@example.com").expect("signature");

    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .expect("commit")
}
