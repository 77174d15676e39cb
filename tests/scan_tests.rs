use dirmap::classify::Exclusions;
use dirmap::{
    CancelToken, Node, PruneBudget, ScanOptions, ScanTick, flatten, prune, scan,
};
use std::collections::HashSet;
use std::fs::{self, File};
use std::os::unix::fs::symlink;
use std::path::Path;
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

/// Options with no cache probing and no throttle, so tempdirs under /tmp
/// are scanned like any other directory.
fn options() -> ScanOptions {
    ScanOptions {
        cache_patterns: Vec::new(),
        throttle_every: 0,
        ..ScanOptions::default()
    }
}

fn sparse(path: &Path, len: u64) {
    File::create(path)
        .expect("Failed to create file")
        .set_len(len)
        .expect("Failed to size file");
}

fn run(root: &Path, options: &ScanOptions) -> Node {
    scan(root, options, &CancelToken::new(), &mut |_: &ScanTick<'_>| {})
        .expect("Failed to scan directory")
        .into_node()
        .expect("Scan was cancelled")
}

fn find<'a>(node: &'a Node, name: &str) -> Option<&'a Node> {
    if node.name == name {
        return Some(node);
    }
    node.children.iter().find_map(|c| find(c, name))
}

#[test]
fn test_size_is_exact_sum_of_regular_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();

    // temp/
    // ├── dir1/
    // │   ├── file1.txt  (100)
    // │   └── file2.txt  (200)
    // ├── dir2/
    // │   └── subdir/
    // │       └── file3.bin (3 MiB)
    // └── file4.txt (50)
    let subdir = root.join("dir2").join("subdir");
    fs::create_dir(root.join("dir1")).expect("Failed to create dir1");
    fs::create_dir_all(&subdir).expect("Failed to create subdir");
    fs::write(root.join("dir1").join("file1.txt"), vec![b'a'; 100]).expect("write file1");
    fs::write(root.join("dir1").join("file2.txt"), vec![b'b'; 200]).expect("write file2");
    sparse(&subdir.join("file3.bin"), 3 * MIB);
    fs::write(root.join("file4.txt"), vec![b'c'; 50]).expect("write file4");

    let tree = run(root, &options());

    assert_eq!(tree.size, 3 * MIB + 350);
    assert_eq!(tree.file_count, 4);
    assert_eq!(tree.dir_count, 3);
    for node in &tree.children {
        assert!(node.size <= tree.size);
    }
    // Only the file over the visibility threshold becomes a node.
    assert!(find(&tree, "file3.bin").is_some_and(|n| n.is_file()));
    assert!(find(&tree, "file1.txt").is_none());
    assert_eq!(find(&tree, "dir1").map(|n| n.size), Some(300));
}

#[test]
fn test_excluded_paths_contribute_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir(root.join("keep")).expect("create keep");
    fs::create_dir(root.join("skip")).expect("create skip");
    fs::create_dir(root.join("node_modules")).expect("create node_modules");
    fs::write(root.join("keep").join("a"), vec![0u8; 10]).expect("write a");
    fs::write(root.join("keep").join("trace.log"), vec![0u8; 70]).expect("write log");
    sparse(&root.join("skip").join("big"), 4 * MIB);
    fs::write(root.join("node_modules").join("dep.js"), vec![0u8; 500]).expect("write dep");

    let exclusions = Exclusions::with_paths([root.join("skip")])
        .with_names(&["node_modules".to_string(), "*.log".to_string()])
        .expect("Failed to build exclusions");
    let tree = run(
        root,
        &ScanOptions {
            exclusions,
            ..options()
        },
    );

    assert_eq!(tree.size, 10);
    assert_eq!(tree.file_count, 1);
    assert!(find(&tree, "skip").is_none());
    assert!(find(&tree, "node_modules").is_none());
}

#[test]
fn test_symlinks_are_never_followed_or_counted() {
    let outside = TempDir::new().expect("Failed to create temp dir");
    sparse(&outside.path().join("target.bin"), 8 * MIB);

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::write(root.join("real"), vec![0u8; 42]).expect("write real");
    symlink(outside.path().join("target.bin"), root.join("file-link")).expect("file symlink");
    symlink(outside.path(), root.join("dir-link")).expect("dir symlink");

    let tree = run(root, &options());

    assert_eq!(tree.size, 42);
    assert_eq!(tree.file_count, 1);
    assert_eq!(tree.dir_count, 0);
    assert!(find(&tree, "file-link").is_none());
    assert!(find(&tree, "dir-link").is_none());
}

#[test]
fn test_symlinked_root_is_resolved() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let real = temp_dir.path().join("real");
    fs::create_dir(&real).expect("create real");
    fs::write(real.join("a"), vec![0u8; 9]).expect("write a");
    let link = temp_dir.path().join("link");
    symlink(&real, &link).expect("root symlink");

    let tree = run(&link, &options());
    assert_eq!(tree.size, 9);
    assert_eq!(tree.path, fs::canonicalize(&real).expect("canonicalize"));
}

#[test]
fn test_hardlinks_are_counted_once() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir(root.join("a")).expect("create a");
    fs::create_dir(root.join("b")).expect("create b");
    sparse(&root.join("a").join("data.bin"), 5 * MIB);
    fs::hard_link(root.join("a").join("data.bin"), root.join("b").join("same.bin"))
        .expect("Failed to create hardlink");

    let tree = run(root, &options());

    assert_eq!(tree.size, 5 * MIB);
    assert_eq!(tree.file_count, 1);
}

#[test]
fn test_wide_directory_gets_summary_node() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    for i in 0..60u64 {
        sparse(&root.join(format!("f{i:02}.bin")), (i + 2) * MIB);
    }

    let tree = run(root, &options());

    assert_eq!(tree.children.len(), 51);
    let summary = tree.children.last().expect("summary node");
    assert!(summary.is_summary());
    assert_eq!(summary.name, "... 10 other items");
    assert_eq!(summary.path, tree.path.join("..."));
    // The ten smallest files: 2 MiB through 11 MiB.
    assert_eq!(summary.size, (2..=11).sum::<u64>() * MIB);
    assert_eq!(tree.children[0].name, "f59.bin");
    assert!(tree.children[..50].iter().all(|c| c.is_file()));
    assert_eq!(tree.size, (2..=61).sum::<u64>() * MIB);
}

#[test]
fn test_small_cache_directory_is_skipped() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    sparse(&root.join("big.bin"), 2 * MIB);
    fs::write(root.join("small.txt"), vec![0u8; 10 * 1024]).expect("write small");
    fs::create_dir(root.join("cache")).expect("create cache");
    for i in 0..5 {
        fs::write(root.join("cache").join(format!("entry{i}")), vec![0u8; 1024 / 5])
            .expect("write cache entry");
    }

    let tree = run(
        root,
        &ScanOptions {
            cache_patterns: vec!["cache".to_string()],
            ..options()
        },
    );

    assert_eq!(tree.size, 2 * MIB + 10 * 1024);
    assert_eq!(tree.file_count, 2);
    assert_eq!(tree.dir_count, 0);
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].name, "big.bin");
}

#[test]
fn test_large_cache_directory_is_kept() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir(root.join("Cache")).expect("create cache");
    sparse(&root.join("Cache").join("huge.pack"), 20 * MIB);

    let tree = run(
        root,
        &ScanOptions {
            cache_patterns: vec!["cache".to_string()],
            ..options()
        },
    );

    assert_eq!(tree.size, 20 * MIB);
    assert!(find(&tree, "Cache").is_some());
}

#[test]
fn test_depth_limit_stops_descent() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    let deep = root.join("l1").join("l2");
    fs::create_dir_all(&deep).expect("create dirs");
    fs::write(root.join("l1").join("shallow"), vec![0u8; 10]).expect("write shallow");
    fs::write(deep.join("deep"), vec![0u8; 1000]).expect("write deep");

    let tree = run(
        root,
        &ScanOptions {
            max_depth: Some(1),
            ..options()
        },
    );

    assert_eq!(tree.size, 10);
    assert_eq!(tree.max_depth(), 1);
    assert!(find(&tree, "l2").is_none());
}

#[test]
fn test_prune_and_flatten_real_tree() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    let mut dir = root.to_path_buf();
    for level in 0..9 {
        dir = dir.join(format!("level{level}"));
        fs::create_dir(&dir).expect("create level");
        for i in 0..3 {
            fs::create_dir(dir.join(format!("side{i}"))).expect("create side");
        }
        sparse(&dir.join("payload.bin"), 2 * MIB);
    }

    let tree = run(root, &options());
    assert_eq!(tree.max_depth(), 10);

    let pruned = prune(&tree, &PruneBudget::default());
    assert_eq!(pruned.max_depth(), 7);
    assert_eq!(pruned.size, tree.size);
    assert_eq!(prune(&pruned, &PruneBudget::default()), pruned);

    let data = flatten(&pruned, 20);
    assert!(data.node_count <= 20);
    assert_eq!(data.parents[0], "");
    let mut seen = HashSet::new();
    for (id, parent) in data.ids.iter().zip(&data.parents) {
        assert!(parent.is_empty() || seen.contains(parent));
        seen.insert(id.clone());
    }
}
