use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dirmap::{CancelToken, PruneBudget, ScanOptions, ScanTick, flatten, prune, scan};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

fn create_test_directory_structure(dir: &Path, depth: usize, files_per_dir: usize) {
    if depth == 0 {
        return;
    }

    for i in 0..files_per_dir {
        fs::write(dir.join(format!("file_{}.txt", i)), format!("Content of file {}", i)).unwrap();
    }
    // One visible file per directory so the tree has leaves to sort.
    File::create(dir.join("large.bin"))
        .unwrap()
        .set_len(2 * 1024 * 1024)
        .unwrap();

    for i in 0..3 {
        let subdir_path = dir.join(format!("subdir_{}", i));
        fs::create_dir_all(&subdir_path).unwrap();
        create_test_directory_structure(&subdir_path, depth - 1, files_per_dir);
    }
}

fn bench_options() -> ScanOptions {
    ScanOptions {
        cache_patterns: Vec::new(),
        throttle_every: 0,
        ..ScanOptions::default()
    }
}

fn run_scan(root: &Path, options: &ScanOptions) -> dirmap::Node {
    scan(root, options, &CancelToken::new(), &mut |_: &ScanTick<'_>| {})
        .unwrap()
        .into_node()
        .unwrap()
}

fn bench_scan(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    create_test_directory_structure(temp_dir.path(), 3, 10);
    let options = bench_options();

    c.bench_function("scan_small_directory", |b| {
        b.iter(|| black_box(run_scan(black_box(temp_dir.path()), &options)))
    });

    let deep_dir = TempDir::new().unwrap();
    create_test_directory_structure(deep_dir.path(), 6, 5);

    c.bench_function("scan_deep_directory", |b| {
        b.iter(|| black_box(run_scan(black_box(deep_dir.path()), &options)))
    });
}

fn bench_postprocess(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    create_test_directory_structure(temp_dir.path(), 6, 2);
    let tree = run_scan(temp_dir.path(), &bench_options());

    c.bench_function("prune_tree", |b| {
        b.iter(|| black_box(prune(black_box(&tree), &PruneBudget::default())))
    });

    let pruned = prune(&tree, &PruneBudget::default());
    c.bench_function("flatten_tree", |b| {
        b.iter(|| black_box(flatten(black_box(&pruned), 300)))
    });
}

criterion_group!(benches, bench_scan, bench_postprocess);
criterion_main!(benches);
