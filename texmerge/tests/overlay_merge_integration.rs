//! Integration tests for the overlay merge.
//!
//! These tests build real base and mod trees on disk and verify:
//! - higher-priority tiers win for the same key
//! - re-running and changing the worker count do not change the output
//! - the progress total equals the copy attempts issued
//! - fatal conditions abort before any file is written
//! - an output tree overlapping an input tree is rejected
//! - cancellation stops tier advancement
//!
//! Run with: `cargo test --test overlay_merge_integration`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use texmerge::config::MergeConfig;
use texmerge::manifest::{ManifestFormat, ManifestRow, ModOrderManifest};
use texmerge::merge::{
    MergeState, NullProgressSink, OverlayMerger, ProgressSink, ProgressSnapshot,
};
use texmerge::MergeError;

// ============================================================================
// Helper Functions
// ============================================================================

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Fixture layout: `<temp>/Data` (base), `<temp>/mods/<name>`, `<temp>/out`.
struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn base(&self) -> PathBuf {
        self.temp.path().join("Data")
    }

    fn mod_root(&self, name: &str) -> PathBuf {
        self.temp.path().join("mods").join(name)
    }

    fn out(&self) -> PathBuf {
        self.temp.path().join("out")
    }

    fn base_texture(&self, key: &str, content: &[u8]) {
        write(&self.base().join("textures").join(key), content);
    }

    fn mod_texture(&self, name: &str, key: &str, content: &[u8]) {
        write(&self.mod_root(name).join("textures").join(key), content);
    }

    /// Write a JSON manifest listing `mods` in increasing priority.
    fn manifest(&self, mods: &[&str]) -> PathBuf {
        let rows = mods
            .iter()
            .enumerate()
            .map(|(i, name)| ManifestRow {
                index: i + 1,
                name: name.to_string(),
                active: true,
                path: self.mod_root(name),
            })
            .collect();
        let path = self.temp.path().join("order.json");
        fs::write(&path, ModOrderManifest::new(rows).to_json()).unwrap();
        path
    }

    fn config(&self, mods: &[&str], threads: usize) -> MergeConfig {
        MergeConfig::new(self.base(), self.out())
            .with_manifest(self.manifest(mods), ManifestFormat::Json)
            .with_threads(threads)
    }

    fn output_texture(&self, key: &str) -> Vec<u8> {
        fs::read(self.out().join("textures").join(key)).unwrap()
    }

    /// Every output file keyed by its path below the output root.
    fn output_tree(&self) -> BTreeMap<String, Vec<u8>> {
        snapshot_tree(&self.out())
    }
}

fn snapshot_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut tree = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(root).unwrap();
            tree.insert(
                relative.to_string_lossy().into_owned(),
                fs::read(entry.path()).unwrap(),
            );
        }
    }
    tree
}

fn count_content(tree: &BTreeMap<String, Vec<u8>>, content: &[u8]) -> usize {
    tree.values().filter(|v| v.as_slice() == content).count()
}

fn merger(config: MergeConfig) -> OverlayMerger {
    OverlayMerger::new(config)
        .unwrap()
        .with_progress_sink(Arc::new(NullProgressSink))
}

/// Base 100 files; mod A overrides 10; mod B overrides 5 of A's and adds 3.
fn standard_fixture() -> Fixture {
    let fixture = Fixture::new();
    for i in 0..100 {
        fixture.base_texture(&format!("landscape/f{:03}.dds", i), b"base");
    }
    for i in 0..10 {
        fixture.mod_texture("A", &format!("landscape/f{:03}.dds", i), b"A");
    }
    for i in 0..5 {
        fixture.mod_texture("B", &format!("landscape/f{:03}.dds", i), b"B");
    }
    for i in 0..3 {
        fixture.mod_texture("B", &format!("new/n{}.dds", i), b"B");
    }
    fixture
}

#[derive(Default)]
struct RecordingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl ProgressSink for RecordingSink {
    fn render(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_highest_priority_tier_wins() {
    let fixture = Fixture::new();
    fixture.base_texture("armor/iron.dds", b"A");
    fixture.mod_texture("mod1", "armor/iron.dds", b"B");
    fixture.mod_texture("mod2", "armor/iron.dds", b"C");

    let summary = merger(fixture.config(&["mod1", "mod2"], 4))
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(fixture.output_texture("armor/iron.dds"), b"C");
    assert_eq!(summary.attempted(), 3);
    assert_eq!(summary.distinct_files, 1);
    assert_eq!(summary.overwritten(), 2);
}

#[test]
fn test_manifest_order_is_priority_not_name() {
    let fixture = Fixture::new();
    fixture.base_texture("sky.dds", b"base");
    fixture.mod_texture("Zeta", "sky.dds", b"zeta");
    fixture.mod_texture("Alpha", "sky.dds", b"alpha");

    merger(fixture.config(&["Zeta", "Alpha"], 2))
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(fixture.output_texture("sky.dds"), b"alpha");
}

#[test]
fn test_inactive_mods_are_skipped() {
    let fixture = Fixture::new();
    fixture.base_texture("sky.dds", b"base");
    fixture.mod_texture("Off", "sky.dds", b"off");

    let manifest_path = fixture.temp.path().join("order.json");
    let manifest = ModOrderManifest::new(vec![ManifestRow {
        index: 1,
        name: "Off".to_string(),
        active: false,
        path: fixture.mod_root("Off"),
    }]);
    fs::write(&manifest_path, manifest.to_json()).unwrap();

    let summary = merger(
        MergeConfig::new(fixture.base(), fixture.out())
            .with_manifest(&manifest_path, ManifestFormat::Json),
    )
    .run(CancellationToken::new())
    .unwrap();

    assert_eq!(fixture.output_texture("sky.dds"), b"base");
    assert_eq!(summary.tiers.len(), 1);
}

#[test]
fn test_case_differences_collapse_to_one_output_file() {
    let fixture = Fixture::new();
    fixture.base_texture("armor/iron.dds", b"base");
    write(
        &fixture.mod_root("Caps").join("Textures/Armor/Iron.DDS"),
        b"caps",
    );

    let summary = merger(fixture.config(&["Caps"], 2))
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(summary.distinct_files, 1);
    assert_eq!(fixture.output_texture("armor/iron.dds"), b"caps");
}

#[test]
fn test_modlist_manifest_end_to_end() {
    let fixture = Fixture::new();
    fixture.base_texture("sky.dds", b"base");
    fixture.mod_texture("Low", "sky.dds", b"low");
    fixture.mod_texture("High", "sky.dds", b"high");

    let modlist = fixture.temp.path().join("modlist.txt");
    fs::write(&modlist, "# load order\n+High\n-Ignored\n+Low\n").unwrap();

    merger(
        MergeConfig::new(fixture.base(), fixture.out()).with_manifest(
            &modlist,
            ManifestFormat::ModList {
                mods_dir: fixture.temp.path().join("mods"),
            },
        ),
    )
    .run(CancellationToken::new())
    .unwrap();

    assert_eq!(fixture.output_texture("sky.dds"), b"high");
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_rerun_is_idempotent() {
    let fixture = standard_fixture();

    merger(fixture.config(&["A", "B"], 4))
        .run(CancellationToken::new())
        .unwrap();
    let first = fixture.output_tree();

    merger(fixture.config(&["A", "B"], 4))
        .run(CancellationToken::new())
        .unwrap();
    let second = fixture.output_tree();

    assert_eq!(first, second);
}

#[test]
fn test_single_and_multi_worker_outputs_match() {
    let fixture = standard_fixture();

    let serial_out = fixture.temp.path().join("serial");
    let parallel_out = fixture.temp.path().join("parallel");

    merger(fixture.config(&["A", "B"], 1))
        .run(CancellationToken::new())
        .unwrap();
    fs::rename(fixture.out(), &serial_out).unwrap();

    merger(fixture.config(&["A", "B"], 8))
        .run(CancellationToken::new())
        .unwrap();
    fs::rename(fixture.out(), &parallel_out).unwrap();

    let serial = snapshot_tree(&serial_out);
    assert_eq!(serial.len(), 103);
    assert_eq!(serial, snapshot_tree(&parallel_out));
}

// ============================================================================
// Progress and summary
// ============================================================================

#[test]
fn test_end_to_end_counts() {
    let fixture = standard_fixture();
    let sink = Arc::new(RecordingSink::default());

    let summary = OverlayMerger::new(fixture.config(&["A", "B"], 4))
        .unwrap()
        .with_progress_sink(Arc::clone(&sink) as Arc<dyn ProgressSink>)
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(summary.total_planned, 118);
    assert_eq!(summary.attempted(), 118);
    assert_eq!(summary.distinct_files, 103);
    assert!(!summary.cancelled);

    let tier_records: Vec<_> = summary.tiers.iter().map(|t| t.stats.records).collect();
    assert_eq!(tier_records, vec![100, 10, 8]);

    let snapshots = sink.snapshots.lock();
    let finals: Vec<_> = snapshots.iter().filter(|s| s.is_final).collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].completed, 118);
    assert_eq!(finals[0].total, 118);
    assert!(snapshots.iter().all(|s| s.completed <= s.total));

    let tree = fixture.output_tree();
    assert_eq!(count_content(&tree, b"base"), 90);
    assert_eq!(count_content(&tree, b"A"), 5);
    assert_eq!(count_content(&tree, b"B"), 8);
    assert_eq!(fixture.output_texture("landscape/f003.dds"), b"B");
    assert_eq!(fixture.output_texture("landscape/f007.dds"), b"A");
    assert_eq!(fixture.output_texture("new/n2.dds"), b"B");
}

#[test]
fn test_plan_matches_run() {
    let fixture = standard_fixture();
    let merger = merger(fixture.config(&["A", "B"], 2));

    let plan = merger.plan().unwrap();
    assert_eq!(plan.total(), 118);
    assert!(!fixture.out().exists());

    let summary = merger.run(CancellationToken::new()).unwrap();
    assert_eq!(summary.attempted() as u64, plan.total());
}

#[test]
fn test_files_without_asset_dir_use_base_name() {
    let fixture = Fixture::new();
    fixture.base_texture("armor/iron.dds", b"base");
    write(&fixture.mod_root("Loose").join("flat/one.dds"), b"1");
    write(&fixture.mod_root("Loose").join("deep/er/two.png"), b"2");

    let summary = merger(fixture.config(&["Loose"], 2))
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(summary.totals.fallbacks, 2);
    assert_eq!(fixture.output_texture("one.dds"), b"1");
    assert_eq!(fixture.output_texture("two.png"), b"2");
}

#[test]
fn test_missing_mod_directory_is_not_fatal() {
    let fixture = Fixture::new();
    fixture.base_texture("sky.dds", b"base");
    fixture.mod_texture("Present", "sky.dds", b"present");

    let summary = merger(fixture.config(&["Absent", "Present"], 2))
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(summary.tiers.len(), 3);
    assert_eq!(summary.tiers[1].stats.records, 0);
    assert_eq!(fixture.output_texture("sky.dds"), b"present");
}

#[test]
fn test_empty_directories_are_pruned() {
    let fixture = Fixture::new();
    fixture.base_texture("sky.dds", b"base");
    fs::create_dir_all(fixture.out().join("textures/stale/empty")).unwrap();

    let summary = merger(fixture.config(&[], 2))
        .run(CancellationToken::new())
        .unwrap();

    assert_eq!(summary.pruned_dirs, 2);
    assert!(!fixture.out().join("textures/stale").exists());
}

// ============================================================================
// Fatal errors and cancellation
// ============================================================================

#[test]
fn test_missing_manifest_aborts_before_copying() {
    let fixture = Fixture::new();
    fixture.base_texture("sky.dds", b"base");

    let config = MergeConfig::new(fixture.base(), fixture.out())
        .with_manifest(fixture.temp.path().join("absent.json"), ManifestFormat::Json);

    let err = merger(config).run(CancellationToken::new()).unwrap_err();
    assert!(matches!(err, MergeError::Manifest(_)));
    assert!(err.to_string().contains("absent.json"));
    assert!(!fixture.out().exists());
}

#[test]
fn test_zero_threads_is_fatal() {
    let fixture = Fixture::new();
    let result = OverlayMerger::new(MergeConfig::new(fixture.base(), fixture.out()).with_threads(0));
    assert!(matches!(result, Err(MergeError::InvalidThreadCount(0))));
}

#[test]
fn test_output_equal_to_base_leaves_base_untouched() {
    let fixture = Fixture::new();
    fixture.base_texture("rock.dds", b"ORIGINAL-BASE-BYTES");

    let err = merger(MergeConfig::new(fixture.base(), fixture.base()))
        .run(CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, MergeError::InvalidConfig(_)));
    assert_eq!(
        fs::read(fixture.base().join("textures/rock.dds")).unwrap(),
        b"ORIGINAL-BASE-BYTES"
    );
}

#[test]
fn test_output_mod_listed_in_manifest_is_rejected_on_every_run() {
    let fixture = Fixture::new();
    fixture.base_texture("rock.dds", b"base");
    fixture.mod_texture("Merged", "rock.dds", b"previous");

    let config = MergeConfig::new(fixture.base(), fixture.mod_root("Merged"))
        .with_manifest(fixture.manifest(&["Merged"]), ManifestFormat::Json);

    for _ in 0..2 {
        let err = merger(config.clone())
            .run(CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidConfig(_)));
        assert_eq!(
            fs::read(fixture.mod_root("Merged").join("textures/rock.dds")).unwrap(),
            b"previous"
        );
    }
}

#[test]
fn test_cancellation_stops_tier_advancement() {
    let fixture = standard_fixture();
    let token = CancellationToken::new();
    let trigger = token.clone();

    let summary = merger(fixture.config(&["A", "B"], 4))
        .with_state_callback(Box::new(move |state| {
            if state == (MergeState::Copying { tier: 1 }) {
                trigger.cancel();
            }
        }))
        .run(token)
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.attempted(), 100);
    assert_eq!(summary.totals.cancelled, 18);
    assert_eq!(summary.pruned_dirs, 0);

    let tree = fixture.output_tree();
    assert_eq!(tree.len(), 100);
    assert!(tree.values().all(|v| v.as_slice() == b"base"));
}
