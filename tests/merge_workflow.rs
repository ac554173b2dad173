// tests/merge_workflow.rs

//! Merging two authored packages, saving the result, and consuming it
//! through a repository.

mod common;

use common::{build_package, v};
use wharf::{
    archive, FrameworkAssemblyReference, FrameworkName, MergeConflict, MemoryRepository,
    PackageFile, PackageMerger, Repository,
};

fn fx(name: &str) -> FrameworkName {
    FrameworkName::new(name).unwrap()
}

#[test]
fn test_merge_two_packages_and_save() {
    let out = tempfile::tempdir().unwrap();

    let mut base = build_package("Base", "1.0.0", &["Dep"]);
    base.copyright = Some("BaseCopyright".to_string());
    base.set_tags("base shared");

    let mut extension = build_package("Extension", "2.0.0", &[]);
    extension.copyright = Some("ExtensionCopyright".to_string());
    extension.set_tags("extension shared");
    extension.files = vec![PackageFile::new("tools/extra.txt", b"extra".to_vec()).unwrap()];

    let mut merger = PackageMerger::new();
    merger.merge_in(&base).unwrap();
    merger.merge_in(&extension).unwrap();
    assert!(!merger.has_conflicts());

    merger.save(out.path()).unwrap();
    let merged = archive::load_package(out.path()).unwrap();

    // Last package in wins the scalars, collections union
    assert_eq!(merged.id, "Extension");
    assert_eq!(merged.version, Some(v("2.0.0")));
    assert_eq!(merged.copyright.as_deref(), Some("ExtensionCopyright"));
    assert_eq!(merged.tags, ["base", "shared", "extension"]);
    assert_eq!(merged.files.len(), 3);
    assert_eq!(merged.dependency_sets.len(), 1);
}

#[test]
fn test_merged_package_is_consumable_by_repositories() {
    let out = tempfile::tempdir().unwrap();

    let mut merger = PackageMerger::new();
    merger.merge_in(&build_package("Merged", "1.0.0", &[])).unwrap();
    merger.save(out.path()).unwrap();

    let mut loaded = archive::load_package(out.path()).unwrap();
    loaded.seal();

    let mut repo = MemoryRepository::new();
    repo.add_package(loaded).unwrap();
    assert!(repo.exists("merged", Some(&v("1.0.0"))).unwrap());
}

#[test]
fn test_conflicts_are_advisory_not_fatal() {
    let out = tempfile::tempdir().unwrap();

    let mut first = build_package("First", "1.0.0", &[]);
    first.framework_references =
        vec![FrameworkAssemblyReference::with_frameworks("System.Web", vec![fx("net40")]).unwrap()];

    let mut second = build_package("Second", "1.0.0", &[]);
    second.framework_references =
        vec![FrameworkAssemblyReference::with_frameworks("System.Web", vec![fx("net45")]).unwrap()];
    // Same payload paths as `first` collide too
    let mut merger = PackageMerger::new();
    merger.merge_in(&first).unwrap();
    merger.merge_in(&second).unwrap();

    // One assembly conflict plus one per duplicated file path
    assert!(merger.has_conflicts());
    assert!(merger.conflicts().iter().any(|c| matches!(
        c,
        MergeConflict::AssemblyReference { assembly_name } if assembly_name == "System.Web"
    )));
    assert!(merger
        .conflicts()
        .iter()
        .any(|c| matches!(c, MergeConflict::File { .. })));

    // Saving proceeds regardless; the caller decides what conflicts mean
    merger.save(out.path()).unwrap();
    assert!(archive::load_package(out.path()).is_ok());
}
