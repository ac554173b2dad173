// src/merge/mod.rs

//! Package merge engine
//!
//! `PackageMerger` folds independently-authored packages into one
//! accumulated model, in insertion order. Scalar metadata is last-writer-
//! wins; authors, owners, and tags union with duplicates removed; dependency
//! sets combine by target framework; framework references and files that
//! cannot be reconciled become recorded conflicts instead of aborting the
//! merge. The caller inspects `conflicts()` and decides whether to proceed
//! with `save`; the merger itself never refuses to continue.

use crate::archive;
use crate::error::{Error, Result};
use crate::package::PackageModel;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A recorded inability to reconcile two packages' data for one key
///
/// Conflicts are data, not errors: the existing value always wins and the
/// incoming value is discarded, with the collision logged here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeConflict {
    /// An assembly reference exists with a different supported-framework set
    AssemblyReference { assembly_name: String },
    /// A file path is already taken
    File { path: String },
    /// The accumulator holds more than one dependency set for one framework
    DuplicateDependencySet { target_framework: Option<String> },
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeConflict::AssemblyReference { assembly_name } => write!(
                f,
                "assembly reference '{}' has mismatched supported frameworks; the existing \
                 reference was kept",
                assembly_name
            ),
            MergeConflict::File { path } => write!(
                f,
                "file '{}' is present in both packages; the existing file was kept",
                path
            ),
            MergeConflict::DuplicateDependencySet { target_framework } => write!(
                f,
                "more than one dependency set targets '{}'; dependencies were folded into the \
                 first",
                target_framework.as_deref().unwrap_or("any framework")
            ),
        }
    }
}

/// Ordered table of scalar copies applied on every merge: last writer wins,
/// including absent values overwriting present ones
type ScalarCopy = fn(&mut PackageModel, &PackageModel);

const SCALAR_COPIES: &[ScalarCopy] = &[
    |dst, src| dst.copyright = src.copyright.clone(),
    |dst, src| dst.description = src.description.clone(),
    |dst, src| dst.icon_url = src.icon_url.clone(),
    |dst, src| dst.id = src.id.clone(),
    |dst, src| dst.language = src.language.clone(),
    |dst, src| dst.license_url = src.license_url.clone(),
    |dst, src| dst.project_url = src.project_url.clone(),
    |dst, src| dst.release_notes = src.release_notes.clone(),
    |dst, src| dst.require_license_acceptance = src.require_license_acceptance,
    |dst, src| dst.summary = src.summary.clone(),
    |dst, src| dst.title = src.title.clone(),
    |dst, src| dst.version = src.version.clone(),
];

/// Accumulates packages into one merged model, collecting conflicts
#[derive(Debug)]
pub struct PackageMerger {
    package: PackageModel,
    conflicts: Vec<MergeConflict>,
}

impl Default for PackageMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageMerger {
    /// Start with an empty accumulator and no conflicts
    pub fn new() -> Self {
        Self {
            package: PackageModel {
                listed: true,
                ..PackageModel::default()
            },
            conflicts: Vec::new(),
        }
    }

    /// The accumulated package
    pub fn package(&self) -> &PackageModel {
        &self.package
    }

    /// Mutable access for seeding the accumulator before the first merge
    pub fn package_mut(&mut self) -> &mut PackageModel {
        &mut self.package
    }

    /// Every conflict recorded so far, in the order it was produced
    ///
    /// The log is never cleared automatically.
    pub fn conflicts(&self) -> &[MergeConflict] {
        &self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Fold `package` into the accumulated state
    ///
    /// A structurally invalid input (empty id) is an invalid argument;
    /// everything else merges, with irreconcilable pieces recorded as
    /// conflicts rather than raised.
    pub fn merge_in(&mut self, package: &PackageModel) -> Result<()> {
        if package.id.trim().is_empty() {
            return Err(Error::empty_argument("package"));
        }

        self.merge_metadata(package);
        self.merge_framework_references(package);
        self.merge_dependency_sets(package);
        self.merge_files(package);

        debug!(
            "merged in '{}', {} conflict(s) so far",
            package.id,
            self.conflicts.len()
        );
        Ok(())
    }

    /// Serialize the accumulated state to a package directory
    ///
    /// Saving is permitted regardless of conflicts; whether to proceed on a
    /// conflicted merge is the caller's call. No merge logic runs here.
    pub fn save(&self, destination: &Path) -> Result<()> {
        archive::write_package(destination, &self.package)
    }

    fn merge_metadata(&mut self, package: &PackageModel) {
        for copy in SCALAR_COPIES {
            copy(&mut self.package, package);
        }

        extend_deduped(&mut self.package.authors, &package.authors);
        extend_deduped(&mut self.package.owners, &package.owners);
        extend_deduped(&mut self.package.tags, &package.tags);
    }

    fn merge_framework_references(&mut self, package: &PackageModel) {
        for incoming in &package.framework_references {
            match self
                .package
                .framework_references
                .iter()
                .find(|existing| existing.name_matches(&incoming.assembly_name))
            {
                Some(existing) => {
                    if existing.supported_frameworks != incoming.supported_frameworks {
                        self.conflicts.push(MergeConflict::AssemblyReference {
                            assembly_name: incoming.assembly_name.clone(),
                        });
                    }
                }
                None => self.package.framework_references.push(incoming.clone()),
            }
        }
    }

    fn merge_dependency_sets(&mut self, package: &PackageModel) {
        for incoming in &package.dependency_sets {
            let matching: Vec<usize> = self
                .package
                .dependency_sets
                .iter()
                .enumerate()
                .filter(|(_, set)| set.target_framework == incoming.target_framework)
                .map(|(index, _)| index)
                .collect();

            match matching.first() {
                Some(&first) => {
                    if matching.len() > 1 {
                        self.conflicts.push(MergeConflict::DuplicateDependencySet {
                            target_framework: incoming
                                .target_framework
                                .as_ref()
                                .map(|f| f.to_string()),
                        });
                    }
                    // Append without de-duplication: duplicate dependency
                    // ids within one set are preserved as authored
                    self.package.dependency_sets[first]
                        .dependencies
                        .extend(incoming.dependencies.iter().cloned());
                }
                None => self.package.dependency_sets.push(incoming.clone()),
            }
        }
    }

    fn merge_files(&mut self, package: &PackageModel) {
        for incoming in &package.files {
            if self
                .package
                .files
                .iter()
                .any(|existing| existing.path_matches(&incoming.path))
            {
                self.conflicts.push(MergeConflict::File {
                    path: incoming.path.clone(),
                });
            } else {
                self.package.files.push(incoming.clone());
            }
        }
    }
}

fn extend_deduped(target: &mut Vec<String>, incoming: &[String]) {
    for value in incoming {
        if !target.iter().any(|existing| existing == value) {
            target.push(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{
        DependencySet, FrameworkAssemblyReference, FrameworkName, PackageDependency, PackageFile,
    };
    use crate::version::parse_version;

    fn fx(name: &str) -> FrameworkName {
        FrameworkName::new(name).unwrap()
    }

    /// Accumulator pre-seeded with "Old" metadata, one framework reference,
    /// and one dependency set targeting NetFx1
    fn base_merger() -> PackageMerger {
        let mut merger = PackageMerger::new();
        let package = merger.package_mut();
        package.id = "OldId".to_string();
        package.version = Some(parse_version("1.0.0-old").unwrap());
        package.copyright = Some("OldCopyright".to_string());
        package.description = Some("OldDescription".to_string());
        package.icon_url = Some("http://OldIconUrl".to_string());
        package.language = Some("OldLanguage".to_string());
        package.license_url = Some("http://OldLicenseUrl".to_string());
        package.project_url = Some("http://OldProjectUrl".to_string());
        package.release_notes = Some("OldReleaseNotes".to_string());
        package.require_license_acceptance = false;
        package.summary = Some("OldSummary".to_string());
        package.title = Some("OldTitle".to_string());
        package.tags = vec!["OldTag".to_string()];
        package.authors = vec!["OldAuthor".to_string()];
        package.owners = vec!["OldOwner".to_string()];
        package
            .framework_references
            .push(FrameworkAssemblyReference::new("OldReference").unwrap());
        package.dependency_sets.push(DependencySet::with_dependencies(
            Some(fx("NetFx1")),
            vec![PackageDependency::new("Foo").unwrap()],
        ));
        merger
    }

    /// Incoming package carrying "New" metadata and a NetFx2 dependency set
    fn new_package() -> PackageModel {
        let mut package = PackageModel::new("NewId", parse_version("2.0.0-new").unwrap());
        package.copyright = Some("NewCopyright".to_string());
        package.description = Some("NewDescription".to_string());
        package.icon_url = Some("http://NewIconUrl".to_string());
        package.language = Some("NewLanguage".to_string());
        package.license_url = Some("http://NewLicenseUrl".to_string());
        package.project_url = Some("http://NewProjectUrl".to_string());
        package.release_notes = Some("NewReleaseNotes".to_string());
        package.require_license_acceptance = true;
        package.summary = Some("NewSummary".to_string());
        package.title = Some("NewTitle".to_string());
        package.tags = vec!["NewTag".to_string()];
        package.authors = vec!["NewAuthor".to_string()];
        package.owners = vec!["NewOwner".to_string()];
        package
            .framework_references
            .push(FrameworkAssemblyReference::new("NewReference").unwrap());
        package.dependency_sets.push(DependencySet::with_dependencies(
            Some(fx("NetFx2")),
            vec![PackageDependency::new("Bar").unwrap()],
        ));
        package
    }

    #[test]
    fn test_new_merger_has_no_conflicts() {
        let merger = PackageMerger::new();
        assert!(merger.conflicts().is_empty());
    }

    #[test]
    fn test_merge_rejects_structurally_invalid_package() {
        let mut merger = PackageMerger::new();
        let empty = PackageModel::default();
        assert!(matches!(
            merger.merge_in(&empty),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_scalars_are_last_writer_wins() {
        let mut merger = base_merger();
        merger.merge_in(&new_package()).unwrap();

        let merged = merger.package();
        assert_eq!(merged.copyright.as_deref(), Some("NewCopyright"));
        assert_eq!(merged.description.as_deref(), Some("NewDescription"));
        assert_eq!(merged.icon_url.as_deref(), Some("http://NewIconUrl"));
        assert_eq!(merged.id, "NewId");
        assert_eq!(merged.language.as_deref(), Some("NewLanguage"));
        assert_eq!(merged.license_url.as_deref(), Some("http://NewLicenseUrl"));
        assert_eq!(merged.project_url.as_deref(), Some("http://NewProjectUrl"));
        assert_eq!(merged.release_notes.as_deref(), Some("NewReleaseNotes"));
        assert!(merged.require_license_acceptance);
        assert_eq!(merged.summary.as_deref(), Some("NewSummary"));
        assert_eq!(merged.title.as_deref(), Some("NewTitle"));
        assert_eq!(merged.version, Some(parse_version("2.0.0-new").unwrap()));
        assert!(merger.conflicts().is_empty());
    }

    #[test]
    fn test_absent_scalar_overwrites_present_value() {
        let mut merger = base_merger();
        let mut incoming = new_package();
        incoming.copyright = None;

        merger.merge_in(&incoming).unwrap();
        assert_eq!(merger.package().copyright, None);
    }

    #[test]
    fn test_multi_valued_metadata_unions() {
        let mut merger = base_merger();
        merger.merge_in(&new_package()).unwrap();

        let merged = merger.package();
        assert!(merged.tags.contains(&"OldTag".to_string()));
        assert!(merged.tags.contains(&"NewTag".to_string()));
        assert!(merged.authors.contains(&"OldAuthor".to_string()));
        assert!(merged.authors.contains(&"NewAuthor".to_string()));
        assert!(merged.owners.contains(&"OldOwner".to_string()));
        assert!(merged.owners.contains(&"NewOwner".to_string()));
    }

    #[test]
    fn test_union_removes_duplicates() {
        let mut merger = base_merger();
        let mut incoming = new_package();
        incoming.tags = vec!["OldTag".to_string()];
        incoming.authors = vec!["OldAuthor".to_string()];
        incoming.owners = vec!["OldOwner".to_string()];

        merger.merge_in(&incoming).unwrap();

        let merged = merger.package();
        assert_eq!(merged.tags.iter().filter(|t| *t == "OldTag").count(), 1);
        assert_eq!(
            merged.authors.iter().filter(|a| *a == "OldAuthor").count(),
            1
        );
        assert_eq!(merged.owners.iter().filter(|o| *o == "OldOwner").count(), 1);
    }

    #[test]
    fn test_framework_references_combine() {
        let mut merger = base_merger();
        merger.merge_in(&new_package()).unwrap();

        let merged = merger.package();
        assert_eq!(
            merged
                .framework_references
                .iter()
                .filter(|r| r.assembly_name == "OldReference")
                .count(),
            1
        );
        assert_eq!(
            merged
                .framework_references
                .iter()
                .filter(|r| r.assembly_name == "NewReference")
                .count(),
            1
        );
    }

    #[test]
    fn test_mismatched_framework_reference_is_conflict() {
        let mut merger = PackageMerger::new();
        merger.package_mut().id = "Base".to_string();
        merger.package_mut().framework_references.push(
            FrameworkAssemblyReference::with_frameworks("Reference", vec![fx("NetFx1")]).unwrap(),
        );

        let mut incoming = PackageModel::new("Incoming", parse_version("1.0.0").unwrap());
        incoming.framework_references.push(
            FrameworkAssemblyReference::with_frameworks("Reference", vec![fx("NetFx2")]).unwrap(),
        );

        merger.merge_in(&incoming).unwrap();

        // The existing reference is untouched, no second entry appears
        let references: Vec<_> = merger
            .package()
            .framework_references
            .iter()
            .filter(|r| r.assembly_name == "Reference")
            .collect();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].supported_frameworks, vec![fx("NetFx1")]);

        assert_eq!(merger.conflicts().len(), 1);
        assert_eq!(
            merger.conflicts()[0],
            MergeConflict::AssemblyReference {
                assembly_name: "Reference".to_string()
            }
        );
    }

    #[test]
    fn test_dependency_sets_combine_by_framework() {
        let mut merger = base_merger();
        merger.merge_in(&new_package()).unwrap();

        let merged = merger.package();
        assert_eq!(merged.dependency_sets.len(), 2);

        let netfx1 = merged
            .dependency_sets
            .iter()
            .find(|s| s.target_framework == Some(fx("NetFx1")))
            .unwrap();
        assert_eq!(netfx1.dependencies.len(), 1);
        assert_eq!(netfx1.dependencies[0].id, "Foo");

        let netfx2 = merged
            .dependency_sets
            .iter()
            .find(|s| s.target_framework == Some(fx("NetFx2")))
            .unwrap();
        assert_eq!(netfx2.dependencies.len(), 1);
        assert_eq!(netfx2.dependencies[0].id, "Bar");
    }

    #[test]
    fn test_same_framework_sets_fold_into_one() {
        let mut merger = base_merger();
        let mut incoming = new_package();
        incoming.dependency_sets = vec![DependencySet::with_dependencies(
            Some(fx("NetFx1")),
            vec![
                PackageDependency::new("Foo").unwrap(),
                PackageDependency::new("Quuz").unwrap(),
            ],
        )];

        merger.merge_in(&incoming).unwrap();

        let merged = merger.package();
        assert_eq!(merged.dependency_sets.len(), 1);
        let set = &merged.dependency_sets[0];
        assert_eq!(set.target_framework, Some(fx("NetFx1")));
        // "Foo" appears twice: duplicates across inputs are preserved
        assert_eq!(set.dependencies.len(), 3);
        assert_eq!(
            set.dependencies.iter().filter(|d| d.id == "Foo").count(),
            2
        );
        assert_eq!(
            set.dependencies.iter().filter(|d| d.id == "Quuz").count(),
            1
        );
    }

    #[test]
    fn test_duplicate_file_path_is_conflict_existing_wins() {
        let mut merger = PackageMerger::new();
        merger.package_mut().id = "Base".to_string();
        merger
            .package_mut()
            .files
            .push(PackageFile::new("content/readme.txt", b"original".to_vec()).unwrap());

        let mut incoming = PackageModel::new("Incoming", parse_version("1.0.0").unwrap());
        incoming
            .files
            .push(PackageFile::new("Content/README.txt", b"replacement".to_vec()).unwrap());
        incoming
            .files
            .push(PackageFile::new("lib/new.dll", b"new".to_vec()).unwrap());

        merger.merge_in(&incoming).unwrap();

        let merged = merger.package();
        assert_eq!(merged.files.len(), 2);
        let kept = merged
            .files
            .iter()
            .find(|f| f.path_matches("content/readme.txt"))
            .unwrap();
        assert_eq!(kept.content, b"original");

        assert_eq!(
            merger.conflicts(),
            &[MergeConflict::File {
                path: "Content/README.txt".to_string()
            }]
        );
    }

    #[test]
    fn test_conflicts_accumulate_across_merges_in_order() {
        let mut merger = PackageMerger::new();
        merger.package_mut().id = "Base".to_string();
        merger
            .package_mut()
            .files
            .push(PackageFile::new("a.txt", b"a".to_vec()).unwrap());

        let mut first = PackageModel::new("First", parse_version("1.0.0").unwrap());
        first
            .files
            .push(PackageFile::new("a.txt", b"x".to_vec()).unwrap());

        let mut second = PackageModel::new("Second", parse_version("1.0.0").unwrap());
        second
            .files
            .push(PackageFile::new("a.txt", b"y".to_vec()).unwrap());

        merger.merge_in(&first).unwrap();
        merger.merge_in(&second).unwrap();

        assert_eq!(merger.conflicts().len(), 2);
        assert!(merger.has_conflicts());
    }

    #[test]
    fn test_save_writes_merged_package_even_with_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let mut merger = base_merger();

        let mut incoming = new_package();
        incoming
            .files
            .push(PackageFile::new("lib/new.dll", b"new".to_vec()).unwrap());
        merger.merge_in(&incoming).unwrap();

        // Force a conflict, then save anyway
        merger.merge_in(&incoming).unwrap();
        assert!(merger.has_conflicts());

        merger.save(dir.path()).unwrap();
        let loaded = crate::archive::load_package(dir.path()).unwrap();
        assert_eq!(loaded.id, "NewId");
        assert_eq!(loaded.files.len(), 1);
    }

    #[test]
    fn test_save_preserves_duplicate_dependency_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut merger = base_merger();
        let mut incoming = new_package();
        incoming.dependency_sets = vec![DependencySet::with_dependencies(
            Some(fx("NetFx1")),
            vec![PackageDependency::new("Foo").unwrap()],
        )];
        merger.merge_in(&incoming).unwrap();

        merger.save(dir.path()).unwrap();
        let loaded = crate::archive::load_package(dir.path()).unwrap();
        assert_eq!(loaded.dependency_sets[0].dependencies.len(), 2);
    }
}
