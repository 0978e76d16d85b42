#[cfg(test)]
mod scan_tests {
    use desk_agent_tools::os_capabilities::hashing::{self, HashAlgorithm};
    use desk_agent_tools::os_capabilities::search;
    use desk_agent_tools::PathGuard;
    use std::path::Path;
    use tempfile::TempDir;

    fn guard() -> PathGuard {
        PathGuard::new(["/proc", "/sys"])
    }

    fn populate(root: &Path) {
        std::fs::create_dir_all(root.join("notes/deep")).unwrap();
        std::fs::write(root.join("notes/todo.txt"), "buy milk\nCall Bob\n").unwrap();
        std::fs::write(root.join("notes/deep/plan.md"), "# plan\ncall the bank\n").unwrap();
        std::fs::write(root.join("notes/data.bin"), "call me maybe").unwrap();
        std::fs::write(root.join("notes/Makefile"), "call:\n\techo call\n").unwrap();
        std::fs::write(root.join("copy_a.txt"), "same content").unwrap();
        std::fs::write(root.join("notes/copy_b.txt"), "same content").unwrap();
    }

    #[tokio::test]
    async fn test_search_by_extension_is_recursive() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let found = search::search_files(&guard(), dir.path(), Some(".md"), 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "plan.md");
    }

    #[tokio::test]
    async fn test_search_by_glob_and_limit() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let found = search::search_files(&guard(), dir.path(), Some("copy_*"), 100).await.unwrap();
        assert_eq!(found.len(), 2);

        let limited = search::search_files(&guard(), dir.path(), None, 3).await.unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[tokio::test]
    async fn test_search_in_files_default_extensions() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let matches = search::search_in_files(&guard(), dir.path(), "CALL", &[], 100)
            .await
            .unwrap();
        let mut files: Vec<String> = matches
            .iter()
            .map(|m| m.file.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        files.sort();
        files.dedup();
        // .bin is not a default extension; files without one are searched.
        assert_eq!(files, vec!["Makefile", "plan.md", "todo.txt"]);
        let todo = matches
            .iter()
            .find(|m| m.file.ends_with("todo.txt"))
            .unwrap();
        assert_eq!(todo.line_number, 2);
        assert_eq!(todo.line, "Call Bob");
    }

    #[tokio::test]
    async fn test_find_duplicates_groups_identical_content() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let report = search::find_duplicates(&guard(), dir.path()).await.unwrap();
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].files.len(), 2);
        assert_eq!(report.duplicate_files, 1);
        assert_eq!(report.wasted_bytes, "same content".len() as u64);
    }

    #[tokio::test]
    async fn test_large_old_and_analysis() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        std::fs::write(dir.path().join("big.iso"), vec![0u8; 2 * 1024 * 1024]).unwrap();

        let large = search::find_large_files(&guard(), dir.path(), 1, 100).await.unwrap();
        assert_eq!(large.count, 1);
        assert!(large.files[0].path.ends_with("big.iso"));

        let old = search::find_old_files(&guard(), dir.path(), 365).await.unwrap();
        assert!(old.is_empty());

        let analysis = search::analyze_folder(&guard(), dir.path()).await.unwrap();
        assert_eq!(analysis.total_files, 7);
        assert_eq!(analysis.file_types.get(".txt"), Some(&3));
        assert_eq!(analysis.file_types.get("no_extension"), Some(&1));
        assert!(analysis.largest_files[0].path.ends_with("big.iso"));
    }

    #[tokio::test]
    async fn test_identical_files_hash_equal() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let a = hashing::hash_file(&guard(), dir.path().join("copy_a.txt"), HashAlgorithm::Md5)
            .await
            .unwrap();
        let b = hashing::hash_file(&guard(), dir.path().join("notes/copy_b.txt"), HashAlgorithm::Md5)
            .await
            .unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 32);

        let sha = hashing::hash_file(&guard(), dir.path().join("copy_a.txt"), HashAlgorithm::default())
            .await
            .unwrap();
        assert_eq!(sha.hash.len(), 64);
    }

    #[tokio::test]
    async fn test_scan_for_index() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let candidates = search::scan_for_index(&guard(), dir.path()).await.unwrap();
        assert_eq!(candidates.len(), 6);
        let plan = candidates.iter().find(|c| c.filename == "plan.md").unwrap();
        assert_eq!(plan.extension, ".md");
        assert_eq!(plan.tags, ".md plan.md");
        assert_eq!(plan.hash.len(), 32);
    }

    #[tokio::test]
    async fn test_zero_limit_returns_nothing() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let found = search::search_files(&guard(), dir.path(), None, 0).await.unwrap();
        assert!(found.is_empty());
        let matches = search::search_in_files(&guard(), dir.path(), "call", &[], 0)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_walks_skip_forbidden_subfolders() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let secret = dir.path().join("notes/deep");
        let fenced = PathGuard::new(["/proc".to_string(), secret.to_string_lossy().to_string()]);

        let found = search::search_files(&fenced, dir.path(), Some(".md"), 100).await.unwrap();
        assert!(found.is_empty());

        let matches = search::search_in_files(&fenced, dir.path(), "bank", &[], 100)
            .await
            .unwrap();
        assert!(matches.is_empty());

        let analysis = search::analyze_folder(&fenced, dir.path()).await.unwrap();
        let unguarded = search::analyze_folder(&guard(), dir.path()).await.unwrap();
        assert_eq!(analysis.total_files + 1, unguarded.total_files);

        let candidates = search::scan_for_index(&fenced, dir.path()).await.unwrap();
        let secret = secret.to_string_lossy();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| !c.filepath.starts_with(secret.as_ref())));
    }
}
