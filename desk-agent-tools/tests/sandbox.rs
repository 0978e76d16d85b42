#[cfg(test)]
mod sandbox_tests {
    use desk_agent_tools::os_capabilities::{archive, filesystem, hashing, search, security};
    use desk_agent_tools::{OsError, PathGuard};
    use tempfile::TempDir;

    fn default_guard() -> PathGuard {
        PathGuard::new(desk_agent_core::AgentConfig::default().security.forbidden_paths)
    }

    #[tokio::test]
    async fn test_read_under_proc_denied() {
        let result = filesystem::read_file(&default_guard(), "/proc/self/status", 1024).await;
        assert!(matches!(result, Err(OsError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_traversal_into_sys_denied() {
        let result = filesystem::list_directory(&default_guard(), "/tmp/../sys/kernel").await;
        assert!(matches!(result, Err(OsError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_copy_destination_is_guarded() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, "x").unwrap();
        let result = filesystem::copy_file(&default_guard(), &src, "/proc/a.txt").await;
        assert!(matches!(result, Err(OsError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_search_root_is_guarded() {
        let result = search::search_files(&default_guard(), "/sys", None, 10).await;
        assert!(matches!(result, Err(OsError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_hash_and_archive_are_guarded() {
        let guard = default_guard();
        assert!(matches!(
            hashing::hash_file(&guard, "/proc/cpuinfo", hashing::HashAlgorithm::Sha256).await,
            Err(OsError::PermissionDenied(_))
        ));
        assert!(matches!(
            archive::extract(&guard, "/tmp/x.zip", "/proc/out").await,
            Err(OsError::PermissionDenied(_))
        ));
        assert!(matches!(
            security::secure_delete(&guard, "/sys/power/state").await,
            Err(OsError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_prefix_with_backslashes() {
        let dir = TempDir::new().unwrap();
        let private = dir.path().join("Private");
        std::fs::create_dir(&private).unwrap();
        std::fs::write(private.join("diary.txt"), "dear diary").unwrap();

        let prefix = private.to_string_lossy().replace('/', "\\").to_uppercase();
        let guard = PathGuard::new([prefix]);
        let result = filesystem::read_file(&guard, private.join("diary.txt"), 1024).await;
        assert!(matches!(result, Err(OsError::PermissionDenied(_))));
    }
}
