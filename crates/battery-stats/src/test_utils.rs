#[cfg(test)]
pub mod mock_fs {
    #![allow(dead_code)]
    use crate::FsProvider;
    use std::collections::{HashMap, HashSet};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockFsState {
        pub files: HashMap<PathBuf, String>,
        pub no_perm_files: HashSet<PathBuf>,
        // Writes to these paths fail with ENOSPC
        pub nospace_files: HashSet<PathBuf>,
        pub reads: HashMap<PathBuf, usize>,
    }

    #[derive(Clone, Default)]
    pub struct MockFs {
        state: Arc<Mutex<MockFsState>>,
    }

    impl MockFs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_file(&self, p: &Path, content: &str) {
            let mut st = self.state.lock().unwrap();
            st.files.insert(p.to_path_buf(), content.to_string());
        }

        pub fn set_no_perm_file(&self, p: &Path) {
            let mut st = self.state.lock().unwrap();
            st.no_perm_files.insert(p.to_path_buf());
        }

        pub fn set_nospace_file(&self, p: &Path) {
            let mut st = self.state.lock().unwrap();
            st.nospace_files.insert(p.to_path_buf());
        }

        pub fn file_contents(&self, p: &Path) -> Option<String> {
            let st = self.state.lock().unwrap();
            st.files.get(p).cloned()
        }

        /// Number of successful reads of `p` so far.
        pub fn read_count(&self, p: &Path) -> usize {
            let st = self.state.lock().unwrap();
            st.reads.get(p).copied().unwrap_or(0)
        }
    }

    impl FsProvider for MockFs {
        fn exists(&self, p: &Path) -> bool {
            let st = self.state.lock().unwrap();
            st.files.contains_key(p)
        }

        fn read_to_string(&self, p: &Path) -> io::Result<String> {
            let mut st = self.state.lock().unwrap();
            if st.no_perm_files.contains(p) {
                return Err(io::Error::from_raw_os_error(libc::EACCES));
            }
            let content = match st.files.get(p) {
                Some(s) => s.clone(),
                None => return Err(io::Error::from_raw_os_error(libc::ENOENT)),
            };
            *st.reads.entry(p.to_path_buf()).or_default() += 1;
            Ok(content)
        }

        fn write_str(&self, p: &Path, data: &str) -> io::Result<()> {
            let mut st = self.state.lock().unwrap();
            if st.no_perm_files.contains(p) {
                return Err(io::Error::from_raw_os_error(libc::EACCES));
            }
            if st.nospace_files.contains(p) {
                return Err(io::Error::from_raw_os_error(libc::ENOSPC));
            }
            st.files.insert(p.to_path_buf(), data.to_string());
            Ok(())
        }
    }
}
