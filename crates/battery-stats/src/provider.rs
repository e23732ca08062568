use std::fs;
use std::io;
use std::path::Path;

pub trait FsProvider: Clone + Send + Sync + 'static {
    fn exists(&self, p: &Path) -> bool;
    fn read_to_string(&self, p: &Path) -> io::Result<String>;
    fn write_str(&self, p: &Path, data: &str) -> io::Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RealFs;

impl FsProvider for RealFs {
    fn exists(&self, p: &Path) -> bool {
        p.exists()
    }

    fn read_to_string(&self, p: &Path) -> io::Result<String> {
        fs::read_to_string(p)
    }

    fn write_str(&self, p: &Path, data: &str) -> io::Result<()> {
        // Stats files are replaced wholesale; create if missing.
        fs::write(p, data.as_bytes())
    }
}
