use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".ea-mentor"))
            .unwrap_or_else(|| PathBuf::from(".ea-mentor"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    /// Default location of the local passage corpus (JSON lines).
    pub fn corpus_file(&self) -> PathBuf {
        self.data_dir().join("passages.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_layout() {
        let paths = Paths::with_base(PathBuf::from("/tmp/mentor"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/mentor/config.json"));
        assert_eq!(paths.corpus_file(), PathBuf::from("/tmp/mentor/data/passages.jsonl"));
    }
}
