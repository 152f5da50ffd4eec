use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::AssistantError;

use super::chunker::{chunk_text, ChunkerConfig};
use super::metadata::metadata_from_filename;
use super::CorpusChunk;

/// Reads corpus files and turns them into metadata-tagged chunks.
pub struct CorpusProcessor {
    config: ChunkerConfig,
}

impl CorpusProcessor {
    pub fn new(config: ChunkerConfig) -> Self {
        tracing::info!(
            "Corpus processor ready (chunk_size={}, chunk_overlap={})",
            config.chunk_size,
            config.chunk_overlap
        );
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Process a single file: read, extract metadata, chunk.
    pub fn process_file(&self, path: &Path) -> Result<Vec<CorpusChunk>, AssistantError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AssistantError::BadRequest(format!("cannot read {}: {}", path.display(), e))
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                AssistantError::BadRequest(format!("invalid file name: {}", path.display()))
            })?;

        let metadata = metadata_from_filename(filename);
        let chunks = chunk_text(&content, &metadata, &self.config);

        tracing::info!(
            "Processed {} into {} chunks ({})",
            filename,
            chunks.len(),
            metadata.content_type
        );
        Ok(chunks)
    }

    /// List the `.txt` files in a directory (non-recursive), in sorted
    /// order so repeated ingests are deterministic.
    pub fn discover_files(&self, dir: &Path) -> Result<Vec<PathBuf>, AssistantError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            AssistantError::BadRequest(format!("cannot read directory {}: {}", dir.display(), e))
        })?;

        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
            })
            .collect();
        files.sort();

        tracing::info!("Found {} text files in {}", files.len(), dir.display());
        Ok(files)
    }

    /// Process every `.txt` file in a directory (non-recursive).
    ///
    /// Unreadable files are logged and skipped.
    pub fn process_directory(&self, dir: &Path) -> Result<Vec<CorpusChunk>, AssistantError> {
        let files = self.discover_files(dir)?;

        let mut all_chunks = Vec::new();
        for path in &files {
            match self.process_file(path) {
                Ok(chunks) => all_chunks.extend(chunks),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!(
            "Processed {} files into {} chunks",
            files.len(),
            all_chunks.len()
        );
        Ok(all_chunks)
    }
}

impl Default for CorpusProcessor {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ContentType;

    #[test]
    fn processes_only_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Essay - One [tech].txt"),
            "First paragraph here.\n\nSecond paragraph here.",
        )
        .unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let processor = CorpusProcessor::default();
        let chunks = processor.process_directory(dir.path()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.content_type, ContentType::Essay);
        assert_eq!(chunks[0].metadata.tags, vec!["tech"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let processor = CorpusProcessor::default();
        let err = processor
            .process_file(Path::new("/nonexistent/file.txt"))
            .unwrap_err();
        assert!(matches!(err, AssistantError::BadRequest(_)));
    }

    #[test]
    fn directory_walk_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "beta text").unwrap();
        fs::write(dir.path().join("a.txt"), "alpha text").unwrap();

        let processor = CorpusProcessor::default();
        let chunks = processor.process_directory(dir.path()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.source_file, "a.txt");
        assert_eq!(chunks[1].metadata.source_file, "b.txt");
    }
}
