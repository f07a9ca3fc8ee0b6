//! Embed a directory of `.txt` files into an index.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::embed::Embedder;
use crate::es::{Document, DocumentSink};

/// A file that could not be embedded or indexed.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of [`embed_directory`].
#[derive(Debug, Clone, Default)]
pub struct EmbedReport {
    /// Documents stored in the index.
    pub indexed: usize,
    /// Entries that are not `.txt` files.
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
}

impl EmbedReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

fn is_text_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(".txt"))
}

/// Embed every `.txt` file directly inside `data_path` and store it in `index`.
///
/// Entries are visited in file-name order. Each entry's ordinal in that
/// listing (counting non-text entries too) names the document:
/// `Document {i}`. A file that fails to read, embed or index is recorded in
/// the report and the run continues.
pub fn embed_directory<S>(
    sink: &S,
    embedder: &mut dyn Embedder,
    index: &str,
    data_path: &Path,
) -> Result<EmbedReport>
where
    S: DocumentSink + ?Sized,
{
    if !data_path.is_dir() {
        bail!("data path {} is not a directory", data_path.display());
    }

    tracing::info!(model = embedder.model_name(), "loaded sentence embedding model");
    tracing::info!(dims = embedder.dimension(), "embedding dimensions");

    let entries = WalkDir::new(data_path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to list {}", data_path.display()))?;

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut report = EmbedReport::default();
    for (i, entry) in entries.iter().enumerate() {
        pb.inc(1);
        let path = entry.path();
        if !is_text_file(path) {
            report.skipped += 1;
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        pb.set_message(file_name.to_string());
        tracing::debug!(file = %file_name, "embedding");

        match embed_file(sink, embedder, index, path, i) {
            Ok(id) => {
                tracing::trace!(file = %file_name, id = %id, "indexed");
                report.indexed += 1;
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %format!("{e:#}"), "skipping file");
                report.failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error: format!("{e:#}"),
                });
            }
        }
    }
    pb.finish_and_clear();

    tracing::info!(
        indexed = report.indexed,
        skipped = report.skipped,
        failed = report.failed(),
        "embedding finished"
    );
    Ok(report)
}

fn embed_file<S>(
    sink: &S,
    embedder: &mut dyn Embedder,
    index: &str,
    path: &Path,
    ordinal: usize,
) -> Result<String>
where
    S: DocumentSink + ?Sized,
{
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let sentence_embedding = embedder.embed(&content)?;
    let doc = Document {
        sentence_text: content,
        document_name: format!("Document {ordinal}"),
        sentence_embedding,
    };
    Ok(sink.index_document(index, &doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::es::EsError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemorySink {
        docs: RefCell<Vec<(String, Document)>>,
        reject: Option<&'static str>,
    }

    impl DocumentSink for MemorySink {
        fn index_document(&self, index: &str, doc: &Document) -> Result<String, EsError> {
            if self.reject.is_some_and(|r| doc.sentence_text.contains(r)) {
                return Err(EsError::Status {
                    status: 400,
                    error_type: "mapper_parsing_exception".into(),
                    reason: "rejected".into(),
                });
            }
            let mut docs = self.docs.borrow_mut();
            docs.push((index.to_string(), doc.clone()));
            Ok(format!("id-{}", docs.len()))
        }
    }

    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second file").unwrap();
        fs::write(dir.path().join("a.txt"), "first file").unwrap();
        fs::write(dir.path().join("notes.md"), "not text").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();
        dir
    }

    #[test]
    fn indexes_text_files_in_name_order() {
        let dir = corpus();
        let sink = MemorySink::default();
        let mut embedder = HashEmbedder::new(8).unwrap();

        let report = embed_directory(&sink, &mut embedder, "es0", dir.path()).unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed(), 0);

        let docs = sink.docs.borrow();
        assert_eq!(docs[0].0, "es0");
        assert_eq!(docs[0].1.sentence_text, "first file");
        assert_eq!(docs[0].1.document_name, "Document 0");
        assert_eq!(docs[1].1.sentence_text, "second file");
        assert_eq!(docs[1].1.document_name, "Document 1");
        assert_eq!(docs[0].1.sentence_embedding.len(), 8);
    }

    #[test]
    fn ordinals_count_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "skip").unwrap();
        fs::write(dir.path().join("b.txt"), "keep").unwrap();
        let sink = MemorySink::default();
        let mut embedder = HashEmbedder::new(4).unwrap();

        embed_directory(&sink, &mut embedder, "es0", dir.path()).unwrap();
        assert_eq!(sink.docs.borrow()[0].1.document_name, "Document 1");
    }

    #[test]
    fn bare_txt_name_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".txt"), "hidden text").unwrap();
        fs::write(dir.path().join("notes.text"), "skip").unwrap();
        let sink = MemorySink::default();
        let mut embedder = HashEmbedder::new(4).unwrap();

        let report = embed_directory(&sink, &mut embedder, "es0", dir.path()).unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(sink.docs.borrow()[0].1.sentence_text, "hidden text");
    }

    #[test]
    fn failures_do_not_stop_the_run() {
        let dir = corpus();
        fs::write(dir.path().join("c.txt"), [0xff, 0xfe, 0x00]).unwrap();
        let sink = MemorySink {
            reject: Some("second"),
            ..Default::default()
        };
        let mut embedder = HashEmbedder::new(8).unwrap();

        let report = embed_directory(&sink, &mut embedder, "es0", dir.path()).unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed(), 2);
        assert!(report.failures.iter().any(|f| f.path.ends_with("c.txt")));
        assert!(
            report
                .failures
                .iter()
                .any(|f| f.error.contains("mapper_parsing_exception"))
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::default();
        let mut embedder = HashEmbedder::new(8).unwrap();
        let err = embed_directory(&sink, &mut embedder, "es0", &dir.path().join("missing"))
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        assert!(sink.docs.borrow().is_empty());
    }
}
