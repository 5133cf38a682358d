//! `ragroute add`: store text or a file's paragraphs.

use ragroute_core::{Document, DocumentSource};
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    content: Option<String>,
    file: Option<PathBuf>,
    owner: &str,
    source: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let documents = match (content, file) {
        (Some(content), None) => {
            let source = source.map(str::parse::<DocumentSource>).transpose()?.unwrap_or(DocumentSource::Manual);
            vec![Document::new(content, owner, source)]
        }
        (None, Some(path)) => {
            let source = source.map(str::parse::<DocumentSource>).transpose()?.unwrap_or(DocumentSource::File);
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            file_documents(&text, &path, owner, source)
        }
        _ => return Err("Give either CONTENT or --file".into()),
    };

    if documents.is_empty() {
        println!("Nothing to add.");
        return Ok(());
    }

    let (_, runtime) = super::runtime(config_path).await?;
    let count = documents.len();
    for document in documents {
        let id = runtime.router.add_document(document).await?;
        println!("added {id}");
    }
    info!(owner, count, "Documents added");
    Ok(())
}

/// One document per paragraph, tagged with the file path and chunk index.
fn file_documents(text: &str, path: &Path, owner: &str, source: DocumentSource) -> Vec<Document> {
    paragraph_chunks(text)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            Document::new(chunk, owner, source)
                .with_metadata("path", path.display().to_string())
                .with_metadata("chunk", i)
        })
        .collect()
}

/// Split on blank lines; paragraphs are trimmed and empty ones dropped.
pub fn paragraph_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                chunks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        let text = "First paragraph\ncontinues here.\n\n\n  \nSecond one.\n\nThird.";
        assert_eq!(
            paragraph_chunks(text),
            vec!["First paragraph\ncontinues here.", "Second one.", "Third."]
        );
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(paragraph_chunks("").is_empty());
        assert!(paragraph_chunks("\n \n\t\n").is_empty());
    }

    #[test]
    fn file_chunks_carry_path_and_index() {
        let docs = file_documents("a\n\nb", Path::new("notes.txt"), "alice", DocumentSource::File);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].content, "b");
        assert_eq!(docs[1].owner, "alice");
        assert_eq!(docs[1].metadata["path"], "notes.txt");
        assert_eq!(docs[1].metadata["chunk"], 1);
    }
}
