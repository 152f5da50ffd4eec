//! End-to-end exercise of the assistant pipeline with stub providers:
//! ingest a small corpus, retrieve by similarity, generate with the style
//! prompt, and round-trip a state snapshot.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use quillwright::assistant::WritingAssistant;
use quillwright::core::config::service::AssistantConfig;
use quillwright::core::errors::AssistantError;
use quillwright::corpus::CorpusProcessor;
use quillwright::embeddings::EmbeddingProvider;
use quillwright::llm::{ChatRequest, LlmProvider};
use quillwright::store::{SqliteVectorStore, VectorStore};

const VOCAB: [&str; 4] = ["ocean", "mountain", "city", "writing"];

/// Deterministic embedder: term-frequency over a tiny fixed vocabulary.
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword-stub"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AssistantError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCAB
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }
}

/// Stub LLM that echoes the final user prompt so tests can inspect it.
struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    fn name(&self) -> &str {
        "echo-stub"
    }

    async fn health_check(&self) -> Result<bool, AssistantError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, AssistantError> {
        Ok(request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default())
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, AssistantError>>, AssistantError> {
        let (tx, rx) = mpsc::channel(4);
        let content = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        tokio::spawn(async move {
            for piece in content.split_inclusive(' ') {
                if tx.send(Ok(piece.to_string())).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

async fn test_assistant(data_dir: &Path) -> WritingAssistant {
    let store = SqliteVectorStore::with_path(data_dir.join("index.db"))
        .await
        .unwrap();
    let store: Arc<dyn VectorStore> = Arc::new(store);

    WritingAssistant::new(
        CorpusProcessor::default(),
        Arc::new(KeywordEmbedder),
        store,
        Arc::new(EchoLlm),
        AssistantConfig::default(),
    )
}

fn write_corpus(dir: &Path) {
    fs::write(
        dir.join("Essay - The Ocean [nature].txt"),
        "The ocean stretches beyond the horizon. The ocean hides its depths.\n\n\
         Waves carry stories between the ocean and the shore.",
    )
    .unwrap();
    fs::write(
        dir.join("Reflection - Mountain Mornings [nature].txt"),
        "The mountain air clears the mind before the day begins.\n\n\
         Every mountain trail teaches patience.",
    )
    .unwrap();
    fs::write(
        dir.join("Substack - City Notes [urban].txt"),
        "The city never pauses, and neither does its noise.\n\n\
         Writing about the city means writing about motion.",
    )
    .unwrap();
}

#[tokio::test]
async fn ingest_then_retrieve_ranks_by_topic() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;

    let count = assistant.ingest_directory(dir.path(), false).await.unwrap();
    assert_eq!(count, 3);

    let results = assistant
        .retrieve("tell me about the ocean", Some(2), None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.title, "Essay - The Ocean");
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn retrieve_honors_content_type_filter() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    let results = assistant
        .retrieve("ocean writing city", Some(5), Some("newsletter"))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.content_type, "newsletter");
}

#[tokio::test]
async fn generate_embeds_examples_and_style_guidance() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    let output = assistant
        .generate(
            "write an ocean piece [make this shorter]",
            None,
            Some(2),
            None,
        )
        .await
        .unwrap();

    assert!(output.contains("--- Example 1 (Content type: essay) ---"));
    assert!(output.contains("Title: Essay - The Ocean"));
    assert!(output.contains("Style guidance: shorter"));
    assert!(output.contains("write an ocean piece"));
}

#[tokio::test]
async fn explicit_style_wins_over_inline_directive() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    let output = assistant
        .generate(
            "write an ocean piece [make this shorter]",
            Some("more lyrical"),
            Some(1),
            None,
        )
        .await
        .unwrap();

    assert!(output.contains("Style guidance: more lyrical"));
    assert!(!output.contains("Style guidance: shorter"));
}

#[tokio::test]
async fn generate_on_empty_corpus_still_produces_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = test_assistant(dir.path()).await;

    let output = assistant
        .generate("write something", None, None, None)
        .await
        .unwrap();

    assert!(output.contains("write something"));
}

#[tokio::test]
async fn streaming_generate_delivers_tokens() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    let mut rx = assistant
        .generate_streaming("write an ocean piece", None, Some(1), None)
        .await
        .unwrap();

    let mut assembled = String::new();
    while let Some(token) = rx.recv().await {
        assembled.push_str(&token.unwrap());
    }
    assert!(assembled.contains("write an ocean piece"));
}

#[tokio::test]
async fn reingest_replaces_rather_than_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;

    assistant.ingest_directory(dir.path(), false).await.unwrap();
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    let stats = assistant.stats().await.unwrap();
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.source_files, 3);
    assert_eq!(stats.chunks_by_type.get("essay"), Some(&1));
    assert_eq!(stats.chunks_by_type.get("newsletter"), Some(&1));
}

#[tokio::test]
async fn emptied_file_sheds_stale_chunks_on_reingest() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Essay - Tides [nature].txt");
    fs::write(&file, "The ocean advances and retreats with the tides.").unwrap();
    let assistant = test_assistant(dir.path()).await;

    let count = assistant.ingest_directory(dir.path(), false).await.unwrap();
    assert_eq!(count, 1);

    fs::write(&file, "").unwrap();
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    assert_eq!(assistant.stats().await.unwrap().total_chunks, 0);
}

#[tokio::test]
async fn importing_missing_snapshot_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = test_assistant(dir.path()).await;

    let err = assistant
        .import_state(&dir.path().join("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, AssistantError::NotFound(_)));
}

#[tokio::test]
async fn export_import_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let assistant = test_assistant(dir.path()).await;
    assistant.ingest_directory(dir.path(), false).await.unwrap();

    let snapshot = dir.path().join("snapshot.json");
    let exported = assistant.export_state(&snapshot).await.unwrap();
    assert_eq!(exported, 3);

    assistant.clear().await.unwrap();
    assert_eq!(assistant.stats().await.unwrap().total_chunks, 0);

    let imported = assistant.import_state(&snapshot).await.unwrap();
    assert_eq!(imported, 3);

    let results = assistant
        .retrieve("mountain trails", Some(1), None)
        .await
        .unwrap();
    assert_eq!(results[0].chunk.title, "Reflection - Mountain Mornings");
}

#[tokio::test]
async fn add_file_indexes_one_source() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Podcast - Ocean Talk [audio].txt");
    fs::write(&file, "Welcome to the ocean podcast.").unwrap();
    let assistant = test_assistant(dir.path()).await;

    let count = assistant.add_file(&file).await.unwrap();
    assert_eq!(count, 1);

    // adding again replaces instead of duplicating
    assistant.add_file(&file).await.unwrap();
    let stats = assistant.stats().await.unwrap();
    assert_eq!(stats.total_chunks, 1);
    assert_eq!(stats.chunks_by_type.get("podcast"), Some(&1));
}
