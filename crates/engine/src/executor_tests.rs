//! Integration tests for the execution coordinator.
//!
//! These use the recording mocks from the `providers` crate, so no Gemini
//! key or network access is required.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use providers::mock::{MockGenerator, MockSender};
use providers::{GenerationConfig, ProviderError, RequestSender, TextGenerator, TextStream};

use crate::error::EngineError;
use crate::executor::{Coordinator, RunOutcome};
use crate::models::{FlowEdge, FlowNode, HttpMethod, NodeData, RunState};
use crate::store::GraphStore;

/// Two text nodes feeding an LLM prompt.
///
///   Concept ─┐
///            ├→ llm
///   Audience ┘
fn llm_fixture() -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::text("a", "Concept", "Explain X"));
    store.add_node(FlowNode::text("b", "Audience", "Simple"));
    store.add_node(FlowNode::llm_prompt(
        "c",
        "Gemini LLM",
        "Combine $Concept and $Audience",
    ));
    store.upsert_edge(FlowEdge::new("e1", "a", "c"));
    store.upsert_edge(FlowEdge::new("e2", "b", "c"));
    store
}

fn coordinator(
    store: Arc<GraphStore>,
    generator: Arc<dyn TextGenerator>,
    http: Arc<dyn RequestSender>,
) -> Coordinator {
    Coordinator::new(store, generator, http)
}

fn derived_text(store: &GraphStore, outcome: &RunOutcome) -> String {
    match store
        .get_node(&outcome.derived_node_id)
        .expect("derived node exists")
        .data
    {
        NodeData::Text { text } => text,
        other => panic!("derived node is not a text node: {other:?}"),
    }
}

// ============================================================
// LLM runs
// ============================================================

#[tokio::test]
async fn llm_run_substitutes_streams_and_settles() {
    let store = llm_fixture();
    let generator = Arc::new(MockGenerator::streaming(["Hello", " world"]));
    let coordinator = coordinator(
        store.clone(),
        generator.clone(),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let outcome = coordinator.run_node("c").await.expect("run starts");

    // The substituted prompt reached the capability.
    assert_eq!(
        generator.last_prompt().as_deref(),
        Some("Combine Explain X and Simple")
    );

    // Chunks accumulated into the derived node.
    assert!(outcome.status.is_success());
    assert_eq!(derived_text(&store, &outcome), "Hello world");

    // One new node and one new edge were spawned.
    assert_eq!(store.node_count(), 4);
    assert_eq!(store.edge_count(), 3);
    let edge = store.get_edge(&outcome.derived_edge_id).expect("edge");
    assert_eq!(edge.source, "c");
    assert_eq!(edge.target, outcome.derived_node_id);

    // Terminal state: producer idle, edge animation off.
    assert_eq!(store.get_node("c").unwrap().run_state, RunState::Idle);
    assert!(!edge.animated);
}

/// Generator whose stream inspects the store between its two chunks,
/// recording the derived node's text right before the second chunk is
/// produced.
struct ObservingGenerator {
    store: Arc<GraphStore>,
    seen_between_chunks: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TextGenerator for ObservingGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        Ok("Hello world".to_owned())
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<TextStream, ProviderError> {
        let store = self.store.clone();
        let seen = self.seen_between_chunks.clone();
        let stream = futures::stream::unfold(0u8, move |step| {
            let store = store.clone();
            let seen = seen.clone();
            async move {
                match step {
                    0 => Some((Ok::<String, ProviderError>("Hello".to_owned()), 1)),
                    1 => {
                        let (nodes, _) = store.graph();
                        for node in nodes {
                            if node.label != "LLM Output" {
                                continue;
                            }
                            if let NodeData::Text { text } = node.data {
                                seen.lock().unwrap().push(text);
                            }
                        }
                        Some((Ok(" world".to_owned()), 2))
                    }
                    _ => None,
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

#[tokio::test]
async fn each_chunk_is_visible_in_the_store_before_the_next_arrives() {
    let store = llm_fixture();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let generator = Arc::new(ObservingGenerator {
        store: store.clone(),
        seen_between_chunks: seen.clone(),
    });
    let coordinator = coordinator(
        store.clone(),
        generator,
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let outcome = coordinator.run_node("c").await.expect("run starts");

    // The first chunk had already been written out when the second one was
    // produced; chunks are not batched until the stream ends.
    assert_eq!(*seen.lock().unwrap(), vec!["Hello".to_owned()]);
    assert_eq!(derived_text(&store, &outcome), "Hello world");
}

#[tokio::test]
async fn llm_config_is_forwarded_to_the_capability() {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode {
        data: NodeData::LlmPrompt {
            prompt: "say hi".into(),
            temperature: 0.2,
            thinking_enabled: false,
        },
        ..FlowNode::llm_prompt("p", "LLM", "")
    });

    let generator = Arc::new(MockGenerator::streaming(["hi"]));
    let coordinator = coordinator(
        store,
        generator.clone(),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );
    coordinator.run_node("p").await.expect("run starts");

    let (_, config) = generator.calls.lock().unwrap()[0].clone();
    assert_eq!(config.temperature, Some(0.2));
    assert_eq!(config.thinking_enabled, Some(false));
}

#[tokio::test]
async fn empty_prompt_after_substitution_never_reaches_the_capability() {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::llm_prompt("p", "LLM", "   \n\t "));

    let generator = Arc::new(MockGenerator::streaming(["unused"]));
    let coordinator = coordinator(
        store.clone(),
        generator.clone(),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let outcome = coordinator.run_node("p").await.expect("run starts");

    assert!(!outcome.status.is_success());
    assert_eq!(generator.call_count(), 0);
    assert!(derived_text(&store, &outcome).starts_with("Error: "));
    assert_eq!(store.get_node("p").unwrap().run_state, RunState::Idle);
}

#[tokio::test]
async fn unknown_tokens_pass_through_into_the_prompt() {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::llm_prompt("p", "LLM", "use $Nope here"));

    let generator = Arc::new(MockGenerator::streaming(["ok"]));
    let coordinator = coordinator(
        store,
        generator.clone(),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );
    coordinator.run_node("p").await.expect("run starts");

    assert_eq!(generator.last_prompt().as_deref(), Some("use $Nope here"));
}

#[tokio::test]
async fn stream_failure_midway_writes_error_text() {
    let store = llm_fixture();
    let generator = Arc::new(MockGenerator::failing_after(["partial"], "boom"));
    let coordinator = coordinator(
        store.clone(),
        generator,
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let outcome = coordinator.run_node("c").await.expect("run starts");

    assert!(!outcome.status.is_success());
    let text = derived_text(&store, &outcome);
    assert!(text.starts_with("Error: "), "got: {text}");
    assert!(text.contains("boom"));

    // Cleanup still ran.
    assert_eq!(store.get_node("c").unwrap().run_state, RunState::Idle);
    assert!(!store.get_edge(&outcome.derived_edge_id).unwrap().animated);
}

#[tokio::test]
async fn only_text_ancestors_feed_the_local_namespace() {
    // producer ← llm ancestor labelled "Concept": name exists for hinting
    // but contributes no value, so the token passes through.
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::llm_prompt("up", "Concept", "irrelevant"));
    store.add_node(FlowNode::llm_prompt("p", "LLM", "use $Concept"));
    store.upsert_edge(FlowEdge::new("e", "up", "p"));

    let generator = Arc::new(MockGenerator::streaming(["ok"]));
    let coordinator = coordinator(
        store,
        generator.clone(),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );
    coordinator.run_node("p").await.expect("run starts");

    assert_eq!(generator.last_prompt().as_deref(), Some("use $Concept"));
}

// ============================================================
// HTTP runs
// ============================================================

fn http_fixture(method: HttpMethod) -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::text("k", "Key", "sekrit"));
    store.add_node(FlowNode {
        data: NodeData::HttpRequest {
            method,
            url: "https://api.example.com/items".into(),
            headers: "Content-Type: application/json\nX-Auth: $Key".into(),
            body: r#"{ "token": "$Key" }"#.into(),
        },
        ..FlowNode::http_request("h", "HTTP Request", method, "")
    });
    store.upsert_edge(FlowEdge::new("e", "k", "h"));
    store
}

#[tokio::test]
async fn http_get_sends_substituted_headers_and_no_body() {
    let store = http_fixture(HttpMethod::GET);
    let sender = Arc::new(MockSender::with_status(200, "OK", "plain text"));
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming([""])),
        sender.clone(),
    );

    let outcome = coordinator.run_node("h").await.expect("run starts");
    assert!(outcome.status.is_success());

    let request = sender.last_request().expect("request sent");
    assert_eq!(request.method, "GET");
    assert_eq!(
        request.headers,
        vec![
            ("Content-Type".to_owned(), "application/json".to_owned()),
            ("X-Auth".to_owned(), "sekrit".to_owned()),
        ]
    );
    assert_eq!(request.body, None);

    // Non-JSON bodies are used verbatim.
    assert_eq!(derived_text(&store, &outcome), "plain text");
}

#[tokio::test]
async fn http_post_substitutes_and_sends_the_body() {
    let store = http_fixture(HttpMethod::POST);
    let sender = Arc::new(MockSender::with_status(201, "Created", r#"{"id":1}"#));
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming([""])),
        sender.clone(),
    );

    let outcome = coordinator.run_node("h").await.expect("run starts");
    assert!(outcome.status.is_success());

    let request = sender.last_request().expect("request sent");
    assert_eq!(request.body.as_deref(), Some(r#"{ "token": "sekrit" }"#));

    // JSON bodies are pretty-printed.
    assert_eq!(derived_text(&store, &outcome), "{\n  \"id\": 1\n}");
}

#[tokio::test]
async fn non_success_status_becomes_error_text_with_status_and_body() {
    let store = http_fixture(HttpMethod::GET);
    let sender = Arc::new(MockSender::with_status(404, "Not Found", "no such item"));
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming([""])),
        sender,
    );

    let outcome = coordinator.run_node("h").await.expect("run starts");

    assert!(!outcome.status.is_success());
    let text = derived_text(&store, &outcome);
    assert!(text.starts_with("Error: "), "got: {text}");
    assert!(text.contains("404"));
    assert!(text.contains("no such item"));
}

#[tokio::test]
async fn unresolved_global_token_stays_in_the_url_and_fetch_failure_is_localized() {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::http_request(
        "h",
        "HTTP Request",
        HttpMethod::GET,
        "$global.missingKey",
    ));

    let sender = Arc::new(MockSender::failing("dns failure"));
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming([""])),
        sender.clone(),
    );

    let outcome = coordinator.run_node("h").await.expect("run starts");

    // Substitution left the token untouched; the sender saw it verbatim.
    assert_eq!(sender.last_request().unwrap().url, "$global.missingKey");
    assert!(derived_text(&store, &outcome).starts_with("Error: "));

    // The failure stayed inside this run's derived node.
    assert_eq!(store.get_node("h").unwrap().run_state, RunState::Idle);
}

#[tokio::test]
async fn global_variables_resolve_without_any_ancestor_relationship() {
    let store = Arc::new(GraphStore::new());
    store.set_global_source(r#"{ "user": { "name": "Alex" }, "apiKey": "k" }"#);
    store.add_node(FlowNode::http_request(
        "h",
        "HTTP",
        HttpMethod::GET,
        "https://api.example.com/users/$global.user.name",
    ));

    let sender = Arc::new(MockSender::with_status(200, "OK", "{}"));
    let coordinator = coordinator(store, Arc::new(MockGenerator::streaming([""])), sender.clone());
    coordinator.run_node("h").await.expect("run starts");

    assert_eq!(
        sender.last_request().unwrap().url,
        "https://api.example.com/users/Alex"
    );
}

// ============================================================
// Guards and concurrency
// ============================================================

#[tokio::test]
async fn missing_node_aborts_with_no_visible_effect() {
    let store = llm_fixture();
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming(["x"])),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let result = coordinator.run_node("ghost").await;
    assert!(matches!(result, Err(EngineError::NodeNotFound(_))));
    assert_eq!(store.node_count(), 3);
    assert_eq!(store.edge_count(), 2);
}

#[tokio::test]
async fn text_node_is_not_runnable() {
    let store = llm_fixture();
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming(["x"])),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let result = coordinator.run_node("a").await;
    assert!(matches!(result, Err(EngineError::NotAProducer(_))));
    assert_eq!(store.node_count(), 3);
}

#[tokio::test]
async fn concurrent_runs_own_disjoint_derived_pairs() {
    let store = Arc::new(GraphStore::new());
    store.add_node(FlowNode::llm_prompt("p1", "One", "first"));
    store.add_node(FlowNode::llm_prompt("p2", "Two", "second"));

    let coordinator = Arc::new(coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming(["out"])),
        Arc::new(MockSender::with_status(200, "OK", "")),
    ));

    let (first, second) = tokio::join!(coordinator.run_node("p1"), coordinator.run_node("p2"));
    let first = first.expect("first run");
    let second = second.expect("second run");

    assert_ne!(first.derived_node_id, second.derived_node_id);
    assert_ne!(first.derived_edge_id, second.derived_edge_id);
    assert_eq!(store.node_count(), 4);
    assert_eq!(store.edge_count(), 2);
    assert_eq!(store.get_node("p1").unwrap().run_state, RunState::Idle);
    assert_eq!(store.get_node("p2").unwrap().run_state, RunState::Idle);
}

#[tokio::test]
async fn rerunning_spawns_a_new_derived_node() {
    let store = llm_fixture();
    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming(["out"])),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );

    let first = coordinator.run_node("c").await.expect("first run");
    let second = coordinator.run_node("c").await.expect("second run");

    assert_ne!(first.derived_node_id, second.derived_node_id);
    assert_eq!(store.node_count(), 5);

    // The first derived node is an ordinary graph entity now; the second
    // run did not touch it.
    assert_eq!(derived_text(&store, &first), "out");
}

#[tokio::test]
async fn derived_node_is_spawned_to_the_right_of_the_producer() {
    let store = Arc::new(GraphStore::new());
    let mut producer = FlowNode::llm_prompt("p", "LLM", "hi");
    producer.position = crate::models::Position { x: 100.0, y: 50.0 };
    store.add_node(producer);

    let coordinator = coordinator(
        store.clone(),
        Arc::new(MockGenerator::streaming(["x"])),
        Arc::new(MockSender::with_status(200, "OK", "")),
    );
    let outcome = coordinator.run_node("p").await.expect("run");

    let derived = store.get_node(&outcome.derived_node_id).unwrap();
    assert!(derived.position.x > 100.0);
    assert_eq!(derived.position.y, 50.0);
}

// Mock responses for the unused capability side are inert: the LLM fixture
// never touches the sender and the HTTP fixtures never touch the generator.
#[tokio::test]
async fn llm_run_never_touches_the_http_capability() {
    let store = llm_fixture();
    let sender = Arc::new(MockSender::with_status(500, "Internal Server Error", ""));
    let coordinator = coordinator(
        store,
        Arc::new(MockGenerator::streaming(["fine"])),
        sender.clone(),
    );

    let outcome = coordinator.run_node("c").await.expect("run starts");
    assert!(outcome.status.is_success());
    assert_eq!(sender.call_count(), 0);
}
