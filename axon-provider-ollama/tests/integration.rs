use axon_provider_ollama::OllamaProvider;
use axon_turn::{ChatModel, ContentPart, ProviderMessage, ProviderRequest, Role};

fn simple_request(text: &str) -> ProviderRequest {
    ProviderRequest {
        model: None,
        messages: vec![ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text { text: text.into() }],
        }],
        tools: vec![],
        max_tokens: Some(64),
        temperature: None,
        system: None,
        timeout: None,
        extra: serde_json::Value::Null,
    }
}

#[tokio::test]
#[ignore] // Requires a local Ollama daemon at localhost:11434
async fn real_local_simple_completion() {
    let provider = OllamaProvider::new();

    let response = provider
        .complete(simple_request("Say hello in one word."))
        .await
        .unwrap();

    assert!(!response.text().is_empty());
    assert_eq!(response.cost, Some(rust_decimal::Decimal::ZERO));
}

#[tokio::test]
#[ignore] // Requires a local Ollama daemon at localhost:11434
async fn real_local_streaming_completion() {
    use futures::StreamExt;

    let provider = OllamaProvider::new();

    let mut stream = provider.stream(simple_request("Count to three.")).await.unwrap();
    let mut collected = String::new();
    while let Some(delta) = stream.next().await {
        collected.push_str(&delta.unwrap().text);
    }
    assert!(!collected.is_empty());
}
