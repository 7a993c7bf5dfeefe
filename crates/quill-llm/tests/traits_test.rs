use quill_llm::{ChatRequest, ModelMessage, ReplyMode, RequestParams};

#[test]
fn test_request_params_defaults() {
    let params = RequestParams::new("gpt-4o-mini");

    assert_eq!(params.model, "gpt-4o-mini");
    assert_eq!(params.system_prompt, None);
}

#[test]
fn test_request_params_builder() {
    let params = RequestParams::new("gpt-4o")
        .temperature(0.7)
        .max_tokens(100)
        .system_prompt("Answer in French");

    assert_eq!(params.temperature, 0.7);
    assert_eq!(params.max_tokens, 100);
    assert_eq!(params.system_prompt.as_deref(), Some("Answer in French"));
}

#[test]
fn test_params_to_request() {
    let params = RequestParams::new("gpt-4o").temperature(0.3).max_tokens(50);
    let request = params.to_request(vec![ModelMessage::user("Hello")]);

    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.temperature, 0.3);
    assert_eq!(request.max_tokens, 50);
}

#[test]
fn test_chat_request_builder() {
    let request = ChatRequest::new("gpt-4o", vec![ModelMessage::user("Hi")])
        .temperature(0.5)
        .max_tokens(200);

    assert_eq!(request.temperature, 0.5);
    assert_eq!(request.max_tokens, 200);
}

#[test]
fn test_chat_request_clone() {
    let request = ChatRequest::new("gpt-4o", vec![ModelMessage::user("Hi")]);
    let cloned = request.clone();

    assert_eq!(request.model, cloned.model);
    assert_eq!(request.messages, cloned.messages);
}

#[test]
fn test_reply_mode_from_flag() {
    assert_eq!(ReplyMode::from_stream_flag(true), ReplyMode::Streaming);
    assert_eq!(ReplyMode::from_stream_flag(false), ReplyMode::Buffered);
    assert_eq!(ReplyMode::default(), ReplyMode::Buffered);
}

#[test]
fn test_request_params_deserialization() {
    let json = r#"{"model":"gpt-4o","temperature":0.2,"max_tokens":300}"#;
    let params: RequestParams = serde_json::from_str(json).unwrap();

    assert_eq!(params.max_tokens, 300);
    assert_eq!(params.system_prompt, None);
}
