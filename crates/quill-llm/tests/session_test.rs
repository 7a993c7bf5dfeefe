use quill_llm::{
    ChatError, ChatHost, ChatMessage, ChatSession, ClientConfig, OpenAIClient, ReplyMode,
    RequestParams, Sender,
};

#[derive(Default)]
struct RecordingHost {
    appended: Vec<ChatMessage>,
    partials: Vec<String>,
    notices: Vec<String>,
}

impl ChatHost for RecordingHost {
    fn append_message(&mut self, message: ChatMessage) {
        self.appended.push(message);
    }

    fn update_partial(&mut self, text: &str) {
        self.partials.push(text.to_string());
    }

    fn notify(&mut self, notice: &str) {
        self.notices.push(notice.to_string());
    }
}

fn session_for(server: &mockito::Server) -> ChatSession<OpenAIClient> {
    let client =
        OpenAIClient::from_config(ClientConfig::new("test-key").with_base_url(server.url())).unwrap();
    ChatSession::new(client)
}

fn params() -> RequestParams {
    RequestParams::new("test-model").temperature(0.7).max_tokens(128)
}

#[tokio::test]
async fn test_buffered_success_appends_one_ai_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"hello"}}]}"#)
        .create_async()
        .await;

    let session = session_for(&server);
    let mut host = RecordingHost::default();

    let reply = session
        .send(&[], &ChatMessage::user("Hi"), &params(), ReplyMode::Buffered, &mut host)
        .await
        .unwrap();

    assert_eq!(reply.as_deref(), Some("hello"));
    assert_eq!(host.appended.len(), 1);
    assert_eq!(host.appended[0].sender, Sender::Ai);
    assert_eq!(host.appended[0].text, "hello");
    assert!(host.appended[0].visible);
    assert!(host.notices.is_empty());
}

#[tokio::test]
async fn test_buffered_rate_limit_appends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"slow down"}}"#)
        .create_async()
        .await;

    let session = session_for(&server);
    let mut host = RecordingHost::default();

    let err = session
        .send(&[], &ChatMessage::user("Hi"), &params(), ReplyMode::Buffered, &mut host)
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(429));
    assert!(host.appended.is_empty());
    assert_eq!(host.notices.len(), 1);
    assert!(host.notices[0].contains("429"));
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_streaming_success_appends_full_text() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Good\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\", thanks\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let session = session_for(&server);
    let mut host = RecordingHost::default();
    let history = vec![ChatMessage::user("Hi"), ChatMessage::ai("Hello!")];

    let reply = session
        .send(&history, &ChatMessage::user("How are you?"), &params(), ReplyMode::Streaming, &mut host)
        .await
        .unwrap();

    assert_eq!(reply.as_deref(), Some("Good, thanks"));
    assert_eq!(host.partials, vec!["Good", "Good, thanks", ""]);
    assert_eq!(host.appended, vec![ChatMessage::ai("Good, thanks")]);
}

#[tokio::test]
async fn test_streaming_error_event_discards_partial() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Half an ans\"}}]}\n\n",
        "event: error\n",
        "data: {\"error\":{\"message\":\"model overloaded\"}}\n\n",
    );
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let session = session_for(&server);
    let mut host = RecordingHost::default();

    let err = session
        .send(&[], &ChatMessage::user("Hi"), &params(), ReplyMode::Streaming, &mut host)
        .await
        .unwrap_err();

    match err {
        ChatError::Stream(failure) => assert_eq!(failure.message.as_deref(), Some("model overloaded")),
        other => panic!("Expected Stream error, got {:?}", other),
    }
    assert!(host.appended.is_empty());
    assert_eq!(host.partials, vec!["Half an ans"]);
    assert_eq!(host.notices.len(), 1);
}

#[tokio::test]
async fn test_streaming_open_failure_appends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let session = session_for(&server);
    let mut host = RecordingHost::default();

    let result = session
        .send(&[], &ChatMessage::user("Hi"), &params(), ReplyMode::Streaming, &mut host)
        .await;

    assert!(matches!(result, Err(ChatError::Transport { .. })));
    assert!(host.appended.is_empty());
    assert!(host.partials.is_empty());
    assert!(host.notices[0].contains("500"));
}

#[tokio::test]
async fn test_session_is_reusable_after_failure() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let session = session_for(&server);
    let mut host = RecordingHost::default();
    assert!(session
        .send(&[], &ChatMessage::user("Hi"), &params(), ReplyMode::Buffered, &mut host)
        .await
        .is_err());
    failing.assert_async().await;
    failing.remove_async().await;

    let _ok = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"back"}}]}"#)
        .create_async()
        .await;

    let reply = session
        .send(&[], &ChatMessage::user("Hi"), &params(), ReplyMode::Buffered, &mut host)
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("back"));
    assert_eq!(host.appended.len(), 1);
}
