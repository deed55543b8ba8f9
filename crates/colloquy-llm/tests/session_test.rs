use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use colloquy_llm::{
    fragments_from_lines, ChatBackend, ChatError, Diagnostics, ExchangeState, Fragment,
    FragmentStream, GenerationOptions, GenerationRequest, LineStream, Role, Session, Transcript,
    Turn, TracingDiagnostics,
};
use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Backend that replays a canned response body
struct ScriptedBackend {
    reply: Reply,
    requests: Mutex<Vec<GenerationRequest>>,
}

enum Reply {
    Lines(Vec<String>),
    Status(u16, String),
    /// Lines, then a dropped connection
    Interrupted(Vec<String>),
    /// Lines, then a stream that never ends
    Stalled(Vec<String>),
}

impl ScriptedBackend {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn delta(text: &str) -> String {
    format!(
        r#"data: {{"type":"content_block_delta","index":0,"delta":{{"type":"text_delta","text":"{}"}}}}"#,
        text
    )
}

fn ok_lines(lines: Vec<String>) -> impl futures::Stream<Item = colloquy_llm::Result<String>> + Send {
    stream::iter(lines.into_iter().map(Ok))
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_reply(&self, request: &GenerationRequest) -> colloquy_llm::Result<FragmentStream> {
        self.requests.lock().unwrap().push(request.clone());

        let lines: LineStream = match &self.reply {
            Reply::Status(status, body) => {
                return Err(ChatError::RemoteError {
                    status: *status,
                    body: body.clone(),
                })
            }
            Reply::Lines(lines) => Box::pin(ok_lines(lines.clone())),
            Reply::Interrupted(lines) => Box::pin(ok_lines(lines.clone()).chain(stream::iter(vec![
                Err(ChatError::TransportInterrupted("connection reset".into())),
            ]))),
            Reply::Stalled(lines) => Box::pin(ok_lines(lines.clone()).chain(stream::pending::<colloquy_llm::Result<String>>())),
        };

        Ok(fragments_from_lines(lines, Arc::new(TracingDiagnostics)))
    }
}

#[derive(Default)]
struct RecordingDiagnostics {
    remote_errors: Mutex<Vec<(u16, String)>>,
    failures: Mutex<usize>,
}

impl Diagnostics for RecordingDiagnostics {
    fn remote_error(&self, status: u16, body: &str) {
        self.remote_errors.lock().unwrap().push((status, body.to_string()));
    }

    fn exchange_failed(&self, _error: &ChatError) {
        *self.failures.lock().unwrap() += 1;
    }
}

fn session(reply: Reply) -> Session<Arc<ScriptedBackend>> {
    Session::new(Arc::new(ScriptedBackend::new(reply)), GenerationOptions::default()).unwrap()
}

#[tokio::test]
async fn test_concrete_exchange() {
    let mut session = session(Reply::Lines(vec![
        delta("Hi"),
        delta(" there"),
        "data: [DONE]".to_string(),
    ]));

    let mut emitted = Vec::new();
    let reply = session
        .send_prompt("hi", |f: &Fragment| emitted.push(f.to_string()))
        .await
        .unwrap();

    assert_eq!(reply, "Hi there");
    assert_eq!(emitted, ["Hi", " there"]);
    assert_eq!(
        session.transcript().snapshot(),
        vec![Turn::user("hi"), Turn::assistant("Hi there")]
    );
    assert_eq!(session.state(), ExchangeState::Completed);
}

#[tokio::test]
async fn test_mixed_frames_commit_one_turn() {
    let mut session = session(Reply::Lines(vec![
        delta("Hel"),
        delta("lo"),
        r#"data: {"type":"message_delta","delta":{"content":[{"type":"text","text":" world"}]}}"#
            .to_string(),
    ]));

    let reply = session.send_prompt("greet", |_: &Fragment| {}).await.unwrap();

    assert_eq!(reply, "Hello world");
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript().last(), Some(&Turn::assistant("Hello world")));
}

#[tokio::test]
async fn test_request_carries_user_turn_once() {
    let backend = Arc::new(ScriptedBackend::new(Reply::Lines(vec![delta("ok")])));
    let options = GenerationOptions::new("claude-test").max_tokens(128).temperature(0.3);
    let transcript = Transcript::from_turns(vec![Turn::system("be brief")]).unwrap();
    let mut session = Session::new(backend.clone(), options)
        .unwrap()
        .with_transcript(transcript);

    session.send_prompt("question", |_: &Fragment| {}).await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "claude-test");
    assert_eq!(request.max_tokens, 128);
    assert!(request.stream);
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1].role, Role::User);
    assert_eq!(request.messages[1].content, "question");
}

#[tokio::test]
async fn test_remote_error_appends_nothing() {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let mut session = session(Reply::Status(
        529,
        r#"{"type":"error","error":{"type":"overloaded_error"}}"#.to_string(),
    ))
    .with_diagnostics(diagnostics.clone());
    session.transcript_mut().append(Role::User, "earlier");
    session.transcript_mut().append(Role::Assistant, "reply");
    let before = session.transcript().snapshot();

    let result = session.send_prompt("again", |_: &Fragment| {}).await;

    match result {
        Err(ChatError::RemoteError { status, body }) => {
            assert_eq!(status, 529);
            assert!(body.contains("overloaded_error"));
        }
        other => panic!("Expected RemoteError, got {:?}", other),
    }
    assert_eq!(session.transcript().snapshot(), before);
    assert_eq!(session.state(), ExchangeState::Failed);
    assert_eq!(diagnostics.remote_errors.lock().unwrap().len(), 1);
    assert_eq!(*diagnostics.failures.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_transport_interruption_keeps_emitted_fragments_uncommitted() {
    let mut session = session(Reply::Interrupted(vec![delta("partial")]));

    let mut emitted = Vec::new();
    let result = session
        .send_prompt("hi", |f: &Fragment| emitted.push(f.to_string()))
        .await;

    assert!(matches!(result, Err(ChatError::TransportInterrupted(_))));
    assert_eq!(emitted, ["partial"]);
    assert!(session.transcript().is_empty());
    assert_eq!(session.state(), ExchangeState::Failed);
}

#[tokio::test]
async fn test_cancel_mid_stream_leaves_transcript_unchanged() {
    let mut session = session(Reply::Stalled(vec![delta("first")]));
    session.transcript_mut().append(Role::User, "original");
    let before = session.transcript().snapshot();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut emitted = Vec::new();

    let result = session
        .send_prompt_with_cancel("hi", &cancel, |f: &Fragment| {
            emitted.push(f.to_string());
            trigger.cancel();
        })
        .await;

    assert!(matches!(result, Err(ChatError::Cancelled)));
    assert_eq!(emitted, ["first"]);
    assert_eq!(session.transcript().snapshot(), before);
    assert_eq!(session.state(), ExchangeState::Failed);
}

#[tokio::test]
async fn test_cancel_before_request() {
    let backend = Arc::new(ScriptedBackend::new(Reply::Lines(vec![delta("x")])));
    let mut session = Session::new(backend.clone(), GenerationOptions::default()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = session
        .send_prompt_with_cancel("hi", &cancel, |_: &Fragment| {})
        .await;

    assert!(matches!(result, Err(ChatError::Cancelled)));
    assert!(backend.requests().is_empty());
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn test_new_exchange_after_failure() {
    let mut failing = session(Reply::Status(500, "boom".into()));
    assert!(failing.send_prompt("one", |_: &Fragment| {}).await.is_err());

    let transcript = failing.transcript().clone();
    let mut session = session(Reply::Lines(vec![delta("fine")])).with_transcript(transcript);

    let reply = session.send_prompt("two", |_: &Fragment| {}).await.unwrap();

    assert_eq!(reply, "fine");
    assert_eq!(
        session.transcript().snapshot(),
        vec![Turn::user("two"), Turn::assistant("fine")]
    );
}

#[tokio::test]
async fn test_fragments_are_emitted_before_stream_ends() {
    // The stream never ends, so the only way to see a fragment is incremental delivery
    let mut session = session(Reply::Stalled(vec![delta("live")]));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let _ = session
        .send_prompt_with_cancel("hi", &cancel, move |f: &Fragment| {
            sink.lock().unwrap().push(f.to_string());
            trigger.cancel();
        })
        .await;

    assert_eq!(*seen.lock().unwrap(), vec!["live".to_string()]);
}

#[tokio::test]
async fn test_invalid_options_rejected() {
    let backend = Arc::new(ScriptedBackend::new(Reply::Lines(Vec::new())));
    let result = Session::new(backend, GenerationOptions::default().temperature(3.0));
    assert!(matches!(result, Err(ChatError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_empty_stream_commits_empty_reply() {
    let mut session = session(Reply::Lines(vec!["data: [DONE]".to_string()]));

    let reply = session.send_prompt("hi", |_: &Fragment| {}).await.unwrap();

    assert_eq!(reply, "");
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript().last().map(|t| t.role()), Some(Role::Assistant));
}

#[tokio::test]
async fn test_returned_reply_matches_committed_turn() {
    let mut session = session(Reply::Lines(vec![
        delta("a\\r\\u001bb"),
        delta(" c"),
        "data: [DONE]".to_string(),
    ]));

    let mut emitted = String::new();
    let reply = session
        .send_prompt("hi", |f: &Fragment| emitted.push_str(f.as_str()))
        .await
        .unwrap();

    assert_eq!(emitted, "a\r\u{1b}b c");
    assert_eq!(reply, "ab c");
    assert_eq!(session.transcript().last().map(|t| t.content()), Some(reply.as_str()));
}
