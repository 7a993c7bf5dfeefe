use anyhow::Result;
use futures::StreamExt;
use quill_llm::{
    accumulate, assemble_messages, CancellationToken, ChatClient, ChatMessage, OpenAIClient,
    RequestParams, StreamEvent,
};
use std::io::Write;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY")?;
    let client = OpenAIClient::new(api_key)?;

    let params = RequestParams::new("gpt-4o-mini").max_tokens(512);
    let messages = assemble_messages(
        &[],
        &ChatMessage::user("Write a short poem about taking notes."),
        None,
    );

    // Stop the reply after three seconds, whatever has arrived by then is kept
    let cancel = CancellationToken::new();
    let timer = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        timer.cancel();
    });

    let frames = client.chat_stream(params.to_request(messages)).await?;
    let mut events = accumulate(frames, cancel);
    let mut printed = 0;

    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Partial { text } => {
                print!("{}", &text[printed..]);
                std::io::stdout().flush()?;
                printed = text.len();
            }
            StreamEvent::Completed { text, stopped } => {
                println!("\n\n[{} chars, stopped early: {}]", text.len(), stopped);
            }
        }
    }

    Ok(())
}
