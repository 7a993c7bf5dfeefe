use anyhow::Result;
use quill_llm::{assemble_messages, ChatClient, ChatMessage, OpenAIClient, RequestParams};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY")?;
    let client = OpenAIClient::new(api_key)?;

    let params = RequestParams::new("gpt-4o-mini").temperature(0.7).max_tokens(256);
    let messages = assemble_messages(&[], &ChatMessage::user("What is the capital of France?"), None);

    let reply = client.chat(params.to_request(messages)).await?;

    println!("Response: {}", reply);

    Ok(())
}
