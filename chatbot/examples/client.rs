use reqwest::Client;
use serde_json::json;

// Drives a running `api` server: opens a session, sends two messages, prints the transcript.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let base_url = std::env::var("CHATBOT_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    println!("Health:");
    let health: serde_json::Value = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("{}", serde_json::to_string_pretty(&health)?);

    let session: serde_json::Value = client
        .post(format!("{}/sessions", base_url))
        .send()
        .await?
        .json()
        .await?;
    let session_id = session["session_id"]
        .as_str()
        .ok_or("server did not return a session id")?;
    println!("\nSession {}", session_id);

    for text in ["Hi! Who are you?", "Summarize that in five words."] {
        let response = client
            .post(format!("{}/sessions/{}/messages", base_url, session_id))
            .json(&json!({ "text": text }))
            .send()
            .await?;
        println!("\nStatus: {}", response.status());
        let exchange: serde_json::Value = response.json().await?;
        println!("you: {}", exchange["user_message"]["text"]);
        println!("bot: {}", exchange["reply"]["text"]);
    }

    let transcript: serde_json::Value = client
        .get(format!("{}/sessions/{}", base_url, session_id))
        .send()
        .await?
        .json()
        .await?;
    println!("\nTranscript:\n{}", serde_json::to_string_pretty(&transcript["messages"])?);

    Ok(())
}
