use mock_server::MockSchema;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let schema = match std::env::var("MOCK_SCHEMA").as_deref() {
        Ok("legacy") => MockSchema::legacy(),
        _ => MockSchema::modern(),
    };
    let autoconfirm = std::env::var("MOCK_AUTOCONFIRM").as_deref() == Ok("1");
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}");
    mock_server::run(listener, schema.with_autoconfirm(autoconfirm)).await
}
