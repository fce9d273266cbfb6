mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jarvis_axum::create_router;
use jarvis_core::ModelResponse;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use common::{FakeBackends, context};

const WAIT: Duration = Duration::from_secs(5);

async fn serve(backends: Arc<FakeBackends>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(context(backends));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws/audio")
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn speaks_model_text_and_relays_interrupt() {
    let backends = Arc::new(FakeBackends::new(vec![ModelResponse::text([
        "Bonjour le ",
        "monde.",
    ])]));
    let url = serve(Arc::clone(&backends)).await;

    let (mut client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client.send(Message::Binary(vec![0, 0, 1, 0])).await.unwrap();

    let spoken = tokio::time::timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(spoken, Message::Binary(b"Bonjour le monde.".to_vec()));

    client
        .send(Message::Text(r#"{"type": "interrupt"}"#.to_string()))
        .await
        .unwrap();
    let notice = tokio::time::timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(notice, Message::Text(r#"{"type":"interrupt"}"#.to_string()));

    let model = backends.opened().pop().unwrap();
    wait_until(|| !model.frames().is_empty()).await;
    assert_eq!(model.frames()[0].samples, vec![0, 1]);

    client.close(None).await.unwrap();
    wait_until(|| model.is_closed()).await;
}

#[tokio::test]
async fn each_connection_opens_its_own_model_session() {
    let backends = Arc::new(FakeBackends::new(Vec::new()));
    let url = serve(Arc::clone(&backends)).await;

    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_until(|| backends.opened().len() == 2).await;

    first.close(None).await.unwrap();
    let opened = backends.opened();
    wait_until(|| opened.iter().filter(|m| m.is_closed()).count() == 1).await;

    second.close(None).await.unwrap();
    wait_until(|| opened.iter().all(|m| m.is_closed())).await;
}

#[tokio::test]
async fn model_open_failure_closes_the_socket() {
    let backends = Arc::new(FakeBackends::failing());
    let url = serve(Arc::clone(&backends)).await;

    let (mut client, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let ended = tokio::time::timeout(WAIT, async {
        while let Some(message) = client.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(Message::Binary(_)) => panic!("no audio expected"),
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
    assert!(backends.opened().is_empty());
}
