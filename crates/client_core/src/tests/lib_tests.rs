use super::*;
use shared::domain::{GameId, PlayerId};

#[test]
fn websocket_url_maps_schemes() {
    assert_eq!(
        websocket_url("http://localhost:8080").unwrap(),
        "ws://localhost:8080/ws"
    );
    assert_eq!(
        websocket_url("https://game.example.com/").unwrap(),
        "wss://game.example.com/ws"
    );
    assert!(matches!(
        websocket_url("ftp://nope"),
        Err(ClientError::InvalidServerUrl)
    ));
}

fn test_client() -> (GameClient, mpsc::Receiver<ClientCommand>) {
    let store = Arc::new(Mutex::new(GameStateStore::default()));
    let (events, _) = broadcast::channel(16);
    let (outbound, outbound_rx) = mpsc::channel(16);
    (GameClient::from_parts(store, events, outbound), outbound_rx)
}

#[tokio::test]
async fn commands_are_gated_until_joined() {
    let (client, mut rx) = test_client();

    let err = client.send(ClientCommand::RollDice).await.unwrap_err();
    assert!(matches!(err, ClientError::NotJoined));

    client
        .send(ClientCommand::CreateGame {
            player_name: "alice".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(
        rx.recv().await,
        Some(ClientCommand::CreateGame { .. })
    ));

    {
        client
            .store()
            .lock()
            .await
            .set_session(GameId(1), PlayerId(1));
    }
    client.send(ClientCommand::RollDice).await.unwrap();
    assert!(matches!(rx.recv().await, Some(ClientCommand::RollDice)));
}

#[tokio::test]
async fn closed_outbound_reports_transport_closed() {
    let (client, rx) = test_client();
    drop(rx);

    let err = client
        .send(ClientCommand::JoinGame {
            game_id: GameId(1),
            player_name: "bob".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TransportClosed));
}
