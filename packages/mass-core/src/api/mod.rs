//! Typed command API.
//!
//! [`MassApi`] wraps a shared [`MassClient`] with one method per server
//! command. Every method waits for readiness (with the configured ready
//! timeout) before it writes, so callers can issue commands right after
//! `connect`.
//!
//! Player and queue controls are fire-and-forget. Queries are generic over
//! the caller's item type: payloads are decoded with `serde` into whatever
//! DTO the application defines.

mod args;
mod types;

pub use args::ArgsBuilder;
pub use types::{LibraryQuery, MediaType, PlayMedia, QueueOption, RepeatMode};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::MassClient;
use crate::error::{ClientError, ClientResult};

// ─────────────────────────────────────────────────────────────────────────────
// Command paths
// ─────────────────────────────────────────────────────────────────────────────

pub mod commands {
    pub const PLAYERS_ALL: &str = "players/all";
    pub const PLAYER_PLAY_PAUSE: &str = "players/cmd/play_pause";
    pub const PLAYER_STOP: &str = "players/cmd/stop";
    pub const PLAYER_NEXT: &str = "players/cmd/next";
    pub const PLAYER_PREVIOUS: &str = "players/cmd/previous";
    pub const PLAYER_SEEK: &str = "players/cmd/seek";
    pub const PLAYER_POWER: &str = "players/cmd/power";
    pub const PLAYER_VOLUME_SET: &str = "players/cmd/volume_set";

    pub const QUEUES_ALL: &str = "player_queues/all";
    pub const QUEUE_ITEMS: &str = "player_queues/items";
    pub const QUEUE_SHUFFLE: &str = "player_queues/shuffle";
    pub const QUEUE_REPEAT: &str = "player_queues/repeat";
    pub const QUEUE_PLAY_INDEX: &str = "player_queues/play_index";
    pub const QUEUE_CLEAR: &str = "player_queues/clear";
    pub const QUEUE_PLAY_MEDIA: &str = "player_queues/play_media";

    pub const LIBRARY_TRACKS: &str = "music/tracks/library_items";
    pub const LIBRARY_ARTISTS: &str = "music/artists/library_items";
    pub const LIBRARY_ALBUMS: &str = "music/albums/library_items";
    pub const RECENTLY_PLAYED: &str = "music/recently_played_items";
    pub const SYNC_TASKS: &str = "music/synctasks";

    pub const CORE_CONFIG_VALUE: &str = "config/core/get_value";
}

/// Typed commands over a shared client.
#[derive(Clone)]
pub struct MassApi {
    client: Arc<MassClient>,
}

impl MassApi {
    pub fn new(client: Arc<MassClient>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<MassClient> {
        &self.client
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Player controls
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn play_pause(&self, player_id: &str) -> ClientResult<()> {
        self.fire(commands::PLAYER_PLAY_PAUSE, player(player_id)).await
    }

    pub async fn stop(&self, player_id: &str) -> ClientResult<()> {
        self.fire(commands::PLAYER_STOP, player(player_id)).await
    }

    pub async fn next(&self, player_id: &str) -> ClientResult<()> {
        self.fire(commands::PLAYER_NEXT, player(player_id)).await
    }

    pub async fn previous(&self, player_id: &str) -> ClientResult<()> {
        self.fire(commands::PLAYER_PREVIOUS, player(player_id)).await
    }

    /// Seeks to `position_secs` in the current track.
    pub async fn seek(&self, player_id: &str, position_secs: u32) -> ClientResult<()> {
        let args = player(player_id).with("position", position_secs);
        self.fire(commands::PLAYER_SEEK, args).await
    }

    pub async fn power(&self, player_id: &str, powered: bool) -> ClientResult<()> {
        let args = player(player_id).with("powered", powered);
        self.fire(commands::PLAYER_POWER, args).await
    }

    /// Sets the volume (0-100).
    pub async fn volume_set(&self, player_id: &str, level: u8) -> ClientResult<()> {
        let args = player(player_id).with("volume_level", level.min(100));
        self.fire(commands::PLAYER_VOLUME_SET, args).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queue controls
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn queue_shuffle(&self, queue_id: &str, enabled: bool) -> ClientResult<()> {
        let args = queue(queue_id).with("shuffle_enabled", enabled);
        self.fire(commands::QUEUE_SHUFFLE, args).await
    }

    pub async fn queue_repeat(&self, queue_id: &str, mode: RepeatMode) -> ClientResult<()> {
        let args = queue(queue_id).with("repeat_mode", mode);
        self.fire(commands::QUEUE_REPEAT, args).await
    }

    pub async fn queue_play_index(&self, queue_id: &str, index: u32) -> ClientResult<()> {
        let args = queue(queue_id).with("index", index);
        self.fire(commands::QUEUE_PLAY_INDEX, args).await
    }

    pub async fn queue_clear(&self, queue_id: &str) -> ClientResult<()> {
        self.fire(commands::QUEUE_CLEAR, queue(queue_id)).await
    }

    /// Plays or enqueues media on a queue.
    pub async fn play_media(&self, queue_id: &str, request: &PlayMedia) -> ClientResult<()> {
        let args = queue(queue_id)
            .with("media", &request.media)
            .with("option", request.option)
            .with("radio_mode", request.radio_mode)
            .with("start_item", &request.start_item);
        self.fire(commands::QUEUE_PLAY_MEDIA, args).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn all_players<T: DeserializeOwned>(&self) -> ClientResult<Vec<T>> {
        self.list(commands::PLAYERS_ALL, ArgsBuilder::new()).await
    }

    pub async fn all_player_queues<T: DeserializeOwned>(&self) -> ClientResult<Vec<T>> {
        self.list(commands::QUEUES_ALL, ArgsBuilder::new()).await
    }

    pub async fn queue_items<T: DeserializeOwned>(
        &self,
        queue_id: &str,
        limit: u32,
        offset: u32,
    ) -> ClientResult<Vec<T>> {
        let args = queue(queue_id).with("limit", limit).with("offset", offset);
        self.list(commands::QUEUE_ITEMS, args).await
    }

    pub async fn library_tracks<T: DeserializeOwned>(
        &self,
        query: &LibraryQuery,
    ) -> ClientResult<Vec<T>> {
        self.list(commands::LIBRARY_TRACKS, library(query)).await
    }

    pub async fn library_artists<T: DeserializeOwned>(
        &self,
        query: &LibraryQuery,
    ) -> ClientResult<Vec<T>> {
        self.list(commands::LIBRARY_ARTISTS, library(query)).await
    }

    pub async fn library_albums<T: DeserializeOwned>(
        &self,
        query: &LibraryQuery,
    ) -> ClientResult<Vec<T>> {
        self.list(commands::LIBRARY_ALBUMS, library(query)).await
    }

    /// Recently played items, optionally restricted to some media types.
    pub async fn recently_played_items<T: DeserializeOwned>(
        &self,
        limit: u32,
        media_types: Option<&[MediaType]>,
    ) -> ClientResult<Vec<T>> {
        let args = ArgsBuilder::new()
            .with("limit", limit)
            .with_if_some("media_types", media_types);
        self.list(commands::RECENTLY_PLAYED, args).await
    }

    /// Running library sync tasks, passed through undecoded.
    pub async fn library_sync_status(&self) -> ClientResult<Option<Value>> {
        self.query(commands::SYNC_TASKS, ArgsBuilder::new()).await
    }

    /// One core configuration value, e.g. `("player_queues", "<key>")`.
    pub async fn core_config_value(&self, domain: &str, key: &str) -> ClientResult<Option<Value>> {
        let args = ArgsBuilder::new().with("domain", domain).with("key", key);
        self.query(commands::CORE_CONFIG_VALUE, args).await
    }

    /// Resolves an image reference against the connected server.
    ///
    /// Returns `None` for a blank path, or when no handshake has been seen
    /// yet and the path needs the server's image proxy.
    #[must_use]
    pub fn image_url(&self, path: &str, provider: &str, remotely_accessible: bool) -> Option<String> {
        let endpoint = self
            .client
            .server_info()
            .and_then(|info| info.endpoint().ok());
        match endpoint {
            Some(endpoint) => endpoint.resolve_image_url(path, provider, remotely_accessible),
            None if remotely_accessible && path.starts_with("http") => Some(path.to_string()),
            None => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    async fn fire(&self, command: &str, args: ArgsBuilder) -> ClientResult<()> {
        let args = args.build()?;
        self.client.await_ready_default().await?;
        self.client.send_command(command, args).await?;
        Ok(())
    }

    async fn query(&self, command: &str, args: ArgsBuilder) -> ClientResult<Option<Value>> {
        let args = args.build()?;
        self.client.await_ready_default().await?;
        self.client
            .send_command_with_default_timeout(command, args)
            .await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        command: &str,
        args: ArgsBuilder,
    ) -> ClientResult<Vec<T>> {
        match self.query(command, args).await? {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                log::warn!("[Api] Could not decode {} result: {}", command, e);
                ClientError::ProtocolDecode(format!("{command}: {e}"))
            }),
        }
    }
}

fn player(player_id: &str) -> ArgsBuilder {
    ArgsBuilder::new().with("player_id", player_id)
}

fn queue(queue_id: &str) -> ArgsBuilder {
    ArgsBuilder::new().with("queue_id", queue_id)
}

fn library(query: &LibraryQuery) -> ArgsBuilder {
    ArgsBuilder::new()
        .with("favorite", query.favorite)
        .with("search", &query.search)
        .with("limit", query.limit)
        .with("offset", query.offset)
        .with("order_by", &query.order_by)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::transport::memory::{MemoryPeer, MemoryTransport};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Player {
        player_id: String,
        name: String,
    }

    fn handshake() -> Value {
        json!({
            "server_id": "s1",
            "server_version": "2.0",
            "schema_version": 25,
            "base_url": "http://h:8095",
            "onboard_done": true
        })
    }

    async fn setup() -> (MassApi, MemoryPeer) {
        let (transport, mut listener) = MemoryTransport::new();
        let client = MassClient::new(Arc::new(transport), ClientConfig::default()).unwrap();
        let api = MassApi::new(Arc::new(client));
        api.client().connect("http://h:8095").await.unwrap();
        let peer = listener.accept().await.unwrap();
        (api, peer)
    }

    async fn ready() -> (MassApi, MemoryPeer) {
        let (api, peer) = setup().await;
        peer.send_json(&handshake());
        api.client().await_ready_default().await.unwrap();
        (api, peer)
    }

    /// Answers the next request with `result` and returns the request frame.
    async fn answer(peer: &mut MemoryPeer, result: Value) -> Value {
        let frame = peer.recv_json().await.unwrap();
        peer.send_json(&json!({"message_id": frame["message_id"], "result": result}));
        frame
    }

    #[tokio::test]
    async fn commands_wait_for_readiness() {
        let (api, mut peer) = setup().await;
        let call = {
            let api = api.clone();
            tokio::spawn(async move { api.play_pause("p1").await })
        };

        assert!(tokio::time::timeout(Duration::from_millis(20), peer.recv())
            .await
            .is_err());

        peer.send_json(&handshake());
        let frame = peer.recv_json().await.unwrap();
        assert_eq!(frame["command"], "players/cmd/play_pause");
        assert_eq!(frame["args"], json!({"player_id": "p1"}));
        call.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn player_and_queue_argument_shapes() {
        let (api, mut peer) = ready().await;

        api.volume_set("p1", 150).await.unwrap();
        api.seek("p1", 42).await.unwrap();
        api.queue_repeat("q1", RepeatMode::All).await.unwrap();
        api.queue_shuffle("q1", true).await.unwrap();

        let volume = peer.recv_json().await.unwrap();
        assert_eq!(volume["args"], json!({"player_id": "p1", "volume_level": 100}));
        let seek = peer.recv_json().await.unwrap();
        assert_eq!(seek["args"], json!({"player_id": "p1", "position": 42}));
        let repeat = peer.recv_json().await.unwrap();
        assert_eq!(repeat["args"], json!({"queue_id": "q1", "repeat_mode": "all"}));
        let shuffle = peer.recv_json().await.unwrap();
        assert_eq!(shuffle["command"], "player_queues/shuffle");
        assert_eq!(api.client().pending_requests(), 0);
    }

    #[tokio::test]
    async fn play_media_sends_explicit_nulls() {
        let (api, mut peer) = ready().await;
        let request = PlayMedia::new(["library://album/7"]).option(QueueOption::ReplaceNext);
        api.play_media("q1", &request).await.unwrap();

        let frame = peer.recv_json().await.unwrap();
        assert_eq!(
            frame["args"],
            json!({
                "queue_id": "q1",
                "media": ["library://album/7"],
                "option": "replace_next",
                "radio_mode": null,
                "start_item": null
            })
        );
    }

    #[tokio::test]
    async fn list_queries_decode_into_caller_types() {
        let (api, mut peer) = ready().await;
        let call = {
            let api = api.clone();
            tokio::spawn(async move { api.all_players::<Player>().await })
        };
        let frame = answer(
            &mut peer,
            json!([{"player_id": "p1", "name": "Kitchen", "available": true}]),
        )
        .await;
        assert_eq!(frame["command"], "players/all");
        assert_eq!(frame["args"], Value::Null);

        let players = call.await.unwrap().unwrap();
        assert_eq!(
            players,
            vec![Player {
                player_id: "p1".into(),
                name: "Kitchen".into()
            }]
        );
    }

    #[tokio::test]
    async fn library_query_sends_every_filter() {
        let (api, mut peer) = ready().await;
        let call = {
            let api = api.clone();
            tokio::spawn(async move {
                let query = LibraryQuery::new().search("blue").page(50, 0);
                api.library_albums::<Value>(&query).await
            })
        };
        let frame = answer(&mut peer, Value::Null).await;
        assert_eq!(frame["command"], "music/albums/library_items");
        assert_eq!(
            frame["args"],
            json!({"favorite": null, "search": "blue", "limit": 50, "offset": 0, "order_by": null})
        );
        assert!(call.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recently_played_includes_media_types_only_when_given() {
        let (api, mut peer) = ready().await;
        let call = {
            let api = api.clone();
            tokio::spawn(async move {
                api.recently_played_items::<Value>(10, Some(&[MediaType::Track, MediaType::Radio]))
                    .await
            })
        };
        let frame = answer(&mut peer, json!([])).await;
        assert_eq!(
            frame["args"],
            json!({"limit": 10, "media_types": ["track", "radio"]})
        );
        call.await.unwrap().unwrap();

        let call = {
            let api = api.clone();
            tokio::spawn(async move { api.recently_played_items::<Value>(5, None).await })
        };
        let frame = answer(&mut peer, json!([])).await;
        assert_eq!(frame["args"], json!({"limit": 5}));
        call.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn undecodable_result_is_a_decode_error() {
        let (api, mut peer) = ready().await;
        let call = {
            let api = api.clone();
            tokio::spawn(async move { api.all_player_queues::<Player>().await })
        };
        answer(&mut peer, json!({"not": "a list"})).await;
        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::ProtocolDecode(_)));
        // The connection itself is unaffected.
        assert!(api.client().state().is_connected());
    }

    #[tokio::test]
    async fn core_config_value_passes_result_through() {
        let (api, mut peer) = ready().await;
        let call = {
            let api = api.clone();
            tokio::spawn(async move { api.core_config_value("player_queues", "crossfade").await })
        };
        let frame = answer(&mut peer, json!(true)).await;
        assert_eq!(frame["command"], "config/core/get_value");
        assert_eq!(frame["args"], json!({"domain": "player_queues", "key": "crossfade"}));
        assert_eq!(call.await.unwrap().unwrap(), Some(json!(true)));
    }

    #[tokio::test]
    async fn image_urls_use_the_handshake_base_url() {
        let (api, _peer) = setup().await;
        assert_eq!(api.image_url("/art/1.jpg", "filesystem", false), None);
        assert_eq!(
            api.image_url("https://cdn.example/a.jpg", "spotify", true).as_deref(),
            Some("https://cdn.example/a.jpg")
        );

        let (api, _peer) = ready().await;
        assert_eq!(
            api.image_url("/art/1.jpg", "filesystem", false).as_deref(),
            Some("http://h:8095/imageproxy?path=%2Fart%2F1.jpg&provider=filesystem")
        );
        assert_eq!(api.image_url("", "filesystem", false), None);
    }
}
