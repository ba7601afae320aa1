//! Session flows against a real server bound to a loopback port.

use parley_client::{ApiClient, Attachment, ClientError, Session};
use parley_server::{serve_listener, AppState, ServerConfig};
use parley_shared::{MessageTarget, UserStatus};
use tempfile::TempDir;
use tokio::net::TcpListener;

struct TestServer {
    base_url: String,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            database_path: Some(dir.path().join("parley.db")),
            blob_storage_path: dir.path().join("blobs"),
            avatar_generator_url: None,
            rate_limit_burst: 10_000.0,
            ..ServerConfig::default()
        };
        let state = AppState::from_config(config).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_listener(state, listener));

        Self {
            base_url: format!("http://{addr}"),
            _dir: dir,
        }
    }

    fn session(&self) -> Session {
        Session::new(ApiClient::new(self.base_url.clone()))
    }

    async fn logged_in(&self, name: &str) -> Session {
        let mut session = self.session();
        session.login(name).await.unwrap();
        session
    }
}

#[tokio::test]
async fn login_creates_then_finds_the_user() {
    let server = TestServer::start().await;

    let mut first = server.session();
    let created = first.login("  alice ").await.unwrap();
    assert_eq!(created.name, "alice");
    assert_eq!(created.status, UserStatus::Online);
    assert!(created.profile_image.is_some());

    first.logout().await.unwrap();

    let mut second = server.session();
    let found = second.login("alice").await.unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.status, UserStatus::Online);
    assert_eq!(second.store().users().len(), 1);
}

#[tokio::test]
async fn channel_messages_and_attachments() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;

    let channel = alice.create_channel("general").await.unwrap();
    assert!(alice.open_channel(channel.id).await.unwrap().is_empty());

    let text = alice.send("hello", None).await.unwrap();
    assert_eq!(text.user, "alice");
    assert_eq!(text.content, "hello");

    let notes = Attachment {
        name: "notes.txt".into(),
        mime_type: "text/plain".into(),
        data: b"remember the milk".to_vec(),
    };
    let with_file = alice.send("", Some(&notes)).await.unwrap();
    let file = with_file.file.clone().unwrap();
    assert_eq!(file.name, "notes.txt");
    assert_eq!(file.mime_type, "text/plain");

    let bytes = alice.api().download(&file.url).await.unwrap();
    assert_eq!(bytes, b"remember the milk");

    let history = alice.open_channel(channel.id).await.unwrap();
    let ids: Vec<_> = history.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![text.id, with_file.id]);

    let err = alice.send("   ", None).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
}

#[tokio::test]
async fn both_sides_of_a_dm_share_one_channel() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;
    let mut bob = server.logged_in("bob").await;
    let alice_id = alice.me().unwrap().id;
    let bob_id = bob.me().unwrap().id;

    let from_alice = alice.open_dm(bob_id).await.unwrap();
    assert_eq!(from_alice.user_name, "bob");
    alice.send("hi bob", None).await.unwrap();

    let from_bob = bob.open_dm(alice_id).await.unwrap();
    assert_eq!(from_bob.id, from_alice.id);
    assert_eq!(from_bob.user_name, "alice");
    let history = bob.store().messages(&MessageTarget::Channel(from_bob.id));
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "hi bob");

    bob.refresh().await.unwrap();
    assert_eq!(bob.store().dm_pairs().len(), 1);
    assert_eq!(bob.store().dm_pairs()[0].user_name, "alice");
}

#[tokio::test]
async fn reactions_toggle_on_the_server_and_in_the_cache() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;
    let channel = alice.create_channel("general").await.unwrap();
    alice.open_channel(channel.id).await.unwrap();
    let message = alice.send("react to me", None).await.unwrap();

    assert!(alice.toggle_reaction(message.id, "👍").await.unwrap());
    assert_eq!(alice.store().message(message.id).unwrap().reactions, vec!["👍"]);

    assert!(!alice.toggle_reaction(message.id, "👍").await.unwrap());
    assert!(alice.store().message(message.id).unwrap().reactions.is_empty());

    // the server agrees with the cache
    let reloaded = alice.open_channel(channel.id).await.unwrap();
    assert!(reloaded[0].reactions.is_empty());
}

#[tokio::test]
async fn thread_replies_bump_the_reply_count() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;
    let channel = alice.create_channel("general").await.unwrap();
    alice.open_channel(channel.id).await.unwrap();
    let root = alice.send("root", None).await.unwrap();

    assert!(alice.open_thread(root.id).await.unwrap().is_empty());
    alice.reply(root.id, "first", None).await.unwrap();
    alice.reply(root.id, "second", None).await.unwrap();

    let contents: Vec<_> = alice
        .store()
        .replies(root.id)
        .iter()
        .map(|r| r.content.as_str())
        .collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert_eq!(alice.store().message(root.id).unwrap().reply_count, 2);

    let reloaded = alice.open_channel(channel.id).await.unwrap();
    assert_eq!(reloaded[0].reply_count, 2);
}

#[tokio::test]
async fn avatar_chat_marks_the_user_active() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;

    let target = alice.open_avatar("celtic").await.unwrap();
    let me = alice.me().unwrap();
    assert_eq!(
        target,
        MessageTarget::Avatar(format!("celtic_{}", me.id))
    );
    assert_eq!(me.status, UserStatus::Active);
    assert_eq!(me.status_message, "Chatting with celtic");

    alice.send("tell me a story", None).await.unwrap();
    assert_eq!(alice.store().messages(&target).len(), 1);
}

#[tokio::test]
async fn leaving_an_avatar_chat_restores_online() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;
    let mut bob = server.logged_in("bob").await;
    let general = alice.create_channel("general").await.unwrap();

    alice.open_avatar("celtic").await.unwrap();
    assert_eq!(alice.me().unwrap().status, UserStatus::Active);

    alice.open_channel(general.id).await.unwrap();
    let me = alice.me().unwrap();
    assert_eq!(me.status, UserStatus::Online);
    assert_eq!(me.status_message, "");

    // other sessions see the reset too
    bob.refresh().await.unwrap();
    let seen = bob.store().user_by_name("alice").unwrap();
    assert_eq!(seen.status, UserStatus::Online);
    assert_eq!(seen.status_message, "");

    // a DM also counts as leaving
    alice.open_avatar("celtic").await.unwrap();
    alice.open_dm(bob.me().unwrap().id).await.unwrap();
    assert_eq!(alice.me().unwrap().status, UserStatus::Online);
}

#[tokio::test]
async fn search_and_locate_cover_loaded_conversations() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;

    let general = alice.create_channel("general").await.unwrap();
    alice.open_channel(general.id).await.unwrap();
    let hit = alice.send("Deploy at noon", None).await.unwrap();
    alice.send("lunch?", None).await.unwrap();

    let random = alice.create_channel("random").await.unwrap();
    alice.open_channel(random.id).await.unwrap();
    let other = alice.send("deployment went fine", None).await.unwrap();

    let ids: Vec<_> = alice
        .search("DEPLOY")
        .into_iter()
        .map(|h| h.message.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&hit.id) && ids.contains(&other.id));
    assert!(alice.search("  ").is_empty());

    assert_eq!(
        alice.locate(hit.id),
        Some(&MessageTarget::Channel(general.id))
    );
}

#[tokio::test]
async fn logout_clears_the_cache_and_goes_offline() {
    let server = TestServer::start().await;
    let mut alice = server.logged_in("alice").await;
    let channel = alice.create_channel("general").await.unwrap();
    alice.open_channel(channel.id).await.unwrap();
    alice.send("bye", None).await.unwrap();

    alice.logout().await.unwrap();
    assert!(alice.me().is_none());
    assert!(alice.current().is_none());
    assert!(alice.store().channels().is_empty());
    assert!(alice
        .store()
        .messages(&MessageTarget::Channel(channel.id))
        .is_empty());

    let bob = server.logged_in("bob").await;
    let seen = bob.store().user_by_name("alice").unwrap();
    assert_eq!(seen.status, UserStatus::Offline);
}
