//! Full lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on an OS-assigned port, then drives every client
//! operation over real HTTP through the production `UreqTransport`: auth
//! exchanges, profile upsert, the inventory fallback chains against both
//! schema revisions, action logs, and session restore from disk.

use mock_server::MockSchema;
use stockroom_core::{ApiError, ItemPatch, NewItem, Registration, SessionStore, SupabaseClient};

fn start_server(schema: MockSchema) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, schema).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str) -> SupabaseClient {
    SupabaseClient::new(base_url, "integration-test-key").unwrap()
}

fn registration(email: &str) -> Registration {
    Registration {
        username: "drickoi".to_string(),
        password: "hunter2".to_string(),
        name: "Drick Oi".to_string(),
        age: 27,
        address: "1 Main St".to_string(),
        email: email.to_string(),
        phone: "555-0100".to_string(),
    }
}

fn new_item(name: &str, quantity: i64) -> NewItem {
    NewItem {
        item_name: name.to_string(),
        category: "Kitchen".to_string(),
        quantity,
        price: 19.5,
        date_added: "2024-05-01".to_string(),
        date_updated: "2024-05-01".to_string(),
    }
}

#[test]
fn modern_schema_lifecycle() {
    let base_url = start_server(MockSchema::modern());
    let client = client(&base_url);

    // Step 1: sign-up awaits e-mail verification — a session without tokens.
    let pending = client.sign_up("owner@example.com", "hunter2").unwrap();
    assert!(!pending.user_id.is_empty());
    assert_eq!(pending.access_token, "");
    assert!(!pending.is_authenticated());

    // Step 2: sign in for a usable session.
    let session = client.sign_in("owner@example.com", "hunter2").unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.user_id, pending.user_id);
    assert_eq!(session.email, "owner@example.com");

    // Step 3: wrong password is a request failure, not a transport one.
    let err = client.sign_in("owner@example.com", "wrong").unwrap_err();
    assert!(matches!(err, ApiError::Request { status: 400, .. }));

    // Step 4: profile upsert, twice — the merge preference makes the second
    // write an update instead of a conflict.
    let reg = registration("owner@example.com");
    client.upsert_profile(&session, &reg).unwrap();
    client.upsert_profile(&session, &reg).unwrap();

    // Step 5: inserts land on the first payload shape here.
    client.insert_inventory_item(&session, &new_item("Teapot", 3)).unwrap();
    client.insert_inventory_item(&session, &new_item("Kettle", 1)).unwrap();

    // Step 6: list comes back newest first with the domain date columns.
    let rows = client.fetch_inventory(&session).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].item_name, "Kettle");
    assert_eq!(rows[1].item_name, "Teapot");
    assert_eq!(rows[1].quantity, 3);
    assert_eq!(rows[1].category, "Kitchen");
    assert_eq!(rows[1].date_added, "2024-05-01");

    // Step 7: rename in place while bumping the quantity.
    let patch = ItemPatch {
        item_name: "Tea Pot".to_string(),
        category: "Kitchen".to_string(),
        quantity: 5,
        price: 21.0,
        date_updated: "2024-06-01".to_string(),
    };
    client
        .update_inventory_item_by_name(&session, "Teapot", &patch)
        .unwrap();
    let rows = client.fetch_inventory(&session).unwrap();
    let renamed = rows.iter().find(|r| r.item_name == "Tea Pot").unwrap();
    assert_eq!(renamed.quantity, 5);
    assert!(!rows.iter().any(|r| r.item_name == "Teapot"));

    // Step 8: delete by (current) name.
    client.delete_inventory_item_by_name(&session, "Tea Pot").unwrap();
    let rows = client.fetch_inventory(&session).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item_name, "Kettle");

    // Step 9: action log, newest first.
    client.log_action(&session, "login", "User logged in.").unwrap();
    client.log_action(&session, "inventory_delete", "Removed Tea Pot").unwrap();
    let logs = client.fetch_action_logs(&session).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_type, "inventory_delete");
    assert_eq!(logs[1].action_type, "login");
    assert!(!logs[0].created_at.is_empty());

    // Step 10: refresh replaces the session wholesale.
    let refreshed = client.refresh_session(&session.refresh_token).unwrap();
    assert_eq!(refreshed.user_id, session.user_id);
    assert_ne!(refreshed.access_token, session.access_token);
    assert_ne!(refreshed.refresh_token, session.refresh_token);
}

#[test]
fn legacy_schema_is_absorbed_by_the_fallback_chains() {
    let base_url = start_server(MockSchema::legacy().with_autoconfirm(true));
    let client = client(&base_url);

    // Auto-confirmed sign-up means register() also writes the profile row.
    let session = client.register(&registration("legacy@example.com")).unwrap();
    assert!(session.is_authenticated());

    // The first five payload shapes all name a column this schema lacks;
    // the minimal qty shape finally lands. The caller sees only success.
    client.insert_inventory_item(&session, &new_item("Teapot", 7)).unwrap();

    // Reads degrade the same way, ending on the qty column list.
    let rows = client.fetch_inventory(&session).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item_name, "Teapot");
    assert_eq!(rows[0].quantity, 7, "quantity resolved through the qty alias");
    assert_eq!(rows[0].category, "Other", "no category column anywhere");
    assert!(!rows[0].date_added.is_empty(), "created_at stands in for date_added");

    // Updates walk their own chain down to the minimal qty patch.
    let patch = ItemPatch {
        item_name: "Tea Pot".to_string(),
        category: "Kitchen".to_string(),
        quantity: 9,
        price: 12.0,
        date_updated: "2024-06-01".to_string(),
    };
    client
        .update_inventory_item_by_name(&session, "Teapot", &patch)
        .unwrap();
    let rows = client.fetch_inventory(&session).unwrap();
    assert_eq!(rows[0].item_name, "Tea Pot");
    assert_eq!(rows[0].quantity, 9);

    // Delete needs no fallback on any revision.
    client.delete_inventory_item_by_name(&session, "Tea Pot").unwrap();
    assert!(client.fetch_inventory(&session).unwrap().is_empty());
}

#[test]
fn restore_session_refreshes_and_rotates_the_record() {
    let base_url = start_server(MockSchema::modern().with_autoconfirm(true));
    let client = client(&base_url);

    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.toml"));

    // Nothing persisted yet.
    assert!(client.restore_session(&store).unwrap().is_none());

    let session = client.register(&registration("restore@example.com")).unwrap();
    store.save(&session).unwrap();

    let restored = client.restore_session(&store).unwrap().unwrap();
    assert_eq!(restored.user_id, session.user_id);
    assert_ne!(restored.refresh_token, session.refresh_token);
    assert_eq!(store.load(), Some(restored.clone()));

    // The old refresh token was rotated out; replaying it fails and the
    // persisted record is left as-is for the caller to deal with.
    let err = client.refresh_session(&session.refresh_token).unwrap_err();
    assert!(matches!(err, ApiError::Request { status: 400, .. }));
    assert_eq!(store.load(), Some(restored));
}

#[test]
fn unreachable_backend_is_a_transport_failure() {
    // Nothing listens on this port; classification must not be Request.
    let client = client("http://127.0.0.1:9");
    let err = client.sign_in("a@example.com", "pw").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got: {err}");
}

#[test]
fn pending_verification_session_is_rejected_locally() {
    let base_url = start_server(MockSchema::modern());
    let client = client(&base_url);

    let pending = client.sign_up("pending@example.com", "pw").unwrap();
    let err = client.fetch_inventory(&pending).unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}
