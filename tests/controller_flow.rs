//! Session controller behavior against the scripted mock backend.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_backend::ChatBackend;
use chat_backend_mock::{record, summary, MockBackend};
use imsg_tui::app::App;
use imsg_tui::contacts::ContactDirectory;
use imsg_tui::lock_unpoisoned;
use imsg_tui::runtime::{Presenter, RuntimeController, ShutdownSignal};

use support::{wait_until, CountingPresenter};

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    app: Arc<Mutex<App>>,
    backend: Arc<MockBackend>,
    controller: Arc<RuntimeController>,
    shutdown: ShutdownSignal,
}

fn start_harness(backend: MockBackend, contacts: ContactDirectory) -> Harness {
    let app = Arc::new(Mutex::new(App::new()));
    let backend = Arc::new(backend);
    let presenter = Arc::new(CountingPresenter::default());
    let shutdown = ShutdownSignal::new();

    let controller = RuntimeController::spawn(
        Arc::clone(&app),
        Arc::clone(&backend) as Arc<dyn ChatBackend>,
        Arc::new(contacts),
        presenter as Arc<dyn Presenter>,
        shutdown.clone(),
    );

    Harness {
        app,
        backend,
        controller,
        shutdown,
    }
}

impl Harness {
    fn stop(self) {
        self.shutdown.shutdown();
        self.controller.join();
    }

    fn roster_len(&self) -> usize {
        lock_unpoisoned(&self.app).sessions.len()
    }
}

fn two_chat_backend() -> MockBackend {
    MockBackend::new(vec![
        summary(1, "+15551234567", Some("Backend Alice"), "iMessage"),
        summary(2, "bob@example.com", None, "SMS"),
    ])
}

#[test]
fn refresh_builds_roster_with_directory_resolved_names() {
    let contacts =
        ContactDirectory::from_vcf_text("FN:Directory Alice\nTEL:+1 555 123 4567\nEND:VCARD\n");
    let harness = start_harness(two_chat_backend(), contacts);

    harness.controller.refresh_chats();
    assert!(wait_until(WAIT, || harness.roster_len() == 2));

    let app = lock_unpoisoned(&harness.app);
    assert_eq!(app.sessions[0].display_name, "Directory Alice");
    assert_eq!(app.sessions[1].display_name, "bob@example.com");
    assert_eq!(app.sessions[0].high_water_mark, 0);
    assert_eq!(app.sessions[0].unread, 0);
    drop(app);

    harness.stop();
}

#[test]
fn failed_refresh_keeps_the_previous_roster() {
    let harness = start_harness(two_chat_backend(), ContactDirectory::default());

    harness.controller.refresh_chats();
    assert!(wait_until(WAIT, || harness.roster_len() == 2));

    harness.backend.set_fail_queries(true);
    harness.controller.refresh_chats();
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(harness.roster_len(), 2);

    harness.stop();
}

#[test]
fn open_resets_unread_and_loads_history_asynchronously() {
    let backend = two_chat_backend();
    backend.queue_history(
        1,
        vec![
            record(3, "third", "2024-05-01T12:31:00Z", None, true),
            record(2, "second", "2024-05-01T12:30:00Z", Some("+15551234567"), false),
            record(1, "", "2024-05-01T12:29:00Z", None, false),
        ],
    );

    let harness = start_harness(backend, ContactDirectory::default());
    harness.controller.refresh_chats();
    assert!(wait_until(WAIT, || harness.roster_len() == 2));

    lock_unpoisoned(&harness.app).sessions[0].unread = 5;
    harness.controller.open_selected();

    {
        let app = lock_unpoisoned(&harness.app);
        assert_eq!(app.active, Some(0));
        assert_eq!(app.sessions[0].unread, 0);
    }

    assert!(wait_until(WAIT, || {
        lock_unpoisoned(&harness.app).sessions[0].high_water_mark == 3
    }));

    let app = lock_unpoisoned(&harness.app);
    let texts: Vec<String> = app.sessions[0]
        .messages
        .iter()
        .map(|message| message.text.clone())
        .collect();
    // The empty-text row advanced the mark but never became visible.
    assert_eq!(texts, ["second", "third"]);
    assert_eq!(app.sessions[0].messages[0].sender, "+15551234567");
    assert_eq!(app.sessions[0].messages[1].sender, "me");
    drop(app);

    harness.stop();
}

#[test]
fn send_targets_the_active_session_and_trims_text() {
    let harness = start_harness(two_chat_backend(), ContactDirectory::default());
    harness.controller.refresh_chats();
    assert!(wait_until(WAIT, || harness.roster_len() == 2));

    // No active session: nothing is dispatched.
    harness.controller.send_message("dropped");
    std::thread::sleep(Duration::from_millis(50));
    assert!(harness.backend.sent_messages().is_empty());

    harness.controller.select_next();
    harness.controller.open_selected();
    harness.controller.send_message("  hello bob  ");
    harness.controller.send_message("   ");

    assert!(wait_until(WAIT, || !harness.backend.sent_messages().is_empty()));
    assert_eq!(
        harness.backend.sent_messages(),
        vec![("bob@example.com".to_string(), "hello bob".to_string())]
    );

    harness.stop();
}

#[test]
fn send_without_routable_identifier_is_a_noop() {
    let backend = MockBackend::new(vec![summary(1, "", Some("Nameless"), "iMessage")]);
    let harness = start_harness(backend, ContactDirectory::default());

    harness.controller.refresh_chats();
    assert!(wait_until(WAIT, || harness.roster_len() == 1));

    harness.controller.open_selected();
    harness.controller.send_message("undeliverable");
    std::thread::sleep(Duration::from_millis(100));

    assert!(harness.backend.sent_messages().is_empty());

    harness.stop();
}

#[test]
fn sent_text_is_not_appended_optimistically() {
    let harness = start_harness(two_chat_backend(), ContactDirectory::default());
    harness.controller.refresh_chats();
    assert!(wait_until(WAIT, || harness.roster_len() == 2));

    harness.controller.open_selected();
    harness.controller.send_message("on its way");
    assert!(wait_until(WAIT, || !harness.backend.sent_messages().is_empty()));

    let app = lock_unpoisoned(&harness.app);
    assert!(app.sessions[0].messages.is_empty());
    drop(app);

    harness.stop();
}

#[test]
fn quit_marks_exit_and_trips_the_shared_shutdown_signal() {
    let harness = start_harness(two_chat_backend(), ContactDirectory::default());

    harness.controller.quit();

    assert!(lock_unpoisoned(&harness.app).should_exit);
    assert!(!harness.shutdown.is_running());

    harness.controller.join();
}

#[test]
fn actions_enqueued_after_join_are_ignored() {
    let harness = start_harness(two_chat_backend(), ContactDirectory::default());

    harness.shutdown.shutdown();
    harness.controller.join();

    // The channel is closed; this must neither panic nor mutate state.
    harness.controller.refresh_chats();
    assert_eq!(harness.roster_len(), 0);
}
