use std::io::{self, BufRead};
use std::sync::{mpsc, Arc, Mutex};

use chat_backend::ChatBackend;
use chat_backend_imsg::ImsgCli;
use chat_backend_mock::MockBackend;

use imsg_tui::app::App;
use imsg_tui::commands::{parse_slash_command, SlashCommand};
use imsg_tui::config::{BackendKind, Config};
use imsg_tui::contacts::ContactDirectory;
use imsg_tui::lock_unpoisoned;
use imsg_tui::runtime::{Presenter, RuntimeController, ShutdownSignal};
use imsg_tui::sync::SyncEngine;
use imsg_tui::tui::{spawn_render_thread, ChannelPresenter};

const HELP_TEXT: &str =
    "Commands: /help, /up, /down, /open, /close, /refresh, /quit; anything else is sent to the open chat";

fn main() -> io::Result<()> {
    let config = Config::from_env();

    let contacts = Arc::new(ContactDirectory::load(config.vcf_path.as_deref()));
    let backend: Arc<dyn ChatBackend> = match config.backend {
        BackendKind::Mock => Arc::new(MockBackend::with_demo_roster()),
        BackendKind::Imsg => {
            Arc::new(ImsgCli::new(&config.imsg_bin).with_timeout(config.call_timeout))
        }
    };

    let app = Arc::new(Mutex::new(App::new()));
    let shutdown = ShutdownSignal::new();

    let (redraw_sender, redraw_receiver) = mpsc::channel();
    let presenter: Arc<dyn Presenter> = Arc::new(ChannelPresenter::new(redraw_sender));
    let render = spawn_render_thread(Arc::clone(&app), redraw_receiver)?;

    let controller = RuntimeController::spawn(
        Arc::clone(&app),
        Arc::clone(&backend),
        Arc::clone(&contacts),
        Arc::clone(&presenter),
        shutdown.clone(),
    );

    controller.refresh_chats();

    let poller = SyncEngine::new(
        Arc::clone(&app),
        backend,
        contacts,
        Arc::clone(&presenter),
        shutdown.clone(),
        config.poll_interval,
    )
    .spawn()?;

    for line in io::stdin().lock().lines() {
        let line = line?;

        match parse_slash_command(&line) {
            Some(SlashCommand::Help) => println!("{HELP_TEXT}"),
            Some(SlashCommand::Up) => controller.select_previous(),
            Some(SlashCommand::Down) => controller.select_next(),
            Some(SlashCommand::Open) => controller.open_selected(),
            Some(SlashCommand::Close) => controller.close_active(),
            Some(SlashCommand::Refresh) => controller.refresh_chats(),
            Some(SlashCommand::Quit) => controller.quit(),
            Some(SlashCommand::Unknown(command)) => println!("Unknown command: {command}"),
            None => controller.send_message(&line),
        }

        if lock_unpoisoned(&app).should_exit {
            break;
        }
    }

    shutdown.shutdown();
    controller.join();
    let _ = poller.join();

    drop(presenter);
    drop(controller);
    let _ = render.join();

    Ok(())
}
