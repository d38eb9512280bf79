use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use anyhow::Context;
use code_assistant::app::{App, SubmitOutcome};
use code_assistant::client::CompletionClient;
use code_assistant::commands::{parse_slash_command, SlashCommand};
use code_assistant::config::AssistantConfig;
use code_assistant::image::ImageUpload;
use code_assistant::logging::init_logging;
use code_assistant::providers::provider_for_config;
use code_assistant::runtime::{RuntimeController, Waker};
use code_assistant::view::{self, TranscriptView};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter as _};

const PROMPT: &str = "> ";
const BUSY_PROMPT: &str = "… ";

fn main() -> anyhow::Result<()> {
    let config = AssistantConfig::from_env().context("invalid configuration")?;
    init_logging(&config).context("failed to initialize logging")?;
    tracing::debug!(?config, "starting code assistant");

    let provider = provider_for_config(&config)?;
    let profile = provider.profile();
    let client = Arc::new(CompletionClient::new(
        provider,
        &config.model,
        config.chat,
        config.image,
    ));
    let app = Arc::new(Mutex::new(App::new(&config.system_prompt, config.admission)));
    let transcript = Arc::new(Mutex::new(TranscriptView::new()));

    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    let mut printer = editor
        .create_external_printer()
        .context("failed to create terminal printer")?;

    let (wake_tx, wake_rx) = mpsc::channel::<()>();
    let waker: Waker = Arc::new(move || {
        let _ = wake_tx.send(());
    });
    let controller = RuntimeController::new(Arc::clone(&app), client, waker);

    for line in view::render_header(&profile) {
        println!("{line}");
    }

    {
        let controller = Arc::clone(&controller);
        let app = Arc::clone(&app);
        let transcript = Arc::clone(&transcript);
        thread::Builder::new()
            .name("code-assistant-events".to_string())
            .spawn(move || {
                for () in wake_rx {
                    if controller.stop_requested() {
                        break;
                    }
                    controller.flush_pending_events();
                    let lines = {
                        let app = lock_unpoisoned(&app);
                        lock_unpoisoned(&transcript).updates(&app)
                    };
                    if !lines.is_empty() && printer.print(lines.join("\n")).is_err() {
                        break;
                    }
                }
            })
            .context("failed to spawn event thread")?;
    }

    let mut host = Arc::clone(&controller);
    loop {
        let prompt = if lock_unpoisoned(&app).is_busy() {
            BUSY_PROMPT
        } else {
            PROMPT
        };

        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                handle_line(line, &app, &mut host);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                lock_unpoisoned(&app).on_quit(&mut host);
            }
            Err(error) => return Err(error).context("failed to read input"),
        }

        let mut state = lock_unpoisoned(&app);
        if let Some(notice) = state.take_notice() {
            println!("{}", view::render_notice(&notice));
        }
        for line in lock_unpoisoned(&transcript).updates(&state) {
            println!("{line}");
        }
        if state.should_exit {
            break;
        }
    }

    Ok(())
}

fn handle_line(line: String, app: &Mutex<App>, host: &mut Arc<RuntimeController>) {
    let Some(command) = parse_slash_command(&line) else {
        let mut app = lock_unpoisoned(app);
        app.on_input_replace(line);
        log_outcome("chat", app.on_submit(host));
        return;
    };

    match command {
        SlashCommand::Help => println!("{}", view::dim(view::HELP_TEXT)),
        SlashCommand::Image(None) => println!("{}", view::yellow("Usage: /image <path>")),
        SlashCommand::Image(Some(path)) => match ImageUpload::from_path(&path) {
            Ok(upload) => {
                let outcome = lock_unpoisoned(app).on_image_selected(upload, host);
                log_outcome("image", outcome);
            }
            Err(error) => println!("{}", view::render_notice(&error.to_string())),
        },
        SlashCommand::Code => {
            for line in view::render_code_pane(&lock_unpoisoned(app).code) {
                println!("{line}");
            }
        }
        SlashCommand::Quit => lock_unpoisoned(app).on_quit(host),
        SlashCommand::Unknown(command) => {
            println!("{}", view::yellow(&format!("Unknown command: {command}")));
        }
    }
}

fn log_outcome(flow: &str, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Dispatched { request_id } => {
            tracing::debug!(flow, request_id, "submission dispatched");
        }
        SubmitOutcome::Rejected => tracing::debug!(flow, "submission rejected while busy"),
        SubmitOutcome::DispatchFailed(error) => tracing::warn!(flow, %error, "dispatch failed"),
        SubmitOutcome::Ignored => {}
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
