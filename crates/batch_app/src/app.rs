use std::io::BufRead;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::ensure;
use batch_core::{update, Criterion, Effect, JobState, Msg, Phase};
use batch_engine::{
    BatchTransport, BatchWorker, Describer, DescriberSettings, DirMediaStore,
    DirectBatchTransport, GeminiDescriber, HttpBatchTransport, ImagePipeline, ReencodeCodec,
    TransportHandle, TransportSettings,
};
use batch_logging::batch_info;

use crate::config::AppConfig;
use crate::effects::{map_event, EffectRunner};
use crate::render::ConsoleRenderer;
use crate::Cli;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub(crate) fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let transport = build_transport(&cli, &config)?;
    let handle = TransportHandle::new(transport);
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(handle.sender(), msg_tx.clone(), cli.export_log.clone());
    let input_rx = spawn_stdin_reader();

    let mut app = App {
        state: JobState::new(),
        runner,
        renderer: ConsoleRenderer::new(),
        pending: None,
        auto_confirm: cli.yes,
        quit: false,
    };

    println!("Commands: 'stop' to stop the job, 'export' to save the activity log.");
    app.dispatch(Msg::StartClicked {
        criterion: cli.criterion.into(),
    });

    loop {
        while let Some(event) = handle.try_recv() {
            app.dispatch(map_event(event));
        }
        while let Ok(msg) = msg_rx.try_recv() {
            app.dispatch(msg);
        }
        while let Ok(line) = input_rx.try_recv() {
            app.handle_line(line.trim());
        }
        if app.finished() {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if app.state.phase() == Phase::Error {
        anyhow::bail!("bulk processing failed");
    }
    Ok(())
}

/// Remote mode when an endpoint is configured, otherwise an in-process
/// worker over the local library directory.
fn build_transport(cli: &Cli, config: &AppConfig) -> anyhow::Result<Arc<dyn BatchTransport>> {
    let endpoint = cli.endpoint.clone().or_else(|| config.endpoint.clone());
    if let Some(endpoint) = endpoint {
        batch_info!("remote mode, endpoint {}", endpoint);
        let transport =
            HttpBatchTransport::new(endpoint, config.token.clone(), TransportSettings::default())
                .map_err(|err| anyhow::anyhow!("transport setup failed: {err}"))?;
        return Ok(Arc::new(transport));
    }

    let library = cli.library.clone().unwrap_or_else(|| config.library.clone());
    ensure!(
        library.is_dir(),
        "image library {:?} is not a directory",
        library
    );
    batch_info!("local mode, library {:?}", library);

    let describer = build_describer(config)?;
    let pipeline = ImagePipeline::new(config.pipeline.clone(), Arc::new(ReencodeCodec), describer);
    let worker = BatchWorker::new(DirMediaStore::new(library), pipeline, config.token.clone());
    Ok(Arc::new(DirectBatchTransport::new(
        Arc::new(worker),
        config.token.clone(),
    )))
}

fn build_describer(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn Describer>>> {
    if !config.pipeline.any_ai_enabled() {
        return Ok(None);
    }
    ensure!(
        !config.ai.api_key.is_empty(),
        "AI metadata is enabled but no API key is configured"
    );
    let settings = DescriberSettings {
        api_key: config.ai.api_key.clone(),
        model: config.ai.model.clone(),
        ..DescriberSettings::default()
    };
    let describer = GeminiDescriber::new(settings)
        .map_err(|err| anyhow::anyhow!("describer setup failed: {err}"))?;
    Ok(Some(Arc::new(describer)))
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

enum Pending {
    Start(Criterion),
    Stop,
}

struct App {
    state: JobState,
    runner: EffectRunner,
    renderer: ConsoleRenderer,
    pending: Option<Pending>,
    auto_confirm: bool,
    quit: bool,
}

impl App {
    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;

        let interactive = self.runner.run(effects);
        if dirty {
            self.renderer.render(&view);
        }
        for effect in interactive {
            self.prompt(effect);
        }
    }

    fn prompt(&mut self, effect: Effect) {
        match effect {
            Effect::ConfirmStart { criterion } => {
                if self.auto_confirm {
                    self.dispatch(Msg::StartConfirmed { criterion });
                    return;
                }
                println!(
                    "Process EVERY image in the library, not just those missing alt text? [y/N]"
                );
                self.pending = Some(Pending::Start(criterion));
            }
            Effect::ConfirmStop => {
                if self.auto_confirm {
                    self.dispatch(Msg::StopConfirmed);
                    return;
                }
                println!("Stop after the current batch finishes? [y/N]");
                self.pending = Some(Pending::Stop);
            }
            _ => {}
        }
    }

    fn handle_line(&mut self, line: &str) {
        if let Some(pending) = self.pending.take() {
            let yes = matches!(line.to_ascii_lowercase().as_str(), "y" | "yes");
            match (pending, yes) {
                (Pending::Start(criterion), true) => {
                    self.dispatch(Msg::StartConfirmed { criterion });
                }
                (Pending::Start(_), false) => {
                    println!("Start cancelled.");
                    self.quit = true;
                }
                (Pending::Stop, true) => self.dispatch(Msg::StopConfirmed),
                (Pending::Stop, false) => println!("Continuing."),
            }
            return;
        }

        match line {
            "stop" => self.dispatch(Msg::StopClicked),
            "export" => self.dispatch(Msg::ExportLogClicked),
            "clear" => self.dispatch(Msg::ClearLogClicked),
            "" => {}
            other => println!("Unknown command '{other}'; try 'stop' or 'export'."),
        }
    }

    fn finished(&self) -> bool {
        if self.quit {
            return true;
        }
        self.pending.is_none() && !self.state.is_active() && self.state.phase() != Phase::Idle
    }
}
