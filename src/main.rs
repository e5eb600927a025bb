//! Console shell for the JARVIS voice core.
//!
//! Each stdin line is one finalized transcript. Lines starting with `:` stand
//! in for the HUD's buttons and the vision collaborator:
//!
//! ```text
//! :listen            toggle the microphone
//! :scan              enter the face scan (arms enrollment)
//! :face <seed|csv>   a face in view: enrolls while scanning, else recognizes
//! :cancel            abandon the enrollment interview
//! :mode <name>       switch panel by hand
//! :db                list identities
//! :add <fields>      add an identity by hand, e.g. name=Pepper, gender=female
//! :update <i> <fields>  edit an identity, e.g. 0 access=admin, age=41
//! :delete <index>    delete an identity
//! :clear             wipe the identity database
//! :status            show operator, mode, interview and listener state
//! :quit
//! ```

use anyhow::Context;
use jarvis_lib::clock::{Clock, SystemClock};
use jarvis_lib::identity::{
    best_match, AlertThrottle, IdentityPatch, IdentityRecord, JsonIdentityStore,
    MISSING_PERSON_ALERT,
};
use jarvis_lib::media::MediaCommandListener;
use jarvis_lib::voice::{Effects, LastCommand, Mode, VoiceSession};
use jarvis_lib::{AppConfig, AppPaths};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use url::Url;

/// Plays every external collaborator on the terminal
struct ConsoleShell {
    store: JsonIdentityStore,
    bus: broadcast::Sender<LastCommand>,
}

impl Effects for ConsoleShell {
    fn request_speech(&mut self, text: &str, listen_after: bool) {
        if listen_after {
            println!("JARVIS » {}  [listening]", text);
        } else {
            println!("JARVIS » {}", text);
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        println!("[mode] {}", mode);
    }

    fn commit_identity(&mut self, record: IdentityRecord) -> anyhow::Result<()> {
        self.store.add(record)
    }

    fn open_external_link(&mut self, url: &Url) {
        println!("[link] {}", url);
    }

    fn publish_last_command(&mut self, command: LastCommand) {
        // No subscribers is fine
        let _ = self.bus.send(command);
    }
}

type Session = VoiceSession<ConsoleShell, SystemClock>;

const IDENTITY_ADDED: &str = "Identity added.";
const RECORD_UPDATED: &str = "Record updated.";
const RECORD_DELETED: &str = "Record deleted.";
const DATABASE_WIPED: &str = "Database wiped.";

enum Flow {
    Continue,
    Quit,
}

/// Deterministic pseudo-descriptor so faces can be "shown" by number
fn descriptor_from_seed(seed: u64, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (seed as f32 * 12.9898 + i as f32 * 78.233).sin() * 0.25)
        .collect()
}

fn parse_descriptor(arg: &str, len: usize) -> anyhow::Result<Vec<f32>> {
    if let Ok(seed) = arg.parse::<u64>() {
        return Ok(descriptor_from_seed(seed, len));
    }
    arg.split(',')
        .map(|v| v.trim().parse::<f32>().context("descriptor values must be numbers"))
        .collect()
}

fn handle_face(
    session: &mut Session,
    config: &AppConfig,
    throttle: &mut AlertThrottle,
    arg: &str,
) -> anyhow::Result<()> {
    let descriptor = parse_descriptor(arg, config.identity.descriptor_len)?;

    if session.is_scanning() {
        session.trigger_enrollment(descriptor)?;
        return Ok(());
    }

    let records = session.effects().store.records();
    match best_match(records, &descriptor, config.identity.match_threshold) {
        Some(hit) => {
            println!(
                "[vision] {} | access {} | age {} | distance {:.3}",
                hit.record.name.to_uppercase(),
                hit.record.access_level,
                hit.record.age,
                hit.distance
            );
            if hit.is_missing_person() && throttle.try_fire(session.clock().now_ms()) {
                session.announce(MISSING_PERSON_ALERT);
            }
        }
        None => println!("[vision] UNKNOWN"),
    }
    Ok(())
}

fn handle_line(
    session: &mut Session,
    config: &AppConfig,
    throttle: &mut AlertThrottle,
    line: &str,
) -> anyhow::Result<Flow> {
    let Some(command) = line.trim().strip_prefix(':') else {
        if let Err(e) = session.submit_utterance(line) {
            log::warn!("Utterance dropped: {}", e);
        }
        return Ok(Flow::Continue);
    };

    let (name, arg) = command
        .split_once(' ')
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((command, ""));

    match name {
        "listen" => {
            let state = session.toggle_listening()?;
            println!("[mic] {:?}", state);
        }
        "scan" => session.begin_scan(),
        "face" => handle_face(session, config, throttle, arg)?,
        "cancel" => {
            if !session.cancel_enrollment() {
                println!("No interview in progress");
            }
        }
        "mode" => {
            let mode: Mode = arg.parse().map_err(anyhow::Error::msg)?;
            session.set_mode(mode);
        }
        "db" => {
            let records = session.effects().store.records();
            if records.is_empty() {
                println!("Identity database is empty");
            }
            for (i, r) in records.iter().enumerate() {
                println!(
                    "{:>3}  {:<24} {:<6} {:<7} {:<9} {}",
                    i, r.name, r.gender, r.age, r.access_level, r.date_added
                );
            }
        }
        "add" => {
            let patch = IdentityPatch::parse(arg)?;
            let record = IdentityRecord::manual(patch, session.clock().today())?;
            session.effects_mut().store.add(record)?;
            session.announce(IDENTITY_ADDED);
        }
        "update" => {
            let (index, fields) = arg.split_once(' ').unwrap_or((arg, ""));
            let index: usize = index
                .parse()
                .context("usage: :update <index> <field>=<value>, ...")?;
            let patch = IdentityPatch::parse(fields)?;
            session.effects_mut().store.update(index, patch)?;
            session.announce(RECORD_UPDATED);
        }
        "delete" => {
            let index: usize = arg.parse().context("usage: :delete <index>")?;
            let removed = session.effects_mut().store.delete(index)?;
            session.announce(RECORD_DELETED);
            log::info!("Deleted '{}'", removed.name);
        }
        "clear" => {
            session.effects_mut().store.clear()?;
            session.announce(DATABASE_WIPED);
        }
        "status" => {
            println!(
                "operator={} ({}) mode={} interview={:?} listener={:?} scanning={}",
                config.operator.name,
                config.operator.access,
                session.mode(),
                session.conversation_state(),
                session.listener_state(),
                session.is_scanning()
            );
            println!("rules: {}", session.interpreter().rule_names().join(", "));
        }
        "quit" | "exit" => return Ok(Flow::Quit),
        other => println!("Unknown command ':{}'", other),
    }

    Ok(Flow::Continue)
}

/// Independent consumer of the last-command channel
async fn media_listener(mut rx: broadcast::Receiver<LastCommand>, max_age_ms: u64) {
    let mut listener = MediaCommandListener::new(max_age_ms);
    let clock = SystemClock;

    loop {
        match rx.recv().await {
            Ok(command) => {
                if let Some(action) = listener.observe(&command, clock.now_ms()) {
                    println!("[media] {:?}", action);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Media listener skipped {} command(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn run(paths: AppPaths, config: AppConfig) -> anyhow::Result<()> {
    let store = JsonIdentityStore::open(&paths.identity_db_file());
    let (bus, rx) = broadcast::channel(16);
    let media = tokio::spawn(media_listener(rx, config.voice.stale_command_ms));

    let shell = ConsoleShell { store, bus };
    let mut session = VoiceSession::new(&config, shell, SystemClock)?;
    let mut throttle = AlertThrottle::new(config.identity.missing_alert_interval_ms);

    session.announce(&format!(
        "Welcome back, {}. System secure.",
        config.operator.name
    ));
    session.speech_finished();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match handle_line(&mut session, &config, &mut throttle, &line) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("error: {:#}", e),
        }
        // Speech output is printed synchronously, so it is already over
        session.speech_finished();
        tokio::task::yield_now().await;
    }

    drop(session);
    if let Err(e) = media.await {
        log::warn!("Media listener task failed: {}", e);
    }
    log::info!("JARVIS shutting down");
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("JARVIS starting...");

    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(e) => {
            log::error!("Failed to initialize application paths: {:#}", e);
            std::process::exit(1);
        }
    };

    let config = match paths
        .ensure_directories()
        .and_then(|()| AppConfig::load_or_create(&paths.config_file()))
    {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    log::info!("Configuration loaded");

    if let Err(e) = run(paths, config).await {
        log::error!("JARVIS failed: {:#}", e);
        std::process::exit(1);
    }
}
