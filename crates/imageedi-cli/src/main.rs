use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use imageedi_contracts::canvas::{DropOutcome, Point, ZoomDirection};
use imageedi_contracts::chat::{
    find_quick_action, parse_intent, Message, CHAT_HELP_COMMANDS, QUICK_ACTIONS,
};
use imageedi_contracts::events::EventWriter;
use imageedi_engine::{
    default_download_name, new_session_id, orchestrator_from_config, upstream_from_config,
    ConfigOverrides, DynUpstream, EditError, EngineConfig, ReferencePolicy, Session,
};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "imageedi", version, about = "Chat-driven image editing backed by Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive editing session driven by chat and slash commands.
    Chat(ChatArgs),
    /// One-shot edit of an image file.
    Edit(EditArgs),
    /// Rewrite a short prompt into a detailed one.
    Enhance(EnhanceArgs),
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long)]
    image_model: Option<String>,
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    api_base: Option<String>,
    /// Request timeout in seconds.
    #[arg(long)]
    timeout: Option<String>,
    /// `primary` or `dual`.
    #[arg(long)]
    reference_policy: Option<String>,
    /// Answer locally without calling the API.
    #[arg(long)]
    dryrun: bool,
    /// Append session events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    engine: EngineArgs,
    /// Image to show on the canvas at startup.
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct EditArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    reference: Option<PathBuf>,
    #[arg(long)]
    out: Option<PathBuf>,
    /// Enhance the prompt before sending it.
    #[arg(long)]
    enhance: bool,
}

#[derive(Debug, Parser)]
struct EnhanceArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long)]
    prompt: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("imageedi error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Edit(args) => run_edit(args),
        Command::Enhance(args) => run_enhance(args),
    }
}

fn build_session(args: &EngineArgs) -> Session<DynUpstream> {
    let overrides = ConfigOverrides::from_env().merge(ConfigOverrides {
        api_key: None,
        api_base: args.api_base.clone(),
        image_model: args.image_model.clone(),
        text_model: args.text_model.clone(),
        request_timeout_s: args.timeout.clone(),
        reference_policy: args.reference_policy.clone(),
    });
    let config = EngineConfig::resolve(overrides);
    for warning in &config.warnings {
        log::warn!("{warning}");
    }
    if !args.dryrun && config.credential.is_empty() {
        log::warn!("no API key found in GEMINI_API_KEY, GOOGLE_API_KEY or API_KEY");
    }

    let upstream = upstream_from_config(&config, args.dryrun);
    let mut orchestrator = orchestrator_from_config(&config, upstream);
    let events = args
        .events
        .as_ref()
        .map(|path| EventWriter::new(path, new_session_id()));
    if let Some(events) = &events {
        orchestrator = orchestrator.with_events(events.clone());
    }
    let session = Session::new(orchestrator, config.reference_policy);
    match events {
        Some(events) => session.with_events(events),
        None => session,
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut session = build_session(&args.engine);
    if let Some(path) = &args.image {
        session
            .load_image(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }

    let stdin = io::stdin();
    let mut line = String::new();

    if let Some(welcome) = session.transcript().last() {
        print_message(welcome);
    }
    println!(
        "Using {} via {}. Type /help for commands.",
        session.orchestrator().image_model(),
        session.orchestrator().upstream_name()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        let args = &intent.command_args;

        match intent.action.as_str() {
            "noop" => {}
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
                let labels: Vec<&str> = QUICK_ACTIONS.iter().map(|action| action.label).collect();
                println!("Quick actions: {}", labels.join(", "));
            }
            "send" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                send_turn(&mut session, &prompt);
            }
            "enhance" => {
                let Some(prompt) = value_as_non_empty_string(args.get("prompt")) else {
                    println!("/enhance requires a prompt");
                    continue;
                };
                let enhanced = session.enhance(&prompt);
                println!("Enhanced prompt: {enhanced}");
                send_turn(&mut session, &enhanced);
            }
            "quick_action" => {
                let label = value_as_non_empty_string(args.get("label")).unwrap_or_default();
                match find_quick_action(&label) {
                    Some(action) => send_turn(&mut session, action.prompt),
                    None => println!("Unknown quick action '{label}'. Try /help."),
                }
            }
            "load_image" => {
                let Some(path) = value_as_non_empty_string(args.get("path")) else {
                    println!("/load requires a path");
                    continue;
                };
                match session.load_image(Path::new(&path)) {
                    Ok(()) => println!("Loaded {path}"),
                    Err(err) => println!("Load failed: {err}"),
                }
            }
            "drop_image" => {
                let Some(path) = value_as_non_empty_string(args.get("path")) else {
                    println!("/drop requires a path");
                    continue;
                };
                match session.drop_image(Path::new(&path)) {
                    DropOutcome::Replaced => println!("Dropped {path} onto the canvas"),
                    DropOutcome::Ignored(reason) => println!("Drop ignored: {reason}"),
                    DropOutcome::Failed(err) => println!("Drop failed: {err}"),
                }
            }
            "attach_reference" => {
                let Some(path) = value_as_non_empty_string(args.get("path")) else {
                    println!("/ref requires a path");
                    continue;
                };
                match session.attach_reference(Path::new(&path)) {
                    Ok(()) => println!("Attached {path} to the next message"),
                    Err(err) => println!("Attach failed: {err}"),
                }
            }
            "detach_reference" => match session.detach_reference() {
                Some(_) => println!("Attachment removed"),
                None => println!("Nothing attached"),
            },
            "save_image" => {
                let path = value_as_non_empty_string(args.get("path"))
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(default_download_name()));
                match session.save_image(&path) {
                    Ok(()) => println!("Saved {}", path.display()),
                    Err(err) => println!("Save failed: {err:#}"),
                }
            }
            "clear_canvas" => {
                session.clear();
                if let Some(message) = session.transcript().last() {
                    print_message(message);
                }
            }
            "zoom_in" | "zoom_out" | "wheel" | "drag" | "reset_view" => {
                if !session.canvas().has_image() {
                    println!("Load an image first.");
                    continue;
                }
                let canvas = session.canvas_mut();
                match intent.action.as_str() {
                    "zoom_in" => canvas.on_zoom_button(ZoomDirection::In),
                    "zoom_out" => canvas.on_zoom_button(ZoomDirection::Out),
                    "wheel" => {
                        let delta_y = args.get("delta_y").and_then(Value::as_f64).unwrap_or(0.0);
                        canvas.on_wheel(delta_y);
                    }
                    "drag" => {
                        canvas.on_drag_start(value_as_point(args.get("from")));
                        canvas.on_drag_move(value_as_point(args.get("to")));
                        canvas.on_drag_end();
                    }
                    _ => canvas.on_reset_view(),
                }
                print_view(&session);
            }
            "show_view" => print_view(&session),
            "show_history" => {
                for message in session.transcript().messages() {
                    print_message(message);
                }
            }
            "set_reference_policy" => {
                let raw = value_as_non_empty_string(args.get("policy"));
                match raw.as_deref().map(str::parse::<ReferencePolicy>) {
                    Some(Ok(policy)) => {
                        session.set_reference_policy(policy);
                        println!("Reference policy set to {}", policy.as_str());
                    }
                    Some(Err(err)) => println!("{err}"),
                    None => println!(
                        "Reference policy: {}",
                        session.reference_policy().as_str()
                    ),
                }
            }
            "set_text_model" => {
                let current = session.orchestrator().text_model().to_string();
                let model = value_as_non_empty_string(args.get("model")).unwrap_or(current);
                session.orchestrator_mut().set_text_model(model.clone());
                println!("Text model set to {model}");
            }
            "set_image_model" => {
                let current = session.orchestrator().image_model().to_string();
                let model = value_as_non_empty_string(args.get("model")).unwrap_or(current);
                session.orchestrator_mut().set_image_model(model.clone());
                println!("Image model set to {model}");
            }
            "invalid" => {
                let command = value_as_non_empty_string(args.get("command")).unwrap_or_default();
                let error = value_as_non_empty_string(args.get("error")).unwrap_or_default();
                println!("/{command}: {error}");
            }
            _ => {
                let command = value_as_non_empty_string(args.get("command")).unwrap_or_default();
                println!("Unknown command /{command}. Try /help.");
            }
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs) -> Result<i32> {
    let mut session = build_session(&args.engine);
    if let Some(path) = &args.image {
        session
            .load_image(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }
    if let Some(path) = &args.reference {
        session
            .attach_reference(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }

    let prompt = if args.enhance {
        session.enhance(&args.prompt)
    } else {
        args.prompt.clone()
    };

    let reply = session.send(&prompt)?;
    let text = reply.text.as_deref().unwrap_or_default();
    if reply.is_error {
        eprintln!("{text}");
        return Ok(1);
    }
    println!("{text}");
    if reply.image.is_none() {
        return Ok(1);
    }

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(default_download_name()));
    session
        .save_image(&out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Saved {}", out.display());
    Ok(0)
}

fn run_enhance(args: EnhanceArgs) -> Result<i32> {
    if args.prompt.trim().is_empty() {
        bail!("--prompt must not be empty");
    }
    let session = build_session(&args.engine);
    println!("{}", session.enhance(&args.prompt));
    Ok(0)
}

fn send_turn(session: &mut Session<DynUpstream>, prompt: &str) {
    match session.send(prompt) {
        Ok(reply) => print_message(reply),
        Err(err @ (EditError::Busy | EditError::EmptyRequest)) => {
            println!("{}", err.user_message())
        }
        Err(err) => println!("Send failed: {err}"),
    }
}

fn print_message(message: &Message) {
    println!("{}", format_message(message));
}

fn format_message(message: &Message) -> String {
    let mut line = format!(
        "[{}] {}",
        message.role.as_str(),
        message.text.as_deref().unwrap_or_default()
    );
    if let Some(image) = &message.image {
        line.push_str(&format!(" (image: {})", image.mime_type));
    }
    if message.reference_image.is_some() {
        line.push_str(" (with attachment)");
    }
    line
}

fn print_view(session: &Session<DynUpstream>) {
    let view = session.canvas().view();
    println!(
        "Zoom {}% offset ({:.0}, {:.0})",
        session.canvas().zoom_percent(),
        view.offset.x,
        view.offset.y
    );
}

fn value_as_non_empty_string(value: Option<&Value>) -> Option<String> {
    let raw = value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn value_as_point(value: Option<&Value>) -> Point {
    let coords = value.and_then(Value::as_array);
    let coord = |index: usize| {
        coords
            .and_then(|values| values.get(index))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };
    Point::new(coord(0), coord(1))
}

#[cfg(test)]
mod tests {
    use imageedi_contracts::chat::Role;
    use imageedi_contracts::image::EncodedImage;
    use serde_json::json;

    use super::*;

    #[test]
    fn cli_parses_edit_flags() {
        let cli = Cli::parse_from([
            "imageedi",
            "edit",
            "--prompt",
            "make it snow",
            "--image",
            "in.png",
            "--dryrun",
            "--reference-policy",
            "dual",
        ]);
        let Command::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(args.prompt, "make it snow");
        assert_eq!(args.image.as_deref(), Some(Path::new("in.png")));
        assert!(args.engine.dryrun);
        assert_eq!(args.engine.reference_policy.as_deref(), Some("dual"));
        assert!(!args.enhance);
    }

    #[test]
    fn messages_render_role_text_and_images() {
        let reply = Message::new(Role::Model, "Done.")
            .with_image(Some(EncodedImage::png("QUJD")))
            .with_reference(Some(EncodedImage::png("REVG")));
        assert_eq!(
            format_message(&reply),
            "[model] Done. (image: image/png) (with attachment)"
        );

        let mut silent = Message::new(Role::User, "");
        silent.text = None;
        assert_eq!(format_message(&silent), "[user] ");
    }

    #[test]
    fn point_values_default_to_zero() {
        assert_eq!(
            value_as_point(Some(&json!([3.0, -4.5]))),
            Point::new(3.0, -4.5)
        );
        assert_eq!(value_as_point(Some(&json!("nope"))), Point::ORIGIN);
        assert_eq!(value_as_point(None), Point::ORIGIN);
    }

    #[test]
    fn dryrun_edit_writes_output() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("edit.png");
        let code = run_edit(EditArgs {
            engine: EngineArgs {
                image_model: None,
                text_model: None,
                api_base: None,
                timeout: None,
                reference_policy: None,
                dryrun: true,
                events: Some(temp.path().join("events.jsonl")),
            },
            prompt: "a lighthouse at dusk".to_string(),
            image: None,
            reference: None,
            out: Some(out.clone()),
            enhance: false,
        })?;
        assert_eq!(code, 0);
        assert!(out.exists());
        let events = std::fs::read_to_string(temp.path().join("events.jsonl"))?;
        assert!(events.contains("generation_completed"));
        Ok(())
    }
}
