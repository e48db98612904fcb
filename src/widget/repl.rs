use std::error::Error;
use std::path::Path;

use log::{ info, warn };
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader };

use super::files::load_attachment;
use super::render::{ render_entry, render_loading, RenderOptions };
use super::transport::{ ChatTransport, HttpTransport };
use super::{ ChatWidget, SendOutcome, WidgetError };
use crate::cli::WidgetArgs;

const STILL_WAITING: &str = "still waiting for a reply; that input was ignored";

const HELP: &str =
    "Commands: /attach <path>  /remove <n>  /files  /help  /quit. Anything else is sent as a message.";

#[derive(Debug, PartialEq, Eq)]
pub enum WidgetCommand<'a> {
    Send(&'a str),
    Attach(&'a str),
    Remove(usize),
    Files,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> WidgetCommand<'_> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return WidgetCommand::Send(line);
    }
    let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (trimmed, ""),
    };
    match cmd {
        "/attach" if !rest.is_empty() => WidgetCommand::Attach(rest),
        "/attach" => WidgetCommand::Invalid("usage: /attach <path>".to_string()),
        "/remove" =>
            match rest.parse::<usize>() {
                Ok(n) if n >= 1 => WidgetCommand::Remove(n - 1),
                _ => WidgetCommand::Invalid("usage: /remove <n> (1-based)".to_string()),
            }
        "/files" => WidgetCommand::Files,
        "/help" => WidgetCommand::Help,
        "/quit" | "/exit" => WidgetCommand::Quit,
        other => WidgetCommand::Invalid(format!("unknown command {}", other)),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<(), WidgetError> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// A line read while a reply is pending. Messages go through the widget,
/// which refuses them; commands are not run.
async fn ignore_while_sending<W: AsyncWrite + Unpin>(
    widget: &mut ChatWidget,
    writer: &mut W,
    line: &str
) -> Result<(), WidgetError> {
    if let WidgetCommand::Send(text) = parse_command(line) {
        if text.trim().is_empty() {
            return Ok(());
        }
        widget.set_input(text);
        let accepted = widget.append_user_input();
        debug_assert!(accepted.is_none());
        widget.set_input(String::new());
    }
    warn!("Ignored input while waiting for a reply: {}", line);
    write_line(writer, STILL_WAITING).await
}

/// Drives one interactive session until EOF or `/quit`. Input that arrives
/// while a reply is pending is dropped.
pub async fn run_session<R, W, T>(
    reader: R,
    writer: &mut W,
    transport: &T,
    options: RenderOptions
) -> Result<ChatWidget, WidgetError>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin, T: ChatTransport + ?Sized
{
    let mut widget = ChatWidget::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            WidgetCommand::Send(text) => {
                widget.set_input(text);
                let Some(pending) = widget.append_user_input() else {
                    continue;
                };
                write_line(writer, &render_loading(options)).await?;

                let submit = transport.submit(&pending.conversation, &pending.files);
                tokio::pin!(submit);
                let mut input_open = true;
                let result = loop {
                    tokio::select! {
                        biased;
                        result = &mut submit => break result,
                        next = lines.next_line(), if input_open => {
                            match next? {
                                Some(extra) => ignore_while_sending(&mut widget, writer, &extra).await?,
                                None => input_open = false,
                            }
                        }
                    }
                };

                let entry = widget.finish_send(SendOutcome::from(result));
                write_line(writer, &render_entry(entry, options)).await?;
            }
            WidgetCommand::Attach(path) => {
                match load_attachment(Path::new(path)).await {
                    Ok(file) => {
                        let msg = format!("staged {} ({}, {} bytes)", file.name, file.media_type, file.data.len());
                        widget.stage_file(file);
                        write_line(writer, &msg).await?;
                    }
                    Err(e) => {
                        warn!("Could not stage {}: {}", path, e);
                        write_line(writer, &format!("cannot attach {}: {}", path, e)).await?;
                    }
                }
            }
            WidgetCommand::Remove(index) => {
                let msg = match widget.remove_file(index) {
                    Some(file) => format!("removed {}", file.name),
                    None => format!("no staged file #{}", index + 1),
                };
                write_line(writer, &msg).await?;
            }
            WidgetCommand::Files => {
                if widget.staged_files().is_empty() {
                    write_line(writer, "no files staged").await?;
                }
                for (i, file) in widget.staged_files().iter().enumerate() {
                    write_line(writer, &format!("{}. {} ({})", i + 1, file.name, file.media_type)).await?;
                }
            }
            WidgetCommand::Help => write_line(writer, HELP).await?,
            WidgetCommand::Invalid(msg) => write_line(writer, &msg).await?,
            WidgetCommand::Quit => {
                break;
            }
        }
    }

    Ok(widget)
}

pub async fn run_chat(args: WidgetArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let transport = HttpTransport::new(&args.server_url);
    info!("Chatting with {}", transport.endpoint());

    let options = RenderOptions { color: !args.no_color };
    let mut stdout = tokio::io::stdout();
    write_line(&mut stdout, HELP).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let widget = run_session(stdin, &mut stdout, &transport, options).await?;
    info!("Session ended after {} message(s)", widget.transcript().len());
    Ok(())
}
