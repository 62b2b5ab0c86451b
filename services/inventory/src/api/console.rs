//! 控制台驱动
//!
//! 扫码枪以键盘方式输入，每行一个条码。以 `:` 开头的行是命令。
//! 每条输入得到若干行提示；任何错误都只是提示，不会中断循环。

use std::path::PathBuf;
use std::sync::Arc;

use lager_config::ProtocolConfig;
use thiserror::Error;
use tracing::warn;

use crate::application::{AddMaterialCommand, EditMaterialCommand, InventoryEngine, ScanOutcome};
use crate::domain::entities::Material;
use crate::domain::enums::{ActionKind, ScanMode};
use crate::protocol::HandoverProtocol;

/// 命令解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command ':{0}', try :help")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown field '{0}', expected label, serial, note, pos or stock")]
    UnknownField(String),
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}

const EDIT_USAGE: &str = ":edit <serial> <field>=<value> ...";

/// 控制台输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// 普通行：条码
    Scan(String),
    CheckIn,
    /// 切到出库，可同时设置持有人
    CheckOut(Option<String>),
    Actor(Option<String>),
    Undo(String),
    Position { code: String, position: Option<String> },
    Add { serial: String, label: String },
    Edit(EditMaterialCommand),
    Delete(String),
    Filter(String),
    NoFilter,
    List,
    Log(String),
    Session,
    Protocol,
    Refresh,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// 解析一行输入；空行返回 `None`
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(command) = line.strip_prefix(':') else {
            return Ok(Some(ConsoleCommand::Scan(line.to_string())));
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        let parsed = match name {
            "in" => ConsoleCommand::CheckIn,
            "out" => ConsoleCommand::CheckOut(arg),
            "actor" => ConsoleCommand::Actor(arg),
            "undo" => ConsoleCommand::Undo(arg.ok_or(ParseError::Usage(":undo <serial>"))?),
            "pos" => {
                let (code, position) = split_first(rest).ok_or(ParseError::Usage(
                    ":pos <serial> [position]",
                ))?;
                ConsoleCommand::Position { code, position }
            }
            "add" => match split_first(rest) {
                Some((serial, Some(label))) => ConsoleCommand::Add { serial, label },
                _ => return Err(ParseError::Usage(":add <serial> <label>")),
            },
            "edit" => ConsoleCommand::Edit(parse_edit(rest)?),
            "del" => ConsoleCommand::Delete(arg.ok_or(ParseError::Usage(":del <serial>"))?),
            "filter" => ConsoleCommand::Filter(rest.to_string()),
            "nofilter" => ConsoleCommand::NoFilter,
            "list" => ConsoleCommand::List,
            "log" => ConsoleCommand::Log(arg.ok_or(ParseError::Usage(":log <serial>"))?),
            "session" => ConsoleCommand::Session,
            "protocol" => ConsoleCommand::Protocol,
            "refresh" => ConsoleCommand::Refresh,
            "help" => ConsoleCommand::Help,
            "quit" | "q" => ConsoleCommand::Quit,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        Ok(Some(parsed))
    }
}

fn split_first(rest: &str) -> Option<(String, Option<String>)> {
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    match rest.split_once(char::is_whitespace) {
        Some((first, tail)) => {
            let tail = tail.trim();
            Some((first.to_string(), (!tail.is_empty()).then(|| tail.to_string())))
        }
        None => Some((rest.to_string(), None)),
    }
}

/// 解析 `:edit` 参数
///
/// 不含 `=` 的词接到前一个值后面，所以值可以包含空格；空值清除备注。
fn parse_edit(rest: &str) -> Result<EditMaterialCommand, ParseError> {
    let mut words = rest.split_whitespace();
    let code = words.next().ok_or(ParseError::Usage(EDIT_USAGE))?;

    let mut fields: Vec<(&str, String)> = Vec::new();
    for word in words {
        match word.split_once('=') {
            Some((key, value)) => fields.push((key, value.to_string())),
            None => match fields.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(word);
                }
                None => return Err(ParseError::Usage(EDIT_USAGE)),
            },
        }
    }
    if fields.is_empty() {
        return Err(ParseError::Usage(EDIT_USAGE));
    }

    let mut cmd = EditMaterialCommand::new(code);
    for (key, value) in fields {
        match key {
            "label" => cmd.label = Some(value),
            "serial" => cmd.serial_number = Some(value),
            "note" => cmd.note = Some(value),
            "pos" | "position" => cmd.position = Some(value),
            "stock" => {
                cmd.in_stock = Some(match value.as_str() {
                    "in" | "yes" | "true" => true,
                    "out" | "no" | "false" => false,
                    _ => {
                        return Err(ParseError::InvalidValue {
                            field: "stock",
                            value,
                        });
                    }
                })
            }
            other => return Err(ParseError::UnknownField(other.to_string())),
        }
    }
    Ok(cmd)
}

/// 执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Lines(Vec<String>),
    Quit,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Reply::Lines(vec![text.into()])
    }

    fn notice(text: impl std::fmt::Display) -> Self {
        Reply::Lines(vec![format!("! {text}")])
    }
}

const HELP: &[&str] = &[
    "<code>                 scan a barcode",
    ":in                    check-in mode",
    ":out [name]            check-out mode, optionally set the holder",
    ":actor [name]          set or clear the session actor",
    ":undo <serial>         undo the last scan of a material",
    ":pos <serial> [pos]    correct the position without logging",
    ":add <serial> <label>  add a material",
    ":edit <serial> k=v ... edit label, serial, note, pos or stock=in|out",
    ":del <serial>          delete a material and its log",
    ":filter <text>         filter the list",
    ":nofilter              show the full list",
    ":list                  list materials",
    ":log <serial>          show the event log",
    ":session               show this session's scans",
    ":protocol              write the handover protocol",
    ":refresh               reload from the repository",
    ":quit                  exit",
];

/// 控制台
pub struct Console {
    engine: Arc<InventoryEngine>,
    protocol: ProtocolConfig,
}

impl Console {
    pub fn new(engine: Arc<InventoryEngine>, protocol: ProtocolConfig) -> Self {
        Self { engine, protocol }
    }

    /// 处理一行输入
    pub async fn handle_line(&self, line: &str) -> Reply {
        match ConsoleCommand::parse(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Reply::Lines(Vec::new()),
            Err(e) => Reply::notice(e),
        }
    }

    pub async fn execute(&self, command: ConsoleCommand) -> Reply {
        let engine = &self.engine;
        match command {
            ConsoleCommand::Scan(code) => match engine.process_scan(&code).await {
                Ok(ScanOutcome::Applied {
                    label,
                    serial,
                    mode,
                }) => Reply::line(format!("{mode}: {label} SN {serial}")),
                Ok(ScanOutcome::ActorRequired { label, serial }) => Reply::notice(format!(
                    "{label} SN {serial}: set a holder with :actor <name> before issuing"
                )),
                Err(e) => Reply::notice(e),
            },
            ConsoleCommand::CheckIn => {
                engine.set_mode(ScanMode::CheckIn).await;
                Reply::line("mode: check-in")
            }
            ConsoleCommand::CheckOut(actor) => {
                engine.set_mode(ScanMode::CheckOut).await;
                if actor.is_some() {
                    engine.set_actor(actor).await;
                }
                match engine.actor().await {
                    Some(actor) => Reply::line(format!("mode: check-out to {actor}")),
                    None => Reply::line("mode: check-out (no holder set)"),
                }
            }
            ConsoleCommand::Actor(actor) => {
                engine.set_actor(actor).await;
                match engine.actor().await {
                    Some(actor) => Reply::line(format!("actor: {actor}")),
                    None => Reply::line("actor cleared"),
                }
            }
            ConsoleCommand::Undo(code) => match engine.undo(&code).await {
                Ok(ActionKind::CheckOut) => Reply::line(format!("{code}: check-out undone")),
                Ok(_) => Reply::line(format!("{code}: check-in undone")),
                Err(e) => Reply::notice(e),
            },
            ConsoleCommand::Position { code, position } => {
                match engine.set_position(&code, position).await {
                    Ok(()) => Reply::line(format!("{code}: position updated")),
                    Err(e) => Reply::notice(e),
                }
            }
            ConsoleCommand::Add { serial, label } => {
                match engine
                    .add_material(AddMaterialCommand::new(serial.clone(), label))
                    .await
                {
                    Ok(_) => Reply::line(format!("{serial}: added")),
                    Err(e) => Reply::notice(e),
                }
            }
            ConsoleCommand::Edit(cmd) => {
                let code = cmd.code.clone();
                match engine.edit_material(cmd).await {
                    Ok(changed) if changed.is_empty() => {
                        Reply::line(format!("{code}: nothing changed"))
                    }
                    Ok(changed) => Reply::line(format!("{code}: edited {}", changed.join(", "))),
                    Err(e) => Reply::notice(e),
                }
            }
            ConsoleCommand::Delete(code) => match engine.delete_material(&code).await {
                Ok(material) => Reply::line(format!(
                    "{} SN {}: deleted",
                    material.label(),
                    material.serial_str()
                )),
                Err(e) => Reply::notice(e),
            },
            ConsoleCommand::Filter(text) => {
                engine.set_filter(text).await;
                engine.set_filter_active(true).await;
                Reply::Lines(render_list(&engine.filtered_list().await))
            }
            ConsoleCommand::NoFilter => {
                engine.set_filter_active(false).await;
                Reply::line("filter off")
            }
            ConsoleCommand::List => Reply::Lines(render_list(&engine.filtered_list().await)),
            ConsoleCommand::Log(code) => match engine.material_log(&code).await {
                Ok(log) if log.is_empty() => Reply::line(format!("{code}: no entries")),
                Ok(log) => Reply::Lines(
                    log.iter()
                        .map(|e| {
                            format!(
                                "{}  {:<12} {}",
                                e.timestamp.format("%Y-%m-%d %H:%M"),
                                e.actor,
                                e.description
                            )
                        })
                        .collect(),
                ),
                Err(e) => Reply::notice(e),
            },
            ConsoleCommand::Session => {
                let lines = engine.session_lines().await;
                if lines.is_empty() {
                    Reply::line("session is empty")
                } else {
                    Reply::Lines(lines)
                }
            }
            ConsoleCommand::Protocol => self.write_protocol().await,
            ConsoleCommand::Refresh => match engine.refresh().await {
                Ok(count) => Reply::line(format!("{count} materials loaded")),
                Err(e) => {
                    warn!(error = %e, "Refresh failed");
                    Reply::notice(e)
                }
            },
            ConsoleCommand::Help => Reply::Lines(HELP.iter().map(|s| s.to_string()).collect()),
            ConsoleCommand::Quit => Reply::Quit,
        }
    }

    /// 写交接单并清空会话
    async fn write_protocol(&self) -> Reply {
        let lines = self.engine.session_lines().await;
        if lines.is_empty() {
            return Reply::notice("session is empty, nothing to hand over");
        }

        let actor = self.engine.actor().await;
        let protocol = HandoverProtocol::build(
            &lines,
            self.engine.mode().await,
            actor.as_deref(),
            &self.protocol.organisation,
            self.protocol.lines_per_page,
        );

        match protocol.write_to(PathBuf::from(&self.protocol.output_dir)).await {
            Ok(path) => {
                self.engine.clear_session().await;
                Reply::line(format!("protocol written to {}", path.display()))
            }
            Err(e) => Reply::notice(e),
        }
    }
}

fn render_list(materials: &[Material]) -> Vec<String> {
    if materials.is_empty() {
        return vec!["no materials".to_string()];
    }
    materials
        .iter()
        .map(|m| {
            let state = if m.in_stock() { "in stock" } else { "issued" };
            format!(
                "{:<14} {:<24} {:<9} {}",
                m.serial_str(),
                m.label(),
                state,
                m.position().unwrap_or("-")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::SerialNumber;
    use crate::infrastructure::persistence::InMemoryMaterialRepository;

    #[test]
    fn test_parse_scan_and_commands() {
        assert_eq!(ConsoleCommand::parse("   "), Ok(None));
        assert_eq!(
            ConsoleCommand::parse(" A1 \r"),
            Ok(Some(ConsoleCommand::Scan("A1".into())))
        );
        assert_eq!(
            ConsoleCommand::parse(":out Alice Meyer"),
            Ok(Some(ConsoleCommand::CheckOut(Some("Alice Meyer".into()))))
        );
        assert_eq!(ConsoleCommand::parse(":out"), Ok(Some(ConsoleCommand::CheckOut(None))));
        assert_eq!(
            ConsoleCommand::parse(":add X7 Cordless drill"),
            Ok(Some(ConsoleCommand::Add {
                serial: "X7".into(),
                label: "Cordless drill".into()
            }))
        );
        assert_eq!(
            ConsoleCommand::parse(":pos X7"),
            Ok(Some(ConsoleCommand::Position {
                code: "X7".into(),
                position: None
            }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ConsoleCommand::parse(":frobnicate"),
            Err(ParseError::UnknownCommand("frobnicate".into()))
        );
        assert_eq!(
            ConsoleCommand::parse(":add X7"),
            Err(ParseError::Usage(":add <serial> <label>"))
        );
        assert!(ConsoleCommand::parse(":undo").is_err());
        assert_eq!(
            ConsoleCommand::parse(":edit A1"),
            Err(ParseError::Usage(EDIT_USAGE))
        );
        assert_eq!(
            ConsoleCommand::parse(":edit A1 colour=red"),
            Err(ParseError::UnknownField("colour".into()))
        );
        assert_eq!(
            ConsoleCommand::parse(":edit A1 stock=maybe"),
            Err(ParseError::InvalidValue {
                field: "stock",
                value: "maybe".into()
            })
        );
    }

    #[test]
    fn test_parse_edit_fields() {
        assert_eq!(
            ConsoleCommand::parse(":edit A1 label=Cordless drill stock=out pos=Van 2 note="),
            Ok(Some(ConsoleCommand::Edit(EditMaterialCommand {
                label: Some("Cordless drill".into()),
                in_stock: Some(false),
                position: Some("Van 2".into()),
                note: Some(String::new()),
                ..EditMaterialCommand::new("A1")
            })))
        );
    }

    async fn console(output_dir: &std::path::Path) -> Console {
        let repo = Arc::new(InMemoryMaterialRepository::with_materials(vec![Material::new(
            "Drill",
            Some(SerialNumber::new("A1").unwrap()),
        )]));
        let engine = Arc::new(InventoryEngine::new(repo));
        engine.refresh().await.unwrap();
        Console::new(
            engine,
            ProtocolConfig {
                output_dir: output_dir.display().to_string(),
                lines_per_page: 30,
                organisation: "Werkstatt".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_issue_session_and_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(dir.path()).await;

        console.handle_line(":out Alice").await;
        assert_eq!(
            console.handle_line("A1").await,
            Reply::line("check-out: Drill SN A1")
        );
        assert_eq!(
            console.handle_line(":session").await,
            Reply::Lines(vec!["Drill SN A1".into()])
        );

        let Reply::Lines(reply) = console.handle_line(":protocol").await else {
            panic!("expected lines");
        };
        assert!(reply[0].starts_with("protocol written to"));
        assert_eq!(
            console.handle_line(":session").await,
            Reply::line("session is empty")
        );
    }

    #[tokio::test]
    async fn test_errors_are_notices() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(dir.path()).await;

        let Reply::Lines(reply) = console.handle_line("A1").await else {
            panic!("expected lines");
        };
        assert!(reply[0].starts_with("! "));
        assert!(reply[0].contains("already in stock"));
        assert_eq!(console.handle_line(":quit").await, Reply::Quit);
    }

    #[tokio::test]
    async fn test_edit_command() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(dir.path()).await;

        assert_eq!(
            console.handle_line(":edit A1 label=Hammer drill note=new chuck").await,
            Reply::line("A1: edited label, note")
        );
        assert_eq!(
            console.handle_line(":edit A1 label=Hammer drill").await,
            Reply::line("A1: nothing changed")
        );
        assert_eq!(
            console.handle_line(":edit A note=x").await,
            Reply::line("! no material found for 'A'")
        );

        let Reply::Lines(list) = console.handle_line(":list").await else {
            panic!("expected lines");
        };
        assert!(list[0].contains("Hammer drill"));
    }
}
