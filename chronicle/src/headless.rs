//! Headless driver for the ledger.
//!
//! A simple line-oriented protocol suitable for scripts and agents:
//! - Lines starting with `#` are commands
//! - Any other line is a JSON AI action, recorded on behalf of the current character
//! - Replies are prefixed with a tag such as `[EVENT]` or `[ERROR]`

use chrono::NaiveDate;
use chronicle_core::{
    Character, EntityId, Event, EventFilter, EventId, EventLedger, LedgerConfig, PersistError,
    RelationshipEdge, RelationshipGraph, SavedChronicle,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const HELP: &str = "\
[HELP]
  #as <id>                  - Act as another character
  #add <id> <name>          - Register a character
  #events [id]              - Recent events for a character
  #shared <id> <id>...      - Events all the given entities took part in
  #schedule [id] [date]     - Upcoming plans, or plans on YYYY-MM-DD
  #context [id]             - Prompt digest of events and plans
  #complete <event>         - Toggle an event's completed flag
  #delete <event>           - Delete an event
  #compact [days] [count]   - Compact old events
  #graph [observer]         - Objective graph, or as an observer believes it
  #save <path>              - Save a snapshot
  #load <path>              - Load a snapshot
  #status                   - Show ledger status
  #help                     - Show this help
  #quit                     - Exit
  (anything else is read as a JSON AI action)";

/// Command line options for headless mode.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessOptions {
    /// Character actions are recorded for.
    pub character: EntityId,
    /// Snapshot loaded at start and written on exit.
    pub data: Option<PathBuf>,
    /// Overrides the configured self-identity.
    pub self_id: Option<EntityId>,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            character: EntityId::from("narrator"),
            data: None,
            self_id: None,
        }
    }
}

/// Parse headless options from command line arguments.
pub fn parse_options_from_args(args: &[String]) -> HeadlessOptions {
    let mut options = HeadlessOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--as" => {
                if let Some(id) = args.get(i + 1) {
                    options.character = EntityId::from(id.as_str());
                    i += 1;
                }
            }
            "--data" => {
                if let Some(path) = args.get(i + 1) {
                    options.data = Some(PathBuf::from(path));
                    i += 1;
                }
            }
            "--self-id" => {
                if let Some(id) = args.get(i + 1) {
                    options.self_id = Some(EntityId::from(id.as_str()));
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    options
}

/// Result of handling one input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Print the reply and keep reading.
    Reply(String),
    /// Print the reply and stop.
    Quit(String),
}

/// One ledger plus the character currently acting.
pub struct HeadlessSession {
    ledger: EventLedger,
    config: LedgerConfig,
    current: EntityId,
}

impl HeadlessSession {
    /// Start with an empty in-memory ledger.
    pub fn new(config: LedgerConfig, character: EntityId) -> Self {
        Self {
            ledger: EventLedger::in_memory(config.clone()),
            config,
            current: character,
        }
    }

    /// Resume from a snapshot file.
    pub async fn load(
        path: impl AsRef<Path>,
        config: LedgerConfig,
        character: EntityId,
    ) -> Result<Self, PersistError> {
        let ledger = SavedChronicle::load_json(path).await?.into_ledger(config.clone());
        Ok(Self {
            ledger,
            config,
            current: character,
        })
    }

    /// Write a snapshot file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        SavedChronicle::capture(&self.ledger)?.save_json(path).await
    }

    /// The character actions are recorded for.
    pub fn current(&self) -> &EntityId {
        &self.current
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    /// Handle one line of input.
    pub async fn handle(&mut self, line: &str) -> Step {
        let line = line.trim();
        match line.strip_prefix('#') {
            Some(command) => self.command(command).await,
            None => Step::Reply(self.ingest(line)),
        }
    }

    fn ingest(&mut self, line: &str) -> String {
        let action: serde_json::Value = match serde_json::from_str(line) {
            Ok(action) => action,
            Err(e) => return format!("[ERROR] Not a JSON action: {e}"),
        };
        match self.ledger.create_event_from_ai_action(&action, &self.current) {
            Ok(event) => format!("[EVENT] {}", describe(&event)),
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    async fn command(&mut self, command: &str) -> Step {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let reply = match parts.first().copied() {
            Some("quit") | Some("exit") => return Step::Quit("Goodbye!".to_string()),
            Some("help") => HELP.to_string(),
            Some("as") => match parts.get(1) {
                Some(id) => {
                    self.current = EntityId::from(*id);
                    format!("[AS] Now acting as {id}")
                }
                None => "[ERROR] Usage: #as <id>".to_string(),
            },
            Some("add") => self.add_character(&parts[1..]),
            Some("events") => self.list_events(parts.get(1).copied()),
            Some("shared") => self.shared_events(&parts[1..]),
            Some("schedule") => self.schedule(&parts[1..]),
            Some("context") => self.context(parts.get(1).copied()),
            Some("complete") => match parts.get(1) {
                Some(id) => match self.ledger.toggle_event_complete(&EventId::from(*id)) {
                    Ok(event) => format!("[UPDATED] {}", describe(&event)),
                    Err(e) => format!("[ERROR] {e}"),
                },
                None => "[ERROR] Usage: #complete <event>".to_string(),
            },
            Some("delete") => match parts.get(1) {
                Some(id) => match self.ledger.delete_event(&EventId::from(*id)) {
                    Ok(event) => format!("[DELETED] {}", describe(&event)),
                    Err(e) => format!("[ERROR] {e}"),
                },
                None => "[ERROR] Usage: #delete <event>".to_string(),
            },
            Some("compact") => self.compact(&parts[1..]),
            Some("graph") => self.graph(parts.get(1).copied()),
            Some("save") => match parts.get(1) {
                Some(path) => match self.save(path).await {
                    Ok(()) => format!("[SAVED] Ledger saved to {path}"),
                    Err(e) => format!("[ERROR] Save failed: {e}"),
                },
                None => "[ERROR] Usage: #save <path>".to_string(),
            },
            Some("load") => match parts.get(1) {
                Some(path) => {
                    match Self::load(path, self.config.clone(), self.current.clone()).await {
                        Ok(loaded) => {
                            *self = loaded;
                            format!("[LOADED] Ledger loaded from {path}")
                        }
                        Err(e) => format!("[ERROR] Load failed: {e}"),
                    }
                }
                None => "[ERROR] Usage: #load <path>".to_string(),
            },
            Some("status") => self.status(),
            _ => "[ERROR] Unknown command. Type #help for help.".to_string(),
        };
        Step::Reply(reply)
    }

    fn target(&self, arg: Option<&str>) -> EntityId {
        arg.map(EntityId::from).unwrap_or_else(|| self.current.clone())
    }

    fn add_character(&mut self, args: &[&str]) -> String {
        let Some((id, name)) = args.split_first() else {
            return "[ERROR] Usage: #add <id> <name>".to_string();
        };
        let name = if name.is_empty() {
            (*id).to_string()
        } else {
            name.join(" ")
        };
        self.ledger
            .directory_mut()
            .insert(Character::new(*id, name.clone()));
        self.ledger.graph_mut().upsert_node(*id, name.clone());
        format!("[ADDED] {id} ({name})")
    }

    fn list_events(&self, arg: Option<&str>) -> String {
        let id = self.target(arg);
        match self.ledger.query() {
            Ok(query) => {
                let events = query.get_events_by_participant(&id, &EventFilter::default());
                listing(&format!("[EVENTS] {id}"), &events)
            }
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    fn shared_events(&self, args: &[&str]) -> String {
        if args.is_empty() {
            return "[ERROR] Usage: #shared <id> <id>...".to_string();
        }
        let ids: Vec<EntityId> = args.iter().map(|a| EntityId::from(*a)).collect();
        match self.ledger.query() {
            Ok(query) => listing(
                &format!("[SHARED] {}", args.join(", ")),
                &query.get_shared_events(&ids),
            ),
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    fn schedule(&self, args: &[&str]) -> String {
        let mut id = None;
        let mut date = None;
        for arg in args {
            match NaiveDate::parse_from_str(arg, "%Y-%m-%d") {
                Ok(parsed) => date = Some(parsed),
                Err(_) => id = Some(*arg),
            }
        }
        let id = self.target(id);
        match self.ledger.query() {
            Ok(query) => listing(
                &format!("[SCHEDULE] {id}"),
                &query.get_schedule_events(&id, date),
            ),
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    fn context(&self, arg: Option<&str>) -> String {
        let id = self.target(arg);
        match self.ledger.query() {
            Ok(query) => format!(
                "[CONTEXT] {id}\nEvents:\n{}\nPlans:\n{}",
                query.build_event_context(&id).trim_end(),
                query.build_schedule_context(&id).trim_end()
            ),
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    fn compact(&mut self, args: &[&str]) -> String {
        let retention = self.config.retention;
        let days = match args.first().map(|a| a.parse::<u32>()) {
            Some(Ok(days)) => days,
            Some(Err(_)) => return "[ERROR] Usage: #compact [days] [count]".to_string(),
            None => retention.max_age_days,
        };
        let count = match args.get(1).map(|a| a.parse::<usize>()) {
            Some(Ok(count)) => count,
            Some(Err(_)) => return "[ERROR] Usage: #compact [days] [count]".to_string(),
            None => retention.max_count,
        };
        match self.ledger.compress_old_events(days, count) {
            Ok(report) => format!(
                "[COMPACTED] {} of {} events compressed ({} already compressed)",
                report.compressed, report.examined, report.already_compressed
            ),
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    fn graph(&self, observer: Option<&str>) -> String {
        let (title, data) = match observer {
            Some(observer) => match self.ledger.subjective_graph(&EntityId::from(observer)) {
                Ok(data) => (format!("[GRAPH] as {observer} believes it"), data),
                Err(e) => return format!("[ERROR] {e}"),
            },
            None => ("[GRAPH] objective".to_string(), self.ledger.graph().get_graph_data()),
        };

        let mut out = title;
        if data.edges.is_empty() {
            out.push_str("\n  (no relationships)");
        }
        for edge in &data.edges {
            out.push('\n');
            out.push_str(&describe_edge(edge));
        }
        out
    }

    fn status(&self) -> String {
        let events = match self.ledger.get_all_events() {
            Ok(events) => events,
            Err(e) => return format!("[ERROR] {e}"),
        };
        let rumors = match self.ledger.rumors() {
            Ok(rumors) => rumors.len(),
            Err(e) => return format!("[ERROR] {e}"),
        };
        format!(
            "[STATUS]\n  Acting as: {}\n  Self: {}\n  Events: {} ({} compressed)\n  Relationships: {}\n  Rumors: {}",
            self.current,
            self.ledger.self_id(),
            events.len(),
            events.values().filter(|e| e.compressed).count(),
            self.ledger.graph().edge_count(),
            rumors
        )
    }
}

fn describe(event: &Event) -> String {
    let participants: Vec<&str> = event.participants.iter().map(EntityId::as_str).collect();
    let mut line = format!(
        "{} [{}] {}: {}",
        event.id,
        event.timestamp.format("%Y-%m-%d %H:%M"),
        event.event_type.name(),
        event.summary
    );
    if !participants.is_empty() {
        line.push_str(&format!(" ({})", participants.join(", ")));
    }
    if let Some(info) = &event.schedule_info {
        line.push_str(&format!(" on {}", info.date));
        if let Some(time) = &info.time {
            line.push_str(&format!(" {time}"));
        }
    }
    if event.completed {
        line.push_str(" [done]");
    }
    if event.compressed {
        line.push_str(" [compressed]");
    }
    line
}

fn describe_edge(edge: &RelationshipEdge) -> String {
    let pair = edge.pair();
    format!(
        "  {a} -> {b}: {} ({})\n  {b} -> {a}: {} ({})\n    {} attitude changes",
        edge.a_view_of_b,
        edge.a_toward_b,
        edge.b_view_of_a,
        edge.b_toward_a,
        edge.change_log().len(),
        a = pair.a(),
        b = pair.b(),
    )
}

fn listing(title: &str, events: &[&Event]) -> String {
    let mut out = title.to_string();
    if events.is_empty() {
        out.push_str("\n  (none)");
    }
    for event in events {
        out.push_str("\n  ");
        out.push_str(&describe(event));
    }
    out
}

/// Run the ledger in headless mode over stdin and stdout.
pub async fn run_headless(mut session: HeadlessSession) -> io::Result<HeadlessSession> {
    println!("=== Chronicle Headless Mode ===");
    println!("Acting as: {}", session.current());
    println!("Type #help for commands. Other lines are JSON AI actions.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match session.handle(&line).await {
            Step::Reply(reply) => println!("{reply}"),
            Step::Quit(reply) => {
                println!("{reply}");
                break;
            }
        }
        stdout.flush()?;
    }

    Ok(session)
}
