use std::{
    borrow::Cow,
    env,
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use thiserror::Error;

use crate::cli::output;
use crate::config::TemplateConfig;
use crate::dispatch::{DispatchChain, TemplateDispatcher};
use crate::errors::CoreError;
use crate::grammar::{BeanGrammar, Grammar};
use crate::service::EntryService;
use crate::store::LedgerStore;
use crate::utils::paths;

const BUILTIN_COMMANDS: &[&str] = &["exit", "help", "quit", "remove", "usage"];
const SUGGESTION_THRESHOLD: f64 = 0.7;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("readline error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("prompt error: {0}")]
    Dialog(#[from] dialoguer::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Interactive,
    Script,
}

enum LoopControl {
    Continue,
    Exit,
}

struct CliSession {
    service: EntryService,
    grammar: Arc<dyn Grammar>,
    aliases: Vec<String>,
    mode: CliMode,
}

pub fn run_cli() -> Result<(), CliError> {
    let mode = if env::var_os("BEANBOT_CORE_CLI_SCRIPT").is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let config_path = env::var_os("BEANBOT_CORE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(paths::default_config_file);
    let ledger_path = env::var_os("BEANBOT_CORE_LEDGER")
        .map(PathBuf::from)
        .unwrap_or_else(paths::default_ledger_file);

    let config = TemplateConfig::load(&config_path)?;
    let grammar: Arc<dyn Grammar> = Arc::new(BeanGrammar::new());
    let dispatcher = TemplateDispatcher::new(Arc::clone(&config), Arc::clone(&grammar));
    let aliases = dispatcher.aliases();
    let chain = DispatchChain::new(vec![Box::new(dispatcher)]);
    let store = LedgerStore::new(
        ledger_path.to_string_lossy().to_string(),
        Arc::clone(&grammar),
    );

    let session = CliSession {
        service: EntryService::new(chain, store),
        grammar,
        aliases,
        mode,
    };

    match mode {
        CliMode::Interactive => run_interactive(&session),
        CliMode::Script => run_script(&session),
    }
}

fn run_interactive(session: &CliSession) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    let helper = CommandHelper::new(&session.aliases);
    editor.set_helper(Some(helper));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    loop {
        match editor.readline("beanbot> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                match handle_line(session, trimmed)? {
                    LoopControl::Continue => {}
                    LoopControl::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(session: &CliSession) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match handle_line(session, trimmed)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(())
}

fn handle_line(session: &CliSession, line: &str) -> Result<LoopControl, CliError> {
    if matches!(line, "exit" | "quit") {
        return Ok(LoopControl::Exit);
    }

    if matches!(line, "help" | "usage") {
        for (name, usage) in session.service.usages() {
            output::info(&format!("[{name}]"));
            for entry in usage.lines() {
                output::info(&format!("  {entry}"));
            }
        }
        return Ok(LoopControl::Continue);
    }

    if let Some(identity) = line.strip_prefix("remove ") {
        let identity = identity.trim();
        if session.mode == CliMode::Interactive {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Remove entry {identity}?"))
                .default(false)
                .interact()?;
            if !confirmed {
                output::info("Kept.");
                return Ok(LoopControl::Continue);
            }
        }
        match session.service.remove(identity) {
            Ok(entry) => {
                output::success(&format!("Removed entry {identity}"));
                output::info(entry.render(session.grammar.as_ref()).trim_end());
            }
            Err(err) => report_error(session, line, &err),
        }
        return Ok(LoopControl::Continue);
    }

    match session.service.create_from_input(line) {
        Ok((identity, entry)) => {
            output::success(&format!("Created entry {identity}"));
            output::info(entry.render(session.grammar.as_ref()).trim_end());
        }
        Err(err) => report_error(session, line, &err),
    }
    Ok(LoopControl::Continue)
}

fn report_error(session: &CliSession, line: &str, err: &CoreError) {
    match err {
        CoreError::UnrecognizedSyntax => {
            output::warning(&err.to_string());
            if let Some(candidate) = suggest_alias(line, &session.aliases) {
                output::info(&format!("Did you mean `{candidate}`?"));
            }
        }
        err if err.is_user_facing() => output::warning(&err.to_string()),
        err => {
            tracing::error!(error = %err, input = line, "command failed");
            output::error("Something went wrong; see the logs for details.");
        }
    }
}

fn suggest_alias(line: &str, aliases: &[String]) -> Option<String> {
    let verb = line.split_whitespace().next()?;
    aliases
        .iter()
        .map(|alias| (strsim::jaro_winkler(verb, alias), alias))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, alias)| alias.clone())
}

struct CommandHelper {
    commands: Vec<String>,
}

impl CommandHelper {
    fn new(aliases: &[String]) -> Self {
        let mut commands: Vec<String> = aliases.to_vec();
        commands.extend(BUILTIN_COMMANDS.iter().map(|name| (*name).to_string()));
        commands.sort();
        commands.dedup();
        Self { commands }
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        // Only the command word completes; arguments are free-form.
        if prefix.trim_start().contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let start = prefix.len() - prefix.trim_start().len();
        let needle = &prefix[start..];
        let candidates = self
            .commands
            .iter()
            .filter(|name| name.starts_with(needle))
            .map(|name| Pair {
                display: name.clone(),
                replacement: name.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let _ = ctx;
        Ok(ValidationResult::Valid(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_the_closest_alias() {
        let aliases = vec!["vultr".to_string(), "饮料".to_string()];
        assert_eq!(
            suggest_alias("vultrr 5", &aliases),
            Some("vultr".to_string())
        );
        assert_eq!(suggest_alias("zzzzz", &aliases), None);
        assert_eq!(suggest_alias("   ", &aliases), None);
    }

    #[test]
    fn completion_candidates_cover_aliases_and_builtins() {
        let helper = CommandHelper::new(&["vultr".to_string()]);
        assert!(helper.commands.contains(&"vultr".to_string()));
        assert!(helper.commands.contains(&"remove".to_string()));
    }
}
