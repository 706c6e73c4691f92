use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use treedit::kernel::services::adapters::{ensure_settings_file, load_settings, AsyncRuntime};
use treedit::kernel::services::ports::Settings;
use treedit::kernel::{Action, TreeController};
use treedit::models::{NodeKind, NodeTree};

mod logging;
mod signals;

use signals::{install_termination_signals, TerminationSignal};

const USAGE: &str = "usage: treedit [--hidden] [--open FILE] [--save FILE] [PATH...]";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    show_hidden: bool,
    open: Option<PathBuf>,
    save: Option<PathBuf>,
    roots: Vec<PathBuf>,
    help: bool,
}

impl CliArgs {
    fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--hidden" => parsed.show_hidden = true,
                "-h" | "--help" => parsed.help = true,
                "--open" => {
                    let value = args.next().ok_or("--open needs a file")?;
                    parsed.open = Some(PathBuf::from(value));
                }
                "--save" => {
                    let value = args.next().ok_or("--save needs a file")?;
                    parsed.save = Some(PathBuf::from(value));
                }
                other if other.starts_with("--") => {
                    return Err(format!("unknown option {other}"));
                }
                path => parsed.roots.push(PathBuf::from(path)),
            }
        }
        if parsed.open.is_some() && !parsed.roots.is_empty() {
            return Err("--open cannot be combined with paths".to_string());
        }
        Ok(parsed)
    }
}

fn main() -> ExitCode {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let _logging = logging::init();
    if let Err(e) = ensure_settings_file() {
        tracing::warn!(error = %e, "settings file unavailable");
    }
    let mut settings = load_settings().unwrap_or_default();
    if args.show_hidden {
        settings.show_hidden = true;
    }

    match run(args, settings) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "treedit failed");
            eprintln!("treedit: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs, settings: Settings) -> io::Result<u8> {
    let runtime = AsyncRuntime::new()?;
    let mut controller = TreeController::new(settings).with_executor(Arc::new(runtime));

    if let Some(document) = &args.open {
        if let Err(e) = controller.dispatch(Action::OpenDocument(document.clone())) {
            eprintln!("treedit: {e}");
            return Ok(1);
        }
    } else if args.roots.is_empty() {
        controller.load_drives();
    } else {
        for root in &args.roots {
            controller.add_root(root.clone());
        }
    }

    let roots = controller.tree().roots().to_vec();
    for root in roots {
        if let Err(e) = controller.dispatch(Action::Expand(root)) {
            tracing::warn!(error = %e, "failed to expand root");
        }
    }

    let (tx, rx) = mpsc::channel();
    let _signals = install_termination_signals(tx)?;
    print_tree(&controller);

    let signal = loop {
        match rx.try_recv() {
            Ok(signal) => break signal,
            Err(TryRecvError::Disconnected) => break TerminationSignal::SigTerm,
            Err(TryRecvError::Empty) => {}
        }

        let report = controller.wait_and_pump(POLL_INTERVAL);
        for op in &report.completed {
            tracing::info!(
                kind = ?op.kind,
                target_dir = %op.target.display(),
                failed = op.failures.len(),
                "file operation completed"
            );
        }
        if report.tree_changed() {
            print_tree(&controller);
        }
    };

    if let Some(path) = &args.save {
        if let Err(e) = controller.dispatch(Action::SaveDocument(Some(path.clone()))) {
            eprintln!("treedit: {e}");
        }
    }
    controller.shutdown();
    tracing::info!(?signal, "shutting down");
    Ok(signal.exit_code() as u8)
}

fn print_tree(controller: &TreeController) {
    println!("== {} ==", controller.document_title());
    print!("{}", render_tree(controller.tree()));
}

fn render_tree(tree: &NodeTree) -> String {
    let mut out = String::new();
    for row in tree.flatten_for_view() {
        let marker = match row.kind {
            NodeKind::Root | NodeKind::Directory if row.is_expanded => "- ",
            NodeKind::Root | NodeKind::Directory => "+ ",
            _ => "  ",
        };
        for _ in 0..row.depth {
            out.push_str("  ");
        }
        out.push_str(marker);
        out.push_str(&row.name);
        out.push('\n');
    }
    out
}
